use crate::types::SummaryReport;

/// Decides whether the analysis stage runs after summarization
///
/// Implemented for `bool` (fixed answer) and for closures over the summary
/// report; interactive prompting belongs to the caller.
pub trait AnalysisGate: Send + Sync {
    fn proceed(&self, report: &SummaryReport) -> bool;
}

impl AnalysisGate for bool {
    fn proceed(&self, _report: &SummaryReport) -> bool {
        *self
    }
}

impl<F> AnalysisGate for F
where
    F: Fn(&SummaryReport) -> bool + Send + Sync,
{
    fn proceed(&self, report: &SummaryReport) -> bool {
        self(report)
    }
}
