use chatprofile_extract::ExtractionReport;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Outcome of the summarization stage
#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    /// Summaries document
    pub summaries_path: PathBuf,

    /// Chunks summarized (one request each)
    pub chunk_count: usize,

    /// Tokens in the extracted lines
    pub source_tokens: usize,
}

impl SummaryReport {
    /// Whether there is anything to analyze
    pub fn is_empty(&self) -> bool {
        self.chunk_count == 0
    }
}

/// Outcome of the analysis stage
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Narrative output file
    pub analysis_path: PathBuf,

    /// Tokens in the summaries document
    pub original_tokens: usize,

    /// Tokens sent after truncation
    pub submitted_tokens: usize,
}

impl AnalysisReport {
    /// Whether the summaries were cut to fit the context budget
    pub fn was_truncated(&self) -> bool {
        self.original_tokens != self.submitted_tokens
    }
}

/// Pipeline execution result
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub extraction: ExtractionReport,
    pub summary: SummaryReport,
    /// `None` when analysis was declined or there was nothing to analyze
    pub analysis: Option<AnalysisReport>,
}
