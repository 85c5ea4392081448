use chatprofile_common::Result;
use std::fmt;
use std::future::Future;
use std::time::Instant;
use tracing::{error, info, Instrument};

/// Pipeline execution steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Extract,
    Summarize,
    Analyze,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::Summarize => "summarize",
            Self::Analyze => "analyze",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run one stage inside a span carrying the stage name and run id
///
/// Logs entry, exit and elapsed time; errors pass through untouched.
pub async fn run_stage<T, F>(stage: PipelineStage, run_id: &str, stage_future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let span = tracing::info_span!("stage", stage = %stage, run_id = %run_id);

    async move {
        let started = Instant::now();
        info!("Stage {} started", stage);

        let result = stage_future.await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => info!(elapsed_ms, "Stage {} finished", stage),
            Err(e) => error!(elapsed_ms, error = %e, "Stage {} failed", stage),
        }

        result
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatprofile_common::ProfileError;

    #[tokio::test]
    async fn test_run_stage_returns_value() {
        let value = run_stage(PipelineStage::Extract, "run-1", async { Ok(42) })
            .await
            .unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_run_stage_propagates_error() {
        let result: Result<()> = run_stage(PipelineStage::Analyze, "run-1", async {
            Err(ProfileError::invalid_input("nothing to analyze"))
        })
        .await;
        assert!(matches!(result, Err(ProfileError::InvalidInput(_))));
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(PipelineStage::Summarize.to_string(), "summarize");
        assert_eq!(PipelineStage::Analyze.as_str(), "analyze");
    }
}
