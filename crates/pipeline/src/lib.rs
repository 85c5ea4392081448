//! chatprofile pipeline
//!
//! Sequences extraction, chunk summarization and profile analysis,
//! handing off between stages through flat text files.

pub mod gate;
pub mod stage;
pub mod types;
pub mod workflow;

pub use gate::AnalysisGate;
pub use stage::{run_stage, PipelineStage};
pub use types::{AnalysisReport, PipelineResult, SummaryReport};
pub use workflow::PipelineExecutor;
