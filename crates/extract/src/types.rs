use serde::Serialize;
use std::path::PathBuf;

/// Outcome of one extraction run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionReport {
    /// File the cleaned lines were written to
    pub output_path: PathBuf,

    /// Source files read successfully
    pub files_processed: usize,

    /// Source files that could not be read
    pub files_skipped: Vec<PathBuf>,

    /// Lines written to the output file
    pub lines_extracted: usize,
}

impl ExtractionReport {
    /// Create an empty report for the given output file
    pub fn new(output_path: PathBuf) -> Self {
        Self {
            output_path,
            ..Default::default()
        }
    }

    /// Whether no line matched the speaker
    pub fn is_empty(&self) -> bool {
        self.lines_extracted == 0
    }
}
