//! chatprofile line extraction
//!
//! Pulls one speaker's messages out of timestamped chat exports

pub mod extractor;
pub mod pattern;
pub mod types;

// Re-export main types
pub use extractor::LineExtractor;
pub use pattern::SpeakerPattern;
pub use types::ExtractionReport;
