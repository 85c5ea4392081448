use chatprofile_common::{ProfileError, Result};
use regex::Regex;

/// Timestamp prefix of an exported chat line, e.g. `[03-11-23, 9:41:07 PM] `
pub const TIMESTAMP_PREFIX: &str = r"^\[\d{2}-\d{2}-\d{2},\s\d{1,2}:\d{2}:\d{2}\s[AP]M\]\s";

/// Matches the lines written by one speaker
#[derive(Debug, Clone)]
pub struct SpeakerPattern {
    speaker: String,
    regex: Regex,
}

impl SpeakerPattern {
    /// Pattern for a literal speaker label such as `"Jane Doe:"`
    pub fn new(speaker: &str) -> Result<Self> {
        if speaker.trim().is_empty() {
            return Err(ProfileError::invalid_input("Speaker name cannot be empty"));
        }
        Self::compile(speaker, &regex::escape(speaker))
    }

    /// Pattern for a speaker given as a regex fragment, e.g. `"Jane (Doe)?:"`
    pub fn from_regex(fragment: &str) -> Result<Self> {
        if fragment.trim().is_empty() {
            return Err(ProfileError::invalid_input("Speaker pattern cannot be empty"));
        }
        Self::compile(fragment, fragment)
    }

    fn compile(speaker: &str, fragment: &str) -> Result<Self> {
        let regex = Regex::new(&format!("{}{}", TIMESTAMP_PREFIX, fragment)).map_err(|e| {
            ProfileError::config(format!("Invalid speaker pattern '{}': {}", speaker, e))
        })?;

        Ok(Self {
            speaker: speaker.to_string(),
            regex,
        })
    }

    /// Speaker as given by the caller
    pub fn speaker(&self) -> &str {
        &self.speaker
    }

    /// Whether the line was written by this speaker
    pub fn is_match(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }

    /// Message text of a matching line, without timestamp and speaker label
    pub fn strip(&self, line: &str) -> Option<String> {
        self.regex
            .find(line)
            .map(|m| line[m.end()..].trim().to_string())
    }
}
