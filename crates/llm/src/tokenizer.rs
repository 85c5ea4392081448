//! Tokenizer adapter
//!
//! Every token budget in the pipeline is measured with one vocabulary,
//! shared by the chunker, the truncator and the analysis budget.

use chatprofile_common::{ProfileError, Result};
use std::fmt;
use std::str::FromStr;
use tiktoken_rs::CoreBPE;

/// Token id in the configured vocabulary
pub type Token = u32;

/// How far a span end may move back to land on a character boundary
const MAX_BOUNDARY_BACKOFF: usize = 4;

/// Encode/decode pair over a fixed vocabulary
pub trait Tokenizer: Send + Sync {
    /// Vocabulary name
    fn name(&self) -> &str;

    /// Encode text into tokens
    fn encode(&self, text: &str) -> Result<Vec<Token>>;

    /// Decode tokens back into text
    fn decode(&self, tokens: &[Token]) -> Result<String>;

    /// Number of tokens in text
    fn count(&self, text: &str) -> Result<usize> {
        Ok(self.encode(text)?.len())
    }
}

/// Named BPE vocabularies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vocabulary {
    /// GPT-4o family
    O200kBase,
    /// GPT-4 / GPT-3.5
    Cl100kBase,
    /// GPT-2
    R50kBase,
}

impl Vocabulary {
    /// Vocabulary the given model tokenizes with
    pub fn for_model(model: &str) -> Self {
        let model = model.rsplit('/').next().unwrap_or(model);
        if model.starts_with("gpt-4o") || model.starts_with("o1") || model.starts_with("o3") {
            Self::O200kBase
        } else if model.starts_with("gpt-4") || model.starts_with("gpt-3.5") {
            Self::Cl100kBase
        } else if model.starts_with("gpt2") || model.starts_with("gpt-2") {
            Self::R50kBase
        } else {
            Self::O200kBase
        }
    }

    /// Vocabulary name as used in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::O200kBase => "o200k_base",
            Self::Cl100kBase => "cl100k_base",
            Self::R50kBase => "r50k_base",
        }
    }
}

impl fmt::Display for Vocabulary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vocabulary {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "o200k_base" | "o200k" => Ok(Self::O200kBase),
            "cl100k_base" | "cl100k" => Ok(Self::Cl100kBase),
            "r50k_base" | "r50k" | "gpt2" => Ok(Self::R50kBase),
            other => Err(ProfileError::config(format!("Unknown tokenizer vocabulary: {}", other))),
        }
    }
}

/// tiktoken-backed tokenizer
pub struct TiktokenTokenizer {
    vocabulary: Vocabulary,
    bpe: CoreBPE,
}

impl TiktokenTokenizer {
    /// Load the given vocabulary
    pub fn new(vocabulary: Vocabulary) -> Result<Self> {
        let bpe = match vocabulary {
            Vocabulary::O200kBase => tiktoken_rs::o200k_base(),
            Vocabulary::Cl100kBase => tiktoken_rs::cl100k_base(),
            Vocabulary::R50kBase => tiktoken_rs::r50k_base(),
        }
        .map_err(|e| {
            ProfileError::tokenization(format!("Failed to load vocabulary {}: {}", vocabulary, e))
        })?;

        Ok(Self { vocabulary, bpe })
    }

    /// Load the vocabulary the given model tokenizes with
    pub fn for_model(model: &str) -> Result<Self> {
        Self::new(Vocabulary::for_model(model))
    }

    /// Loaded vocabulary
    pub fn vocabulary(&self) -> Vocabulary {
        self.vocabulary
    }
}

impl fmt::Debug for TiktokenTokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TiktokenTokenizer")
            .field("vocabulary", &self.vocabulary)
            .finish()
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn name(&self) -> &str {
        self.vocabulary.as_str()
    }

    fn encode(&self, text: &str) -> Result<Vec<Token>> {
        // Special-token markers in chat text are plain text here
        Ok(self.bpe.encode_ordinary(text))
    }

    fn decode(&self, tokens: &[Token]) -> Result<String> {
        self.bpe
            .decode(tokens.to_vec())
            .map_err(|e| ProfileError::tokenization(format!("{}: {}", self.vocabulary, e)))
    }
}

/// Decode `tokens[start..end]`, moving `end` back when the span stops inside
/// a multi-byte character.
///
/// Returns the decoded text and the end actually used. The end never moves
/// back more than [`MAX_BOUNDARY_BACKOFF`] tokens and never reaches `start`.
pub fn decode_span(
    tokenizer: &dyn Tokenizer,
    tokens: &[Token],
    start: usize,
    end: usize,
) -> Result<(String, usize)> {
    let first_error = match tokenizer.decode(&tokens[start..end]) {
        Ok(text) => return Ok((text, end)),
        Err(e) => e,
    };

    // The last span of the sequence has nothing left to borrow from
    if end == tokens.len() {
        return Err(first_error);
    }

    let floor = end.saturating_sub(MAX_BOUNDARY_BACKOFF).max(start + 1);
    for candidate in (floor..end).rev() {
        if let Ok(text) = tokenizer.decode(&tokens[start..candidate]) {
            tracing::debug!(
                "Moved span end back from {} to {} to keep valid UTF-8",
                end,
                candidate
            );
            return Ok((text, candidate));
        }
    }

    Err(first_error)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// One token per UTF-8 byte; decoding a split character fails
    pub(crate) struct ByteTokenizer;

    impl Tokenizer for ByteTokenizer {
        fn name(&self) -> &str {
            "bytes"
        }

        fn encode(&self, text: &str) -> Result<Vec<Token>> {
            Ok(text.bytes().map(Token::from).collect())
        }

        fn decode(&self, tokens: &[Token]) -> Result<String> {
            let bytes: Vec<u8> = tokens.iter().map(|t| *t as u8).collect();
            String::from_utf8(bytes).map_err(|e| ProfileError::tokenization(e.to_string()))
        }
    }
}
