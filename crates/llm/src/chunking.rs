use chatprofile_common::{ProfileError, Result};
use tracing::debug;

use crate::tokenizer::{decode_span, Tokenizer};

/// Text chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// 1-based position in the chunk sequence
    pub index: usize,

    /// Chunk text
    pub text: String,

    /// First token (inclusive) in the full token sequence
    pub token_start: usize,

    /// Last token (exclusive) in the full token sequence
    pub token_end: usize,
}

impl TextChunk {
    /// Number of tokens in this chunk
    pub fn token_count(&self) -> usize {
        self.token_end - self.token_start
    }
}

/// Split text into chunks of at most `max_tokens` tokens
///
/// Tokens are packed greedily: a chunk is closed as soon as the next token
/// would push it past `max_tokens`. Boundaries fall on token boundaries, so a
/// sentence may span two chunks. Chunks never overlap and together cover the
/// whole token sequence.
///
/// A chunk boundary is moved back by up to four tokens so it never splits a
/// character. `max_tokens` must therefore cover the widest character in the
/// text: below four, a character encoded as more tokens than the limit (some
/// emoji and CJK text under byte-level BPE) fails with `Tokenization`.
pub fn chunk_text(tokenizer: &dyn Tokenizer, text: &str, max_tokens: usize) -> Result<Vec<TextChunk>> {
    if max_tokens == 0 {
        return Err(ProfileError::chunk_budget("Chunk size must be greater than 0"));
    }

    let tokens = tokenizer.encode(text)?;

    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    if tokens.len() <= max_tokens {
        // Text is short enough, return as single chunk
        return Ok(vec![TextChunk {
            index: 1,
            text: text.to_string(),
            token_start: 0,
            token_end: tokens.len(),
        }]);
    }

    let mut chunks = Vec::with_capacity(tokens.len() / max_tokens + 1);
    let mut start = 0;

    while start < tokens.len() {
        let end = (start + max_tokens).min(tokens.len());
        let (chunk_text, actual_end) = decode_span(tokenizer, &tokens, start, end)?;

        chunks.push(TextChunk {
            index: chunks.len() + 1,
            text: chunk_text,
            token_start: start,
            token_end: actual_end,
        });

        start = actual_end;
    }

    debug!(
        "Split {} tokens into {} chunks (max {} tokens each)",
        tokens.len(),
        chunks.len(),
        max_tokens
    );

    Ok(chunks)
}
