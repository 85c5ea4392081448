use chatprofile_common::{ProfileError, Result};

use crate::tokenizer::{decode_span, Tokenizer};

/// Result of fitting text into a token budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncation {
    /// Text that fits the budget
    pub text: String,

    /// Token count of the input
    pub original_tokens: usize,

    /// Token count of `text`
    pub kept_tokens: usize,
}

impl Truncation {
    /// Whether any content was dropped
    pub fn was_truncated(&self) -> bool {
        self.kept_tokens != self.original_tokens
    }
}

/// Fit text into `max_tokens` tokens, ending on a sentence when possible
///
/// Text already within budget is returned unchanged. Otherwise the first
/// `max_tokens` tokens are decoded and cut right after the last period; a
/// prefix without any period is kept as is.
///
/// Like [`chunk_text`](crate::chunk_text), a `max_tokens` smaller than the
/// token width of the character at the cut fails with `Tokenization`.
pub fn truncate_text(tokenizer: &dyn Tokenizer, text: &str, max_tokens: usize) -> Result<Truncation> {
    if max_tokens == 0 {
        return Err(ProfileError::chunk_budget("Truncation budget must be greater than 0"));
    }

    let tokens = tokenizer.encode(text)?;
    let original_tokens = tokens.len();

    if original_tokens <= max_tokens {
        return Ok(Truncation {
            text: text.to_string(),
            original_tokens,
            kept_tokens: original_tokens,
        });
    }

    let (prefix, _) = decode_span(tokenizer, &tokens, 0, max_tokens)?;

    let truncated = match prefix.rfind('.') {
        Some(last_period) => prefix[..=last_period].to_string(),
        None => prefix,
    };

    let kept_tokens = tokenizer.count(&truncated)?;

    Ok(Truncation {
        text: truncated,
        original_tokens,
        kept_tokens,
    })
}
