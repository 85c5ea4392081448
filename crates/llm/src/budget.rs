use chatprofile_common::{AppConfig, ProfileError, Result};

use crate::tokenizer::Tokenizer;

/// Context window split for a single completion request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    /// Total context window of the model
    pub max_context_tokens: usize,

    /// Tokens kept free for the response
    pub reserve_tokens: usize,
}

impl TokenBudget {
    /// Create new token budget
    pub fn new(max_context_tokens: usize, reserve_tokens: usize) -> Self {
        Self {
            max_context_tokens,
            reserve_tokens,
        }
    }

    /// Budget for the analysis request
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.max_context_tokens, config.reserve_tokens)
    }

    /// Content tokens left after the response reserve and a fixed prompt of
    /// `prompt_tokens` tokens
    pub fn available_for(&self, prompt_tokens: usize) -> Result<usize> {
        let available = self
            .max_context_tokens
            .checked_sub(self.reserve_tokens)
            .and_then(|rest| rest.checked_sub(prompt_tokens))
            .unwrap_or(0);

        if available == 0 {
            return Err(ProfileError::chunk_budget(format!(
                "No room for content: context {} - reserve {} - prompt {} <= 0",
                self.max_context_tokens, self.reserve_tokens, prompt_tokens
            )));
        }

        Ok(available)
    }

    /// Content tokens left next to the given fixed instruction
    pub fn available_for_instruction(&self, tokenizer: &dyn Tokenizer, instruction: &str) -> Result<usize> {
        self.available_for(tokenizer.count(instruction)?)
    }
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self::new(8192, 1500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{TiktokenTokenizer, Vocabulary};

    #[test]
    fn test_budget_arithmetic() {
        let budget = TokenBudget::new(8192, 1500);
        assert_eq!(budget.available_for(0).unwrap(), 6692);
        assert_eq!(budget.available_for(250).unwrap(), 8192 - 1500 - 250);
        assert_eq!(budget.available_for(6691).unwrap(), 1);
    }

    #[test]
    fn test_budget_exhausted() {
        let budget = TokenBudget::new(8192, 1500);
        assert!(matches!(budget.available_for(6692), Err(ProfileError::ChunkBudget(_))));
        assert!(budget.available_for(10_000).is_err());

        let inverted = TokenBudget::new(1000, 2000);
        assert!(inverted.available_for(0).is_err());
    }

    #[test]
    fn test_budget_for_instruction() {
        let tokenizer = TiktokenTokenizer::new(Vocabulary::O200kBase).unwrap();
        let instruction = "You are an expert analyst of personality profiles.";
        let k = tokenizer.count(instruction).unwrap();

        let budget = TokenBudget::default();
        assert_eq!(
            budget.available_for_instruction(&tokenizer, instruction).unwrap(),
            8192 - 1500 - k
        );
    }

    #[test]
    fn test_budget_from_config() {
        let mut config = AppConfig::default();
        config.max_context_tokens = 16_000;
        config.reserve_tokens = 2_000;
        let budget = TokenBudget::from_config(&config);
        assert_eq!(budget.available_for(1_000).unwrap(), 13_000);
    }
}
