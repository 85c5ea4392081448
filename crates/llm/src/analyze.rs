use chatprofile_common::{ProfileError, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::budget::TokenBudget;
use crate::llm_trait::CompletionService;
use crate::tokenizer::Tokenizer;
use crate::truncate::truncate_text;
use crate::types::{CompletionRequest, ProfileAnalysis};

/// Final profile analysis over the summaries document
pub struct Analyzer {
    client: Arc<dyn CompletionService>,
    tokenizer: Arc<dyn Tokenizer>,
    model: String,
    instruction: String,
    budget: TokenBudget,
    available_tokens: usize,
}

impl Analyzer {
    /// Create new analyzer
    ///
    /// Fails when the instruction leaves no room for content in the budget.
    pub fn new(
        client: Arc<dyn CompletionService>,
        tokenizer: Arc<dyn Tokenizer>,
        model: impl Into<String>,
        instruction: impl Into<String>,
        budget: TokenBudget,
    ) -> Result<Self> {
        let instruction = instruction.into();
        let available_tokens = budget.available_for_instruction(tokenizer.as_ref(), &instruction)?;

        Ok(Self {
            client,
            tokenizer,
            model: model.into(),
            instruction,
            budget,
            available_tokens,
        })
    }

    /// Content tokens allowed next to the analysis instruction
    pub fn available_tokens(&self) -> usize {
        self.available_tokens
    }

    /// Analyze the summaries document
    ///
    /// The summaries are truncated to the available budget and sent in a
    /// single request; the response is returned verbatim.
    pub async fn analyze(&self, summaries_text: &str) -> Result<ProfileAnalysis> {
        if summaries_text.trim().is_empty() {
            return Err(ProfileError::invalid_input("No summaries to analyze"));
        }

        let truncation = truncate_text(self.tokenizer.as_ref(), summaries_text, self.available_tokens)?;

        if truncation.was_truncated() {
            warn!(
                "The summary was truncated from {} tokens to {} tokens to fit within the token limit",
                truncation.original_tokens, truncation.kept_tokens
            );
        }

        info!(
            "Performing final analysis - Model: {}, Content tokens: {}/{}",
            self.model, truncation.kept_tokens, self.available_tokens
        );

        let request = CompletionRequest::new(
            self.model.clone(),
            self.instruction.clone(),
            truncation.text,
            self.budget.reserve_tokens as u32,
        );

        let narrative = self.client.complete(request).await?;

        Ok(ProfileAnalysis {
            narrative,
            original_tokens: truncation.original_tokens,
            submitted_tokens: truncation.kept_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::test_support::ByteTokenizer;
    use crate::tokenizer::{TiktokenTokenizer, Vocabulary};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CapturingService {
        requests: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl CompletionService for CapturingService {
        async fn complete(&self, request: CompletionRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request);
            Ok("# Profile\n\nCurious and upbeat.".to_string())
        }
    }

    #[test]
    fn test_available_tokens_match_budget_arithmetic() {
        let tokenizer: Arc<dyn Tokenizer> = Arc::new(TiktokenTokenizer::new(Vocabulary::O200kBase).unwrap());
        let instruction = "You are an expert analyst.";
        let k = tokenizer.count(instruction).unwrap();

        let analyzer = Analyzer::new(
            Arc::new(CapturingService::default()),
            tokenizer,
            "gpt-4o-mini",
            instruction,
            TokenBudget::new(8192, 1500),
        )
        .unwrap();

        assert_eq!(analyzer.available_tokens(), 8192 - 1500 - k);
    }

    #[test]
    fn test_oversized_instruction_rejected() {
        let result = Analyzer::new(
            Arc::new(CapturingService::default()),
            Arc::new(ByteTokenizer),
            "gpt-4o-mini",
            "x".repeat(60),
            TokenBudget::new(100, 40),
        );
        assert!(matches!(result, Err(ProfileError::ChunkBudget(_))));
    }

    #[tokio::test]
    async fn test_analyze_sends_single_request() {
        let service = Arc::new(CapturingService::default());
        let analyzer = Analyzer::new(
            service.clone(),
            Arc::new(ByteTokenizer),
            "gpt-4o-mini",
            "Analyze.",
            TokenBudget::new(1000, 100),
        )
        .unwrap();

        let summaries = "Summary of chunk 1:\nLikes football.\n\n";
        let analysis = analyzer.analyze(summaries).await.unwrap();

        assert_eq!(analysis.narrative, "# Profile\n\nCurious and upbeat.");
        assert!(!analysis.was_truncated());

        let requests = service.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].system_instruction, "Analyze.");
        assert_eq!(requests[0].user_content, summaries);
        assert_eq!(requests[0].max_response_tokens, 100);
    }

    #[tokio::test]
    async fn test_analyze_truncates_to_budget() {
        let service = Arc::new(CapturingService::default());
        // 100 - 40 - len("Analyze.") = 52 content bytes
        let analyzer = Analyzer::new(
            service.clone(),
            Arc::new(ByteTokenizer),
            "gpt-4o-mini",
            "Analyze.",
            TokenBudget::new(100, 40),
        )
        .unwrap();
        assert_eq!(analyzer.available_tokens(), 52);

        let summaries = "Summary of chunk 1:\nLikes football. Plays guitar on weekends and travels often.";
        let analysis = analyzer.analyze(summaries).await.unwrap();

        assert!(analysis.was_truncated());
        assert_eq!(analysis.original_tokens, summaries.len());

        let requests = service.requests.lock().unwrap();
        assert_eq!(requests[0].user_content, "Summary of chunk 1:\nLikes football.");
        assert_eq!(analysis.submitted_tokens, requests[0].user_content.len());
    }

    #[tokio::test]
    async fn test_empty_summaries_rejected() {
        let service = Arc::new(CapturingService::default());
        let analyzer = Analyzer::new(
            service.clone(),
            Arc::new(ByteTokenizer),
            "gpt-4o-mini",
            "Analyze.",
            TokenBudget::default(),
        )
        .unwrap();

        let err = analyzer.analyze("  \n").await.unwrap_err();
        assert!(matches!(err, ProfileError::InvalidInput(_)));
        assert!(service.requests.lock().unwrap().is_empty());
    }
}
