//! chatprofile LLM integration
//!
//! Tokenizer adapter, token-bounded chunking and truncation, and the two
//! completion stages: chunk summarization and profile analysis.

mod analyze;
mod budget;
mod chunking;
mod client;
mod llm_trait;
mod prompts;
mod summarize;
mod tokenizer;
mod traced;
mod truncate;
mod types;

pub use analyze::Analyzer;
pub use budget::TokenBudget;
pub use chunking::{chunk_text, TextChunk};
pub use client::{OpenAiClient, RetryPolicy};
pub use llm_trait::CompletionService;
pub use prompts::{
    PromptLanguage, Prompts, ANALYSIS_PROMPT_EN, ANALYSIS_PROMPT_ES, SUMMARY_PROMPT_EN,
    SUMMARY_PROMPT_ES,
};
pub use summarize::{chunk_progress_bar, render_summaries, Summarizer, DEFAULT_SUMMARY_MAX_TOKENS};
pub use tokenizer::{decode_span, TiktokenTokenizer, Token, Tokenizer, Vocabulary};
pub use traced::TracedService;
pub use truncate::{truncate_text, Truncation};
pub use types::{
    ChatChoice, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ChunkSummary,
    CompletionRequest, ProfileAnalysis, Role, Usage,
};
