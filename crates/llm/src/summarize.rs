use chatprofile_common::{ProfileError, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Write;
use std::sync::Arc;
use tracing::{debug, info};

use crate::chunking::TextChunk;
use crate::llm_trait::CompletionService;
use crate::types::{ChunkSummary, CompletionRequest};

/// Default response limit for a chunk summary
pub const DEFAULT_SUMMARY_MAX_TOKENS: u32 = 500;

/// Summarizer for token-bounded chunks
///
/// Every chunk gets one request carrying the summary instruction as system
/// content and the chunk as user content. Summaries come back in chunk order
/// whatever the concurrency.
pub struct Summarizer {
    client: Arc<dyn CompletionService>,
    model: String,
    instruction: String,
    max_response_tokens: u32,
    concurrency: usize,
    progress: ProgressBar,
}

impl Summarizer {
    /// Create new summarizer
    pub fn new(
        client: Arc<dyn CompletionService>,
        model: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            instruction: instruction.into(),
            max_response_tokens: DEFAULT_SUMMARY_MAX_TOKENS,
            concurrency: 1,
            progress: ProgressBar::hidden(),
        }
    }

    /// Set response limit per summary
    pub fn with_max_response_tokens(mut self, max_response_tokens: u32) -> Self {
        self.max_response_tokens = max_response_tokens;
        self
    }

    /// Set number of summary requests in flight (at least 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Report progress on the given bar
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Model used for summaries
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Summarize every chunk, in chunk order
    ///
    /// The first failed request aborts the whole stage.
    pub async fn summarize_chunks(&self, chunks: &[TextChunk]) -> Result<Vec<ChunkSummary>> {
        let total = chunks.len();
        info!(
            "Summarizing {} chunks - Model: {}, Concurrency: {}",
            total, self.model, self.concurrency
        );

        self.progress.set_length(total as u64);
        self.progress.set_position(0);

        let summaries: Vec<ChunkSummary> = stream::iter(chunks.iter().map(|chunk| self.summarize_chunk(chunk, total)))
            .buffered(self.concurrency)
            .try_collect()
            .await
            .map_err(|e| {
                self.progress.abandon();
                e
            })?;

        self.progress.finish_and_clear();

        if summaries.iter().enumerate().any(|(i, s)| s.index != chunks[i].index) {
            return Err(ProfileError::internal("Chunk summaries came back out of order"));
        }

        Ok(summaries)
    }

    /// Summarize a single chunk
    async fn summarize_chunk(&self, chunk: &TextChunk, total: usize) -> Result<ChunkSummary> {
        info!("Summarizing chunk {} of {}...", chunk.index, total);
        debug!("Chunk {} spans {} tokens", chunk.index, chunk.token_count());

        let request = CompletionRequest::new(
            self.model.clone(),
            self.instruction.clone(),
            chunk.text.clone(),
            self.max_response_tokens,
        );

        let text = self.client.complete(request).await?;
        self.progress.inc(1);

        Ok(ChunkSummary::new(chunk.index, text))
    }
}

/// Render the summaries document
///
/// Each summary is preceded by its `Summary of chunk {i}:` header and
/// followed by a blank line.
pub fn render_summaries(summaries: &[ChunkSummary]) -> String {
    let mut document = String::new();
    for summary in summaries {
        // Writing to a String cannot fail
        let _ = write!(document, "{}\n{}\n\n", summary.header(), summary.text);
    }
    document
}

/// Progress bar styled for chunk summarization
pub fn chunk_progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] chunk {pos}/{len} ({eta})")
    {
        bar.set_style(style.progress_chars("#>-"));
    }
    bar
}
