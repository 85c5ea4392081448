use async_trait::async_trait;
use chatprofile_common::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, warn, Instrument};

use crate::llm_trait::CompletionService;
use crate::types::CompletionRequest;

/// Completion service decorator that records a span per request
pub struct TracedService<S> {
    inner: S,
    requests: AtomicU64,
}

impl<S: CompletionService> TracedService<S> {
    /// Wrap a completion service
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            requests: AtomicU64::new(0),
        }
    }

    /// Requests issued through this service so far
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl<S: CompletionService> CompletionService for TracedService<S> {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let request_id = self.requests.fetch_add(1, Ordering::Relaxed) + 1;
        let span = tracing::debug_span!(
            "completion",
            request_id,
            model = %request.model,
            user_chars = request.user_content.len(),
            max_response_tokens = request.max_response_tokens,
        );

        async {
            let started = Instant::now();
            let result = self.inner.complete(request).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match &result {
                Ok(text) => debug!(elapsed_ms, response_chars = text.len(), "completion finished"),
                Err(e) => warn!(elapsed_ms, error = %e, "completion failed"),
            }

            result
        }
        .instrument(span)
        .await
    }
}
