use async_trait::async_trait;
use chatprofile_common::Result;
use std::sync::Arc;

use crate::types::CompletionRequest;

/// Common trait for text completion services
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Complete the request and return the response text
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

#[async_trait]
impl<S: CompletionService + ?Sized> CompletionService for Arc<S> {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        (**self).complete(request).await
    }
}
