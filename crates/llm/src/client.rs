use async_trait::async_trait;
use chatprofile_common::{AppConfig, ProfileError, Result, ServiceError};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::llm_trait::CompletionService;
use crate::types::{ChatCompletionRequest, ChatCompletionResponse, CompletionRequest};

/// Bounded retry with exponential backoff for transient service errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per request, including the first
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles after each failure
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before the attempt following `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// OpenAI chat completions client
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    client: Client,
    retry: RetryPolicy,
}

impl OpenAiClient {
    /// Create new OpenAI client
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let api_key = api_key.into();

        if api_key.trim().is_empty() {
            return Err(ProfileError::config("OpenAI API key is empty"));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        info!("OpenAI client initialized: {}", base_url);
        Ok(Self {
            base_url,
            api_key,
            client,
            retry: RetryPolicy::default(),
        })
    }

    /// Create client from application configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = config
            .openai_api_key
            .as_deref()
            .ok_or_else(|| ProfileError::config("OPENAI_API_KEY is not set"))?;

        let retry = RetryPolicy {
            max_attempts: config.max_retries,
            ..RetryPolicy::default()
        };

        Ok(Self::new(
            &config.openai_base_url,
            api_key,
            Duration::from_secs(config.request_timeout_secs),
        )?
        .with_retry(retry))
    }

    /// Replace the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Complete with retry for transient failures
    async fn complete_with_retry(&self, request: &CompletionRequest) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = ChatCompletionRequest::from(request);

        debug!(
            "Sending completion request - Model: {}, System length: {}, User length: {}",
            request.model,
            request.system_instruction.len(),
            request.user_content.len()
        );

        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.try_complete(&url, &body).await {
                Ok(text) => {
                    debug!("Received completion - Length: {}", text.len());
                    return Ok(text);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    warn!(
                        "Completion request failed (attempt {}/{}): {}. Retrying in {:?}...",
                        attempt, max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Single attempt
    async fn try_complete(
        &self,
        url: &str,
        body: &ChatCompletionRequest,
    ) -> std::result::Result<String, ServiceError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::MalformedResponse(format!("Failed to parse response: {}", e)))?;

        if let Some(usage) = result.usage {
            debug!(
                "Token usage - Prompt: {}, Completion: {}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        match result.first_content() {
            Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
            _ => Err(ServiceError::MalformedResponse(
                "missing choices[0].message.content".to_string(),
            )),
        }
    }
}

fn classify_status(status: StatusCode, body: String) -> ServiceError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        if body.contains("insufficient_quota") {
            ServiceError::Quota(body)
        } else {
            ServiceError::RateLimited(body)
        }
    } else {
        ServiceError::Api {
            status: status.as_u16(),
            body,
        }
    }
}

#[async_trait]
impl CompletionService for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.complete_with_retry(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OK_BODY: &str = r#"{"choices":[{"message":{"role":"assistant","content":"A concise summary."},"finish_reason":"stop"}]}"#;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new("gpt-4o-mini", "Summarize.", "chat lines", 500)
    }

    #[test]
    fn test_retry_delays_double() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let result = OpenAiClient::new("https://api.openai.com", " ", Duration::from_secs(5));
        assert!(matches!(result, Err(ProfileError::Config(_))));
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = AppConfig::default();
        assert!(OpenAiClient::from_config(&config).is_err());

        let mut config = AppConfig::default();
        config.openai_api_key = Some("sk-test".to_string());
        config.max_retries = 5;
        let client = OpenAiClient::from_config(&config).unwrap();
        assert_eq!(client.retry.max_attempts, 5);
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "slow down".into()),
            ServiceError::RateLimited(_)
        ));
        assert!(matches!(
            classify_status(
                StatusCode::TOO_MANY_REQUESTS,
                r#"{"error":{"code":"insufficient_quota"}}"#.into()
            ),
            ServiceError::Quota(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, String::new()),
            ServiceError::Api { status: 502, .. }
        ));
    }

    #[tokio::test]
    async fn test_complete_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"model":"gpt-4o-mini","max_tokens":500}"#.to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(OK_BODY)
            .create_async()
            .await;

        let client = OpenAiClient::new(server.url(), "sk-test", Duration::from_secs(5)).unwrap();
        let text = client.complete(request()).await.unwrap();

        assert_eq!(text, "A concise summary.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_transient_error_is_retried() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("POST", "/v1/chat/completions")
            .with_status(503)
            .with_body("overloaded")
            .expect(1)
            .create_async()
            .await;
        let succeeding = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(OK_BODY)
            .expect(1)
            .create_async()
            .await;

        let client = OpenAiClient::new(server.url(), "sk-test", Duration::from_secs(5))
            .unwrap()
            .with_retry(fast_retry());
        let text = client.complete(request()).await.unwrap();

        assert_eq!(text, "A concise summary.");
        failing.assert_async().await;
        succeeding.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(400)
            .with_body("bad request")
            .expect(1)
            .create_async()
            .await;

        let client = OpenAiClient::new(server.url(), "sk-test", Duration::from_secs(5))
            .unwrap()
            .with_retry(fast_retry());
        let err = client.complete(request()).await.unwrap_err();

        assert!(matches!(
            err,
            ProfileError::Service(ServiceError::Api { status: 400, .. })
        ));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_body("rate limit reached")
            .expect(3)
            .create_async()
            .await;

        let client = OpenAiClient::new(server.url(), "sk-test", Duration::from_secs(5))
            .unwrap()
            .with_retry(fast_retry());
        let err = client.complete(request()).await.unwrap_err();

        assert!(matches!(err, ProfileError::Service(ServiceError::RateLimited(_))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_content_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let client = OpenAiClient::new(server.url(), "sk-test", Duration::from_secs(5)).unwrap();
        let err = client.complete(request()).await.unwrap_err();

        assert!(matches!(
            err,
            ProfileError::Service(ServiceError::MalformedResponse(_))
        ));
    }
}
