use serde::{Deserialize, Serialize};

/// One completion request as the stages see it
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier (e.g., "gpt-4o-mini")
    pub model: String,

    /// Fixed instruction sent as the system message
    pub system_instruction: String,

    /// Variable content sent as the user message
    pub user_content: String,

    /// Maximum tokens to generate
    pub max_response_tokens: u32,
}

impl CompletionRequest {
    /// Create new completion request
    pub fn new(
        model: impl Into<String>,
        system_instruction: impl Into<String>,
        user_content: impl Into<String>,
        max_response_tokens: u32,
    ) -> Self {
        Self {
            model: model.into(),
            system_instruction: system_instruction.into(),
            user_content: user_content.into(),
            max_response_tokens,
        }
    }
}

/// Chat completions request body
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,

    pub messages: Vec<ChatMessage>,

    pub max_tokens: u32,
}

impl From<&CompletionRequest> for ChatCompletionRequest {
    fn from(request: &CompletionRequest) -> Self {
        Self {
            model: request.model.clone(),
            messages: vec![
                ChatMessage::system(request.system_instruction.clone()),
                ChatMessage::user(request.user_content.clone()),
            ],
            max_tokens: request.max_response_tokens,
        }
    }
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,

    #[serde(default)]
    pub content: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(content.into()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Chat completions response body
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,

    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ChatCompletionResponse {
    /// Text of the first choice, if any
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,

    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Token accounting reported by the service
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Summary of one chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSummary {
    /// 1-based chunk index
    pub index: usize,

    /// Summary text returned by the service
    pub text: String,
}

impl ChunkSummary {
    /// Create new chunk summary
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Header line preceding the summary in the summaries document
    pub fn header(&self) -> String {
        format!("Summary of chunk {}:", self.index)
    }
}

/// Final profile narrative
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileAnalysis {
    /// Narrative text, verbatim from the service
    pub narrative: String,

    /// Token count of the summaries document
    pub original_tokens: usize,

    /// Token count actually submitted
    pub submitted_tokens: usize,
}

impl ProfileAnalysis {
    /// Whether the summaries had to be cut to fit the budget
    pub fn was_truncated(&self) -> bool {
        self.original_tokens != self.submitted_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_body() {
        let request = CompletionRequest::new("gpt-4o-mini", "be brief", "hello", 500);
        let body = serde_json::to_value(ChatCompletionRequest::from(&request)).unwrap();

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "be brief");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "hello");
    }

    #[test]
    fn test_chat_request_body_has_only_wire_fields() {
        let request = CompletionRequest::new("m", "s", "u", 10);
        let body = serde_json::to_value(ChatCompletionRequest::from(&request)).unwrap();
        let mut keys: Vec<&str> = body.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, ["max_tokens", "messages", "model"]);
    }

    #[test]
    fn test_response_first_content() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"profile"},"finish_reason":"stop"}],
                       "usage":{"prompt_tokens":10,"completion_tokens":2}}"#;
        let response: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.first_content(), Some("profile"));
        assert_eq!(response.usage.unwrap().completion_tokens, 2);

        let empty: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(empty.first_content(), None);
    }

    #[test]
    fn test_summary_header() {
        assert_eq!(ChunkSummary::new(3, "x").header(), "Summary of chunk 3:");
    }
}
