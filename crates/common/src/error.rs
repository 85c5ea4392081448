/// Completion service failures
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Request never reached the service or the connection dropped
    #[error("network failure: {0}")]
    Network(String),

    /// HTTP 429 without quota exhaustion
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Account quota or billing limit reached
    #[error("quota exceeded: {0}")]
    Quota(String),

    /// Any other non-success HTTP status
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// Response body could not be decoded or carried no content
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ServiceError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::RateLimited(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Quota(_) | Self::MalformedResponse(_) => false,
        }
    }
}

/// chatprofile error types
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// Text could not be encoded or decoded by the configured vocabulary
    #[error("Tokenization error: {0}")]
    Tokenization(String),

    /// Non-positive token budget handed to the chunker or truncator
    #[error("Token budget error: {0}")]
    ChunkBudget(String),

    /// Completion service error
    #[error("Completion service error: {0}")]
    Service(#[from] ServiceError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system error
    #[error("File system error: {0}")]
    FileSystem(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General error (anyhow integration)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProfileError {
    /// Create tokenization error
    pub fn tokenization<S: Into<String>>(msg: S) -> Self {
        Self::Tokenization(msg.into())
    }

    /// Create token budget error
    pub fn chunk_budget<S: Into<String>>(msg: S) -> Self {
        Self::ChunkBudget(msg.into())
    }

    /// Create config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create file system error
    pub fn file_system<S: Into<String>>(msg: S) -> Self {
        Self::FileSystem(msg.into())
    }

    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create not found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

// Process exit status for the CLI
impl ProfileError {
    /// Get process exit code
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::InvalidInput(_) => 2,
            Self::NotFound(_) => 2,
            Self::Service(_) => 3,
            Self::Tokenization(_) => 4,
            Self::ChunkBudget(_) => 4,
            Self::FileSystem(_) => 1,
            Self::Internal(_) => 1,
            Self::Io(_) => 1,
            Self::Json(_) => 1,
            Self::Other(_) => 1,
        }
    }
}
