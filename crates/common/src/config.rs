use crate::error::ProfileError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// chatprofile application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// OpenAI API key
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,

    /// OpenAI-compatible API base URL
    pub openai_base_url: String,

    /// Completion model identifier
    pub llm_model: String,

    /// Tokenizer vocabulary name (derived from the model when unset)
    pub tokenizer_vocabulary: Option<String>,

    /// Root directory of the chat exports
    pub source_dir: PathBuf,

    /// Speaker name whose lines are extracted (e.g. "Jane Doe:")
    pub speaker_name: Option<String>,

    /// Treat `speaker_name` as a regex fragment instead of a literal label
    pub speaker_regex: bool,

    /// Extension of the chat export files
    pub source_extension: String,

    /// Extracted lines file
    pub extracted_file: PathBuf,

    /// Chunk summaries file
    pub summaries_file: PathBuf,

    /// Final analysis file
    pub analysis_file: PathBuf,

    /// Maximum tokens per summarization chunk
    pub chunk_size: usize,

    /// Context window of the completion model
    pub max_context_tokens: usize,

    /// Tokens reserved for the analysis response
    pub reserve_tokens: usize,

    /// Response limit for each chunk summary
    pub summary_max_tokens: usize,

    /// Prompt language ("en" or "es")
    pub prompt_language: String,

    /// Optional file overriding the summary instruction
    pub summary_prompt_file: Option<PathBuf>,

    /// Optional file overriding the analysis instruction
    pub analysis_prompt_file: Option<PathBuf>,

    /// Chunk summaries in flight at once
    pub summary_concurrency: usize,

    /// Attempts per completion request
    pub max_retries: u32,

    /// HTTP timeout per completion request
    pub request_timeout_secs: u64,

    /// Log directory
    pub log_dir: PathBuf,

    /// Log level
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: "https://api.openai.com".to_string(),
            llm_model: "gpt-4o-mini".to_string(),
            tokenizer_vocabulary: None,
            source_dir: PathBuf::from("."),
            speaker_name: None,
            speaker_regex: false,
            source_extension: "txt".to_string(),
            extracted_file: PathBuf::from("all_profile_lines.txt"),
            summaries_file: PathBuf::from("summaries.txt"),
            analysis_file: PathBuf::from("profile_analysis.txt"),
            chunk_size: 7000,
            max_context_tokens: 8192,
            reserve_tokens: 1500,
            summary_max_tokens: 500,
            prompt_language: "en".to_string(),
            summary_prompt_file: None,
            analysis_prompt_file: None,
            summary_concurrency: 1,
            max_retries: 3,
            request_timeout_secs: 300,
            log_dir: PathBuf::from("./log"),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self, ProfileError> {
        // Load .env file (ignore if not exists)
        let _ = dotenv::dotenv();

        let defaults = Self::default();

        let config = Self {
            openai_api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or(defaults.openai_base_url),
            llm_model: std::env::var("LLM_MODEL").unwrap_or(defaults.llm_model),
            tokenizer_vocabulary: std::env::var("TOKENIZER_VOCABULARY").ok(),
            source_dir: Self::get_env_path("SOURCE_DIR").unwrap_or(defaults.source_dir),
            speaker_name: std::env::var("SPEAKER_NAME").ok(),
            speaker_regex: Self::get_env_parsed("SPEAKER_REGEX")?.unwrap_or(defaults.speaker_regex),
            source_extension: std::env::var("SOURCE_EXTENSION")
                .unwrap_or(defaults.source_extension),
            extracted_file: Self::get_env_path("EXTRACTED_FILE")
                .unwrap_or(defaults.extracted_file),
            summaries_file: Self::get_env_path("SUMMARIES_FILE")
                .unwrap_or(defaults.summaries_file),
            analysis_file: Self::get_env_path("ANALYSIS_FILE")
                .unwrap_or(defaults.analysis_file),
            chunk_size: Self::get_env_parsed("CHUNK_SIZE")?.unwrap_or(defaults.chunk_size),
            max_context_tokens: Self::get_env_parsed("MAX_CONTEXT_TOKENS")?
                .unwrap_or(defaults.max_context_tokens),
            reserve_tokens: Self::get_env_parsed("RESERVE_TOKENS")?
                .unwrap_or(defaults.reserve_tokens),
            summary_max_tokens: Self::get_env_parsed("SUMMARY_MAX_TOKENS")?
                .unwrap_or(defaults.summary_max_tokens),
            prompt_language: std::env::var("PROMPT_LANGUAGE")
                .unwrap_or(defaults.prompt_language),
            summary_prompt_file: Self::get_env_path("SUMMARY_PROMPT_FILE"),
            analysis_prompt_file: Self::get_env_path("ANALYSIS_PROMPT_FILE"),
            summary_concurrency: Self::get_env_parsed("SUMMARY_CONCURRENCY")?
                .unwrap_or(defaults.summary_concurrency),
            max_retries: Self::get_env_parsed("MAX_RETRIES")?.unwrap_or(defaults.max_retries),
            request_timeout_secs: Self::get_env_parsed("REQUEST_TIMEOUT_SECS")?
                .unwrap_or(defaults.request_timeout_secs),
            log_dir: Self::get_env_path("LOG_DIR").unwrap_or(defaults.log_dir),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        };

        Ok(config)
    }

    /// Load configuration from a TOML file, layered with `CHATPROFILE_*` env vars
    pub fn from_file(path: &Path) -> Result<Self, ProfileError> {
        let _ = dotenv::dotenv();

        let mut config: Self = ::config::Config::builder()
            .add_source(::config::File::from(path.to_path_buf()).required(true))
            .add_source(::config::Environment::with_prefix("CHATPROFILE").try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| {
                ProfileError::config(format!(
                    "Failed to load configuration from {}: {}",
                    path.display(),
                    e
                ))
            })?;

        // Credential falls back to OPENAI_API_KEY
        if config.openai_api_key.is_none() {
            config.openai_api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
        }

        Ok(config)
    }

    /// Get PathBuf from environment variable
    fn get_env_path(key: &str) -> Option<PathBuf> {
        std::env::var(key).ok().map(PathBuf::from)
    }

    /// Parse environment variable; a value that does not parse is an error
    fn get_env_parsed<T>(key: &str) -> Result<Option<T>, ProfileError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match std::env::var(key) {
            Ok(value) => value.trim().parse().map(Some).map_err(|e| {
                ProfileError::config(format!("Invalid value for {}: '{}' ({})", key, value, e))
            }),
            Err(_) => Ok(None),
        }
    }

    /// Files written by the pipeline, excluded from extraction
    pub fn output_files(&self) -> Vec<PathBuf> {
        vec![
            self.extracted_file.clone(),
            self.summaries_file.clone(),
            self.analysis_file.clone(),
        ]
    }

    /// Tokens left for content once the response reserve is set aside
    pub fn context_after_reserve(&self) -> usize {
        self.max_context_tokens.saturating_sub(self.reserve_tokens)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.llm_model.trim().is_empty() {
            return Err(ProfileError::config("LLM model name cannot be empty"));
        }

        if !self.openai_base_url.starts_with("http://")
            && !self.openai_base_url.starts_with("https://") {
            return Err(ProfileError::config(
                "OpenAI base URL must start with http:// or https://"
            ));
        }

        if self.chunk_size == 0 {
            return Err(ProfileError::config("Chunk size must be greater than 0"));
        }

        if self.summary_concurrency == 0 {
            return Err(ProfileError::config("Summary concurrency must be at least 1"));
        }

        if self.max_retries == 0 {
            return Err(ProfileError::config("Max retries must be at least 1"));
        }

        if self.context_after_reserve() == 0 {
            return Err(ProfileError::config(format!(
                "Reserve tokens ({}) must be smaller than the context window ({})",
                self.reserve_tokens, self.max_context_tokens
            )));
        }

        let chunk_request_tokens = self.chunk_size.checked_add(self.summary_max_tokens);
        if chunk_request_tokens.map_or(true, |total| total > self.max_context_tokens) {
            return Err(ProfileError::config(format!(
                "Chunk size ({}) plus summary response ({}) exceeds the context window ({})",
                self.chunk_size, self.summary_max_tokens, self.max_context_tokens
            )));
        }

        if let Some(speaker) = &self.speaker_name {
            if speaker.trim().is_empty() {
                return Err(ProfileError::config("Speaker name cannot be blank"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.chunk_size, 7000);
        assert_eq!(config.max_context_tokens, 8192);
        assert_eq!(config.reserve_tokens, 1500);
        assert_eq!(config.llm_model, "gpt-4o-mini");
        assert_eq!(config.context_after_reserve(), 6692);
    }

    #[test]
    fn test_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());

        let mut invalid_config = AppConfig::default();
        invalid_config.llm_model = String::new();
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = AppConfig::default();
        invalid_config.openai_base_url = "api.openai.com".to_string();
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = AppConfig::default();
        invalid_config.chunk_size = 0;
        assert!(invalid_config.validate().is_err());
    }

    #[test]
    fn test_validate_token_budgets() {
        let mut config = AppConfig::default();
        config.reserve_tokens = 8192;
        assert!(matches!(config.validate(), Err(ProfileError::Config(_))));

        let mut config = AppConfig::default();
        config.chunk_size = 8000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_overflowing_chunk_request() {
        let mut config = AppConfig::default();
        config.chunk_size = usize::MAX;
        config.summary_max_tokens = 2;
        assert!(matches!(config.validate(), Err(ProfileError::Config(_))));
    }

    #[test]
    fn test_env_parsed_rejects_malformed_value() {
        std::env::set_var("CFGTEST_CHUNK_SIZE", "7k");
        let result = AppConfig::get_env_parsed::<usize>("CFGTEST_CHUNK_SIZE");
        std::env::remove_var("CFGTEST_CHUNK_SIZE");

        match result {
            Err(ProfileError::Config(msg)) => {
                assert!(msg.contains("CFGTEST_CHUNK_SIZE"));
                assert!(msg.contains("7k"));
            }
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_env_parsed_reads_value_or_none() {
        std::env::set_var("CFGTEST_RESERVE", " 1200 ");
        let value = AppConfig::get_env_parsed::<usize>("CFGTEST_RESERVE").unwrap();
        std::env::remove_var("CFGTEST_RESERVE");
        assert_eq!(value, Some(1200));

        let missing = AppConfig::get_env_parsed::<usize>("CFGTEST_UNSET_KEY").unwrap();
        assert_eq!(missing, None);
    }

    #[test]
    fn test_output_files() {
        let config = AppConfig::default();
        let outputs = config.output_files();
        assert_eq!(outputs.len(), 3);
        assert!(outputs.contains(&PathBuf::from("summaries.txt")));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "llm_model = \"gpt-4o\"\nchunk_size = 3000\nspeaker_name = \"Jane Doe:\"\nprompt_language = \"es\""
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.llm_model, "gpt-4o");
        assert_eq!(config.chunk_size, 3000);
        assert_eq!(config.speaker_name.as_deref(), Some("Jane Doe:"));
        assert_eq!(config.prompt_language, "es");
        // Unset keys keep their defaults
        assert_eq!(config.reserve_tokens, 1500);
    }

    #[test]
    fn test_from_missing_file() {
        let result = AppConfig::from_file(Path::new("/nonexistent/chatprofile.toml"));
        assert!(matches!(result, Err(ProfileError::Config(_))));
    }
}
