//! ISE Configuration Management
//!
//! Handles configuration from environment variables, config files,
//! and command-line arguments with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Search provider configuration
    pub search: SearchConfig,

    /// Page fetching configuration
    pub fetch: FetchConfig,

    /// Relation extraction configuration
    pub extraction: ExtractionConfig,

    /// Bootstrapping loop configuration
    pub bootstrap: BootstrapConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_override()
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        Self::from_toml_str(&content).map_err(|message| ConfigError::ParseError { path, message })
    }

    fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        // Search
        if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
            self.search.api_key = Some(key);
        }
        if let Ok(id) = std::env::var("GOOGLE_ENGINE_ID") {
            self.search.engine_id = Some(id);
        }

        // Fetch
        if let Ok(secs) = std::env::var("FETCH_TIMEOUT_SECS") {
            self.fetch.timeout_secs = parse_env("FETCH_TIMEOUT_SECS", secs)?;
        }
        if let Ok(cap) = std::env::var("FETCH_MAX_CHARS") {
            self.fetch.max_chars = parse_env("FETCH_MAX_CHARS", cap)?;
        }

        // Extraction
        if let Ok(backend) = std::env::var("ISE_EXTRACTOR") {
            self.extraction.backend = backend.parse()?;
        }
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            self.extraction.llm.provider = provider.parse()?;
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.extraction.llm.openai_api_key = Some(key);
        }
        if let Ok(url) = std::env::var("OLLAMA_URL") {
            self.extraction.llm.ollama_url = url;
        }
        if let Ok(model) = std::env::var("LLM_MODEL") {
            self.extraction.llm.model = model;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(self)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// Search provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Google Custom Search JSON API key
    pub api_key: Option<String>,

    /// Google Custom Search engine ID
    pub engine_id: Option<String>,

    /// Custom Search endpoint
    pub base_url: String,

    /// Result pages requested per query (the API caps this at 10)
    pub results_per_query: u8,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            engine_id: None,
            base_url: "https://www.googleapis.com/customsearch/v1".to_string(),
            results_per_query: 10,
            timeout_secs: 30,
        }
    }
}

/// Page fetching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Hard wall-clock limit for fetching and extracting one page
    pub timeout_secs: u64,

    /// Extracted text is truncated to this many characters
    pub max_chars: usize,

    /// User-Agent header sent with page requests
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            max_chars: 20_000,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        }
    }
}

/// Relation extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Which extractor implementation to use
    pub backend: ExtractorBackend,

    /// LLM settings (used by the `llm` backend)
    pub llm: LlmConfig,
}

/// Extractor implementations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorBackend {
    /// Rule-based NER + keyword relation patterns
    #[default]
    Rules,
    /// LLM prompted for JSON relation tuples
    Llm,
}

impl std::str::FromStr for ExtractorBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rules" | "rule" => Ok(Self::Rules),
            "llm" => Ok(Self::Llm),
            _ => Err(ConfigError::InvalidValue {
                key: "ISE_EXTRACTOR".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// LLM provider to use
    pub provider: LlmProvider,

    /// OpenAI API key
    pub openai_api_key: Option<String>,

    /// OpenAI API base URL (for Azure or compatible APIs)
    pub openai_base_url: Option<String>,

    /// Ollama server URL
    pub ollama_url: String,

    /// Model name to use
    pub model: String,

    /// Maximum tokens for completion
    pub max_tokens: u32,

    /// Temperature for generation
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            openai_api_key: None,
            openai_base_url: None,
            ollama_url: "http://localhost:11434".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1024,
            temperature: 0.0,
            timeout_secs: 60,
        }
    }
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAI,
    Ollama,
    Azure,
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            "azure" => Ok(Self::Azure),
            _ => Err(ConfigError::InvalidValue {
                key: "LLM_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Bootstrapping loop configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BootstrapConfig {
    /// How the next query is derived from extracted tuples
    pub augmentation: AugmentationPolicy,

    /// Optional cap on iterations; `None` runs until k or no progress
    pub max_iterations: Option<u32>,
}

/// Query augmentation policies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AugmentationPolicy {
    /// Append the words of the single best tuple not yet in the query
    #[default]
    FirstEligible,
    /// Append the words of every tuple not yet in the query
    AllEligible,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.fetch.timeout_secs, 20);
        assert_eq!(config.fetch.max_chars, 20_000);
        assert_eq!(config.search.results_per_query, 10);
        assert_eq!(config.extraction.backend, ExtractorBackend::Rules);
        assert_eq!(
            config.bootstrap.augmentation,
            AugmentationPolicy::FirstEligible
        );
        assert!(config.bootstrap.max_iterations.is_none());
    }

    #[test]
    fn test_llm_provider_parse() {
        assert_eq!(
            "openai".parse::<LlmProvider>().unwrap(),
            LlmProvider::OpenAI
        );
        assert_eq!(
            "Ollama".parse::<LlmProvider>().unwrap(),
            LlmProvider::Ollama
        );
        assert!("invalid".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn test_extractor_backend_parse() {
        assert_eq!(
            "llm".parse::<ExtractorBackend>().unwrap(),
            ExtractorBackend::Llm
        );
        assert_eq!(
            "rules".parse::<ExtractorBackend>().unwrap(),
            ExtractorBackend::Rules
        );
        assert!("spanbert".parse::<ExtractorBackend>().is_err());
    }

    #[test]
    fn test_partial_toml() {
        let config = AppConfig::from_toml_str(
            r#"
            [fetch]
            max_chars = 5000

            [bootstrap]
            augmentation = "all_eligible"
            max_iterations = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.fetch.max_chars, 5000);
        assert_eq!(config.fetch.timeout_secs, 20);
        assert_eq!(config.bootstrap.augmentation, AugmentationPolicy::AllEligible);
        assert_eq!(config.bootstrap.max_iterations, Some(8));
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::from_file("/nonexistent/ise.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileReadError { .. }));
    }

    #[test]
    fn test_example_config_parses() {
        let config =
            AppConfig::from_toml_str(include_str!("../../../config/ise.example.toml")).unwrap();
        assert_eq!(config.fetch.max_chars, 20_000);
        assert_eq!(config.extraction.backend, ExtractorBackend::Rules);
        assert_eq!(config.extraction.llm.provider, LlmProvider::OpenAI);
        assert_eq!(
            config.bootstrap.augmentation,
            AugmentationPolicy::FirstEligible
        );
        assert!(config.search.api_key.is_none());
    }
}
