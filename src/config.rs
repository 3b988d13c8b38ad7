//! TOML configuration for the collaborators and the agent loop.
//!
//! ```toml
//! [llm]
//! provider = "openai"
//! model = "gpt-4o-mini"
//! api_key = "sk-..."
//!
//! [vector_store]
//! provider = "pinecone"
//! host = "https://reports-abc123.svc.us-east-1.pinecone.io"
//! api_key = "pc-..."
//!
//! [web_search]
//! api_key = "tvly-..."
//!
//! [agent]
//! current_date = "2024-08-01"
//! ```

use std::path::Path;
use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::agent::types::{DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_PARSE_RETRIES};
use crate::retrieval::splitter::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::search::{DEFAULT_MAX_RESULTS, TAVILY_BASE_URL};
use crate::tools::vector_store_search::DEFAULT_TOP_K;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Missing configuration: {0}")]
    MissingConfig(String),
    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Ollama,
    OpenAI,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreProvider {
    #[default]
    Memory,
    Pinecone,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    /// Chat model; backend default when absent.
    pub model: Option<String>,
    /// Ollama host, e.g. `http://localhost`.
    pub host: String,
    /// Ollama port.
    pub port: u16,
    /// OpenAI-compatible API base, e.g. `https://api.openai.com/v1`.
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub temperature: Option<f32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: None,
            host: "http://localhost".to_string(),
            port: 11434,
            base_url: None,
            api_key: None,
            temperature: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding model; backend default when absent. Served by the `[llm]` provider.
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    pub provider: VectorStoreProvider,
    pub host: Option<String>,
    pub api_key: Option<String>,
    pub namespace: Option<String>,
    /// Passages retrieved per question.
    pub top_k: usize,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            provider: VectorStoreProvider::default(),
            host: None,
            api_key: None,
            namespace: None,
            top_k: DEFAULT_TOP_K,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub max_results: usize,
    pub search_depth: String,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: TAVILY_BASE_URL.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
            search_depth: "basic".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    pub max_iterations: usize,
    pub max_parse_retries: usize,
    /// Inserted into the prompt as today's date.
    pub current_date: String,
    pub timeout_secs: Option<u64>,
    /// Override for the system template.
    pub system_template: Option<String>,
    /// Override for the human template.
    pub human_template: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "ragent".to_string(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_parse_retries: DEFAULT_MAX_PARSE_RETRIES,
            current_date: crate::agent::DEFAULT_CURRENT_DATE.to_string(),
            timeout_secs: None,
            system_template: None,
            human_template: None,
        }
    }
}

impl AgentConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub vector_store: VectorStoreConfig,
    pub web_search: WebSearchConfig,
    pub agent: AgentConfig,
    pub ingest: IngestConfig,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = content.parse()?;
        Ok(config)
    }

    /// Check everything needed at startup; collaborators are not contacted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.provider == LlmProvider::OpenAI && is_blank(&self.llm.api_key) {
            return Err(ConfigError::MissingConfig("llm.api_key (required for openai)".into()));
        }
        if self.llm.provider == LlmProvider::Ollama {
            reqwest::Url::parse(&self.llm.host)
                .map_err(|e| ConfigError::InvalidConfig(format!("llm.host '{}': {}", self.llm.host, e)))?;
        }
        if let Some(temperature) = self.llm.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::InvalidConfig(format!(
                    "llm.temperature must be within 0.0..=2.0, got {}",
                    temperature
                )));
            }
        }

        if self.vector_store.provider == VectorStoreProvider::Pinecone {
            if is_blank(&self.vector_store.host) {
                return Err(ConfigError::MissingConfig("vector_store.host (required for pinecone)".into()));
            }
            if is_blank(&self.vector_store.api_key) {
                return Err(ConfigError::MissingConfig("vector_store.api_key (required for pinecone)".into()));
            }
        }
        if self.vector_store.top_k == 0 {
            return Err(ConfigError::InvalidConfig("vector_store.top_k must be at least 1".into()));
        }

        if is_blank(&self.web_search.api_key) {
            return Err(ConfigError::MissingConfig("web_search.api_key".into()));
        }
        reqwest::Url::parse(&self.web_search.base_url).map_err(|e| {
            ConfigError::InvalidConfig(format!("web_search.base_url '{}': {}", self.web_search.base_url, e))
        })?;
        if self.web_search.max_results == 0 {
            return Err(ConfigError::InvalidConfig("web_search.max_results must be at least 1".into()));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::InvalidConfig("agent.max_iterations must be at least 1".into()));
        }
        if self.agent.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidConfig("agent.timeout_secs must be at least 1".into()));
        }

        if self.ingest.chunk_size == 0 || self.ingest.chunk_overlap >= self.ingest.chunk_size {
            return Err(ConfigError::InvalidConfig(format!(
                "ingest.chunk_overlap ({}) must be smaller than a non-zero ingest.chunk_size ({})",
                self.ingest.chunk_overlap, self.ingest.chunk_size
            )));
        }
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
        [llm]
        provider = "openai"
        model = "gpt-4o-mini"
        api_key = "sk-test"
        temperature = 0.0

        [embedding]
        model = "text-embedding-3-small"

        [vector_store]
        provider = "pinecone"
        host = "https://reports.svc.pinecone.io"
        api_key = "pc-test"
        namespace = "10q"
        top_k = 3

        [web_search]
        api_key = "tvly-test"
        max_results = 5

        [agent]
        max_iterations = 8
        max_parse_retries = 2
        current_date = "2024-08-01"
        timeout_secs = 60

        [ingest]
        chunk_size = 500
        chunk_overlap = 50
    "#;

    #[test]
    fn parses_full_config() {
        let config: AppConfig = FULL.parse().unwrap();
        config.validate().unwrap();
        assert_eq!(config.llm.provider, LlmProvider::OpenAI);
        assert_eq!(config.vector_store.provider, VectorStoreProvider::Pinecone);
        assert_eq!(config.vector_store.top_k, 3);
        assert_eq!(config.web_search.max_results, 5);
        assert_eq!(config.web_search.base_url, TAVILY_BASE_URL);
        assert_eq!(config.agent.timeout(), Some(Duration::from_secs(60)));
        assert_eq!(config.ingest.chunk_overlap, 50);
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config: AppConfig = "[web_search]\napi_key = \"tvly-test\"".parse().unwrap();
        config.validate().unwrap();
        assert_eq!(config.llm.provider, LlmProvider::Ollama);
        assert_eq!(config.llm.port, 11434);
        assert_eq!(config.vector_store.provider, VectorStoreProvider::Memory);
        assert_eq!(config.vector_store.top_k, DEFAULT_TOP_K);
        assert_eq!(config.web_search.max_results, DEFAULT_MAX_RESULTS);
        assert_eq!(config.agent.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(config.ingest.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn reports_missing_credentials() {
        let config = AppConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::MissingConfig(key)) if key == "web_search.api_key"));

        let mut config: AppConfig = FULL.parse().unwrap();
        config.vector_store.api_key = Some("  ".into());
        assert!(matches!(config.validate(), Err(ConfigError::MissingConfig(_))));

        let mut config: AppConfig = FULL.parse().unwrap();
        config.llm.api_key = None;
        assert!(matches!(config.validate(), Err(ConfigError::MissingConfig(_))));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut config: AppConfig = FULL.parse().unwrap();
        config.agent.max_iterations = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidConfig(_))));

        let mut config: AppConfig = FULL.parse().unwrap();
        config.ingest.chunk_overlap = 500;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidConfig(_))));

        let mut config: AppConfig = FULL.parse().unwrap();
        config.llm.temperature = Some(3.5);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_unknown_provider() {
        let err = "[llm]\nprovider = \"mystery\"".parse::<AppConfig>().unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = AppConfig::load("/definitely/not/here/ragent.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
