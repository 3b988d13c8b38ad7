pub mod traits;
pub mod openai;
pub mod ollama;
pub mod tokens;
pub mod error;


use serde::{Serialize, Deserialize};
use tokens::TokenUsage;

/// Result of a text generation from an LLM.
///
/// Tool selection never relies on vendor function calling: the agent parses
/// `generation` itself, so only the raw text and usage are carried here.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct GenerateResult {
    pub tokens: TokenUsage,
    pub generation: String,
}

impl GenerateResult {
    pub fn new(generation: impl Into<String>) -> Self {
        Self {
            tokens: TokenUsage::default(),
            generation: generation.into(),
        }
    }
}

/// Result type for LLM operations.
pub type LLMResult<T> = std::result::Result<T, error::LLMError>;
