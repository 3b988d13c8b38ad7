use serde::{Serialize, Deserialize};

use super::error::RetrievalError;

/// A chunk of source text to be indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    /// Where the chunk came from (file name, URL, ...).
    #[serde(default)]
    pub source: Option<String>,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// A retrieved passage with its similarity score (higher is closer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub id: String,
    pub text: String,
    pub score: f32,
}

/// Vector database seam.
///
/// Embedding dimensionality, distance metric and index layout belong to the
/// implementation.
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    /// Embed and index documents. Existing ids are overwritten.
    async fn add_documents(&self, documents: Vec<Document>) -> Result<usize, RetrievalError>;

    /// Top-`k` passages for `query`, best first.
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<ScoredPassage>, RetrievalError>;
}
