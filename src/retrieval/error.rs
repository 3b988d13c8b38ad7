use crate::llm::error::LLMError;

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("Embedding error: {0}")]
    Embedding(#[from] LLMError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: usize,
        actual: usize,
    },
}

impl RetrievalError {
    /// One vector per input text, or an error.
    pub(crate) fn check_embedding_count(texts: usize, vectors: usize) -> Result<(), Self> {
        if texts == vectors {
            Ok(())
        } else {
            Err(Self::InvalidResponse(format!(
                "embedder returned {} vectors for {} documents",
                vectors, texts
            )))
        }
    }
}
