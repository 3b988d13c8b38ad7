use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::llm::traits::Embedder;
use super::error::RetrievalError;
use super::store::{Document, ScoredPassage, VectorStore};

struct Entry {
    document: Document,
    embedding: Vec<f32>,
}

/// Process-local vector index using cosine similarity.
///
/// Useful for demos and tests; contents are lost when the process exits.
pub struct InMemoryVectorStore {
    embedder: Arc<dyn Embedder>,
    entries: RwLock<Vec<Entry>>,
}

impl InMemoryVectorStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait::async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add_documents(&self, documents: Vec<Document>) -> Result<usize, RetrievalError> {
        if documents.is_empty() {
            return Ok(0);
        }
        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        RetrievalError::check_embedding_count(documents.len(), embeddings.len())?;

        let mut entries = self.entries.write().await;
        let dim = entries
            .first()
            .map(|e| e.embedding.len())
            .or_else(|| embeddings.first().map(Vec::len));
        if let Some(dim) = dim {
            if let Some(bad) = embeddings.iter().find(|e| e.len() != dim) {
                return Err(RetrievalError::DimensionMismatch { expected: dim, actual: bad.len() });
            }
        }

        let count = documents.len();
        for (document, embedding) in documents.into_iter().zip(embeddings) {
            match entries.iter_mut().find(|e| e.document.id == document.id) {
                Some(existing) => {
                    existing.document = document;
                    existing.embedding = embedding;
                }
                None => entries.push(Entry { document, embedding }),
            }
        }
        debug!(added = count, total = entries.len(), "indexed documents");
        Ok(count)
    }

    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<ScoredPassage>, RetrievalError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let query_embedding = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .pop()
            .ok_or_else(|| RetrievalError::InvalidResponse("no embedding for query".to_string()))?;

        let entries = self.entries.read().await;
        if let Some(dim) = entries.first().map(|e| e.embedding.len()) {
            if query_embedding.len() != dim {
                return Err(RetrievalError::DimensionMismatch { expected: dim, actual: query_embedding.len() });
            }
        }
        let mut scored: Vec<ScoredPassage> = entries
            .iter()
            .map(|e| ScoredPassage {
                id: e.document.id.clone(),
                text: e.document.text.clone(),
                score: cosine_similarity(&query_embedding, &e.embedding),
            })
            .collect();
        // stable sort keeps insertion order for equal scores
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}
