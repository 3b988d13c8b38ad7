use std::sync::Arc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::llm::traits::Embedder;
use super::error::RetrievalError;
use super::store::{Document, ScoredPassage, VectorStore};

/// Metadata key holding the chunk text.
pub const DEFAULT_TEXT_KEY: &str = "text";

/// Client for a hosted Pinecone index (data-plane REST API).
///
/// `host` is the index host shown in the Pinecone console, e.g.
/// `https://my-index-abc123.svc.us-east-1.pinecone.io`.
pub struct PineconeStore {
    client: reqwest::Client,
    host: String,
    api_key: String,
    namespace: Option<String>,
    text_key: String,
    embedder: Arc<dyn Embedder>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, Value>>,
}

impl PineconeStore {
    pub fn new(host: impl Into<String>, api_key: impl Into<String>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            client: reqwest::Client::new(),
            host: host.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            namespace: None,
            text_key: DEFAULT_TEXT_KEY.to_string(),
            embedder,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_text_key(mut self, text_key: impl Into<String>) -> Self {
        self.text_key = text_key.into();
        self
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> Result<Value, RetrievalError> {
        let response = self
            .client
            .post(format!("{}{}", self.host, path))
            .header("Api-Key", &self.api_key)
            .json(body)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;
        Ok(response)
    }
}

#[async_trait::async_trait]
impl VectorStore for PineconeStore {
    async fn add_documents(&self, documents: Vec<Document>) -> Result<usize, RetrievalError> {
        if documents.is_empty() {
            return Ok(0);
        }
        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        RetrievalError::check_embedding_count(documents.len(), embeddings.len())?;

        let vectors: Vec<Value> = documents
            .iter()
            .zip(&embeddings)
            .map(|(doc, values)| {
                let mut metadata = serde_json::Map::new();
                metadata.insert(self.text_key.clone(), Value::String(doc.text.clone()));
                if let Some(source) = &doc.source {
                    metadata.insert("source".to_string(), Value::String(source.clone()));
                }
                json!({ "id": doc.id, "values": values, "metadata": metadata })
            })
            .collect();

        let mut body = json!({ "vectors": vectors });
        if let Some(namespace) = &self.namespace {
            body["namespace"] = Value::String(namespace.clone());
        }

        let response = self.post("/vectors/upsert", &body).await?;
        let upserted = response
            .get("upsertedCount")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .unwrap_or(documents.len());
        debug!(upserted, "upserted vectors to Pinecone");
        Ok(upserted)
    }

    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<ScoredPassage>, RetrievalError> {
        let vector = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .pop()
            .ok_or_else(|| RetrievalError::InvalidResponse("no embedding for query".to_string()))?;

        let request = QueryRequest {
            vector: &vector,
            top_k: k,
            include_metadata: true,
            namespace: self.namespace.as_deref(),
        };
        let raw = self.post("/query", &request).await?;
        let response: QueryResponse = serde_json::from_value(raw)
            .map_err(|e| RetrievalError::InvalidResponse(e.to_string()))?;

        // matches without the text field carry nothing we can show the generator
        let passages = response
            .matches
            .into_iter()
            .filter_map(|m| {
                let text = m.metadata.as_ref()?.get(&self.text_key)?.as_str()?.to_string();
                Some(ScoredPassage { id: m.id, text, score: m.score })
            })
            .collect();
        Ok(passages)
    }
}
