//! Web search collaborator.

use serde::{Deserialize, Serialize};
use tracing::debug;

pub const TAVILY_BASE_URL: &str = "https://api.tavily.com";
pub const DEFAULT_MAX_RESULTS: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Search provider returned {status}: {body}")]
    Status {
        status: u16,
        body: String,
    },
}

/// One web result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    pub content: String,
}

#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError>;
}

/// Tavily search API client.
#[derive(Debug, Clone)]
pub struct TavilyClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    search_depth: String,
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'a str,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

impl TavilyClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: TAVILY_BASE_URL.to_string(),
            search_depth: "basic".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// `"basic"` or `"advanced"`.
    pub fn with_search_depth(mut self, depth: impl Into<String>) -> Self {
        self.search_depth = depth.into();
        self
    }
}

#[async_trait::async_trait]
impl SearchProvider for TavilyClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        debug!(query, max_results, "querying Tavily");
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&TavilyRequest {
                query,
                max_results,
                search_depth: &self.search_depth,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status { status: status.as_u16(), body });
        }

        let mut parsed: TavilyResponse = response.json().await?;
        parsed.results.truncate(max_results);
        Ok(parsed.results)
    }
}
