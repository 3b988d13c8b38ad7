use std::sync::Arc;
use tracing::debug;

use crate::search::{SearchHit, SearchProvider, DEFAULT_MAX_RESULTS};
use super::error::ToolError;
use super::schema::ArgSchema;
use super::traits::Tool;

pub const NAME: &str = "WebSearch";

const DESCRIPTION: &str = "Searches the web for current information. \
Use this when the knowledge base does not have the answer.";

/// Raw web results as the observation; synthesis is left to the agent.
pub struct WebSearch {
    provider: Arc<dyn SearchProvider>,
    max_results: usize,
}

impl WebSearch {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            provider,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

/// One compact JSON object per line.
pub fn format_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| serde_json::to_string(hit).unwrap_or_else(|_| format!("{} {}", hit.url, hit.content)))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait::async_trait]
impl Tool for WebSearch {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn args(&self) -> Vec<ArgSchema> {
        vec![ArgSchema::string("query", "Web search query")]
    }

    async fn run(&self, input: &str) -> Result<String, ToolError> {
        let hits = self
            .provider
            .search(input, self.max_results)
            .await
            .map_err(|e| ToolError::execution(NAME, e))?;
        debug!(query = input, hits = hits.len(), "web search finished");
        if hits.is_empty() {
            return Ok(format!("No results found for: {}", input));
        }
        Ok(format_hits(&hits))
    }
}
