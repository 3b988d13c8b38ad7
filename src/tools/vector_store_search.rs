use std::sync::Arc;
use tracing::{debug, warn};

use crate::llm::traits::LLM;
use crate::message::Message;
use crate::retrieval::store::{ScoredPassage, VectorStore};
use super::error::ToolError;
use super::schema::ArgSchema;
use super::traits::Tool;

pub const NAME: &str = "VectorStoreSearch";
pub const DEFAULT_TOP_K: usize = 4;
pub const NO_CONTEXT: &str = "No relevant context was found in the knowledge store.";

const DESCRIPTION: &str = "Answers questions from the internal knowledge base of indexed documents. \
Use this first for questions the documents may cover.";

const QA_INSTRUCTION: &str = "Use only the following pieces of context to answer the question. \
If the context does not contain the answer, say that you don't know; do not make up an answer.";

/// Retrieval-then-generation over the knowledge store.
pub struct VectorStoreSearch {
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LLM>,
    top_k: usize,
}

impl VectorStoreSearch {
    pub fn new(store: Arc<dyn VectorStore>, llm: Arc<dyn LLM>) -> Self {
        Self {
            store,
            llm,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    fn qa_messages(question: &str, passages: &[ScoredPassage]) -> Vec<Message> {
        let context = if passages.is_empty() {
            NO_CONTEXT.to_string()
        } else {
            passages
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n")
        };
        vec![
            Message::system(format!("{}\n\n{}", QA_INSTRUCTION, context)),
            Message::user(question),
        ]
    }
}

#[async_trait::async_trait]
impl Tool for VectorStoreSearch {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn args(&self) -> Vec<ArgSchema> {
        vec![ArgSchema::string("query", "The question to answer from the documents")]
    }

    async fn run(&self, input: &str) -> Result<String, ToolError> {
        let passages = self
            .store
            .similarity_search(input, self.top_k)
            .await
            .map_err(|e| ToolError::execution(NAME, e))?;
        if passages.is_empty() {
            warn!(query = input, "knowledge store returned no passages");
        } else {
            debug!(query = input, passages = passages.len(), "retrieved passages");
        }

        let messages = Self::qa_messages(input, &passages);
        let answer = self
            .llm
            .generate(&messages)
            .await
            .map_err(|e| ToolError::execution(NAME, e))?;
        Ok(answer.generation)
    }
}
