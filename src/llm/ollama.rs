
use std::sync::Arc;
use futures::{
    FutureExt,
    future::BoxFuture,
};
use tracing::debug;

use crate::message::Message;
use crate::message::MessageRole as MsgRole;

use crate::llm::{
    traits::{Embedder, LLM},
    tokens::TokenUsage,
    error::LLMError,
    GenerateResult,
    LLMResult,
};

/// Default model name used when no model is specified.
/// Adjust this to match the model name you have installed in your local Ollama.
/// Common names: "llama3.2", "llama3", "qwen3:8b", or custom names from `ollama list`.
pub const DEFAULT_MODEL: &str = "llama3.2";

/// Default embedding model, see `ollama pull nomic-embed-text`.
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

pub use ollama_rs::{
    error::OllamaError,
    Ollama as OllamaClient,
    models::ModelOptions,
    generation::{
        chat::{request::ChatMessageRequest, ChatMessage, MessageRole},
        embeddings::request::GenerateEmbeddingsRequest,
    }
};


#[derive(Debug, Clone)]
pub struct Ollama {
    pub(crate) client: Arc<OllamaClient>,
    pub(crate) model: String,
    pub(crate) embedding_model: String,
    pub(crate) options: Option<ModelOptions>,
}
impl Ollama {
    /// Create an `Ollama` wrapper using the provided client and the default model.
    ///
    /// If your local Ollama uses a different default model name, change
    /// `DEFAULT_MODEL` or call `Ollama::with_model`.
    pub fn new(client: Arc<OllamaClient>) -> Self {
        Self {
            client,
            model: DEFAULT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            options: None,
        }
    }

    /// Connect to an Ollama server at `host` (e.g. `http://localhost`) and `port`.
    pub fn connect(host: impl Into<String>, port: u16) -> Self {
        Self::new(Arc::new(OllamaClient::builder().host(host.into()).port(port).build()))
    }

    /// Use an explicit chat model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Use an explicit embedding model name.
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Attach additional generation options (temperature, context size, ...).
    pub fn with_options(mut self, options: ModelOptions) -> Self {
        self.options = Some(options);
        self
    }

    fn generate_request(&self, messages: &[Message]) -> ChatMessageRequest {
        let mapped_messages = messages.iter().map(|message| message.into()).collect();
        let request = ChatMessageRequest::new(self.model.clone(), mapped_messages);
        match self.options.clone() {
            Some(options) => request.options(options),
            None => request,
        }
    }
}

impl Default for Ollama {
    fn default() -> Self {
        let client = Arc::new(OllamaClient::default());
        Ollama::new(client)
    }
}


impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        let role = match message.role {
            MsgRole::System => MessageRole::System,
            MsgRole::User => MessageRole::User,
            MsgRole::Assistant => MessageRole::Assistant,
        };
        ChatMessage::new(role, message.content.clone())
    }
}


impl LLM for Ollama {
    fn generate<'a>(&'a self, messages: &'a [Message]) -> BoxFuture<'a, LLMResult<GenerateResult>> {
        async move {
            let request = self.generate_request(messages);
            debug!(model = %self.model, messages = messages.len(), "sending chat request to Ollama");

            let response = self.client.send_chat_messages(request).await?;
            let generation = response.message.content;

            let tokens = match response.final_data {
                Some(final_data) => TokenUsage::new(
                    final_data.prompt_eval_count as u32,
                    final_data.eval_count as u32,
                ),
                None => TokenUsage::default(),
            };

            Ok(GenerateResult { tokens, generation })
        }
        .boxed()
    }
}

impl Embedder for Ollama {
    fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, LLMResult<Vec<Vec<f32>>>> {
        async move {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            let request = GenerateEmbeddingsRequest::new(self.embedding_model.clone(), texts.to_vec().into());
            let response = self.client.generate_embeddings(request).await?;
            if response.embeddings.len() != texts.len() {
                return Err(LLMError::InvalidResponse(format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    response.embeddings.len()
                )));
            }
            Ok(response.embeddings)
        }
        .boxed()
    }
}
