// 参考：https://github.com/64bit/async-openai/tree/main/examples
pub use async_openai::{
    Client, config::{Config, OpenAIConfig}, error::OpenAIError
};
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
    CreateEmbeddingRequestArgs,
};
use futures::{FutureExt, future::BoxFuture};
use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::message::{Message, MessageRole};
use crate::llm::{
    traits::{Embedder, LLM},
    tokens::TokenUsage,
    error::LLMError,
    GenerateResult,
    LLMResult,
};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: None,
            temperature: None,
        }
    }
}

pub struct OpenAI {
    pub client: Client<OpenAIConfig>,
    pub options: CompletionOptions,
    pub embedding_model: String,
}

impl OpenAI {
    /// Client configured from `OPENAI_API_KEY` as `async-openai` does by default.
    pub fn new() -> Self {
        Self::with_config(OpenAIConfig::new())
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self::with_config(OpenAIConfig::new().with_api_key(api_key))
    }

    pub fn with_config(config: OpenAIConfig) -> Self {
        Self {
            client: Client::with_config(config),
            options: CompletionOptions::default(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }
}

impl Default for OpenAI {
    fn default() -> Self {
        Self::new()
    }
}

fn to_request_message(message: &Message) -> Result<ChatCompletionRequestMessage, OpenAIError> {
    let content = message.content.clone();
    let mapped = match message.role {
        MessageRole::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        MessageRole::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        MessageRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()?
            .into(),
    };
    Ok(mapped)
}

impl LLM for OpenAI {
    fn generate<'a>(&'a self, messages: &'a [Message]) -> BoxFuture<'a, LLMResult<GenerateResult>> {
        async move {
            let mapped = messages
                .iter()
                .map(to_request_message)
                .collect::<Result<Vec<_>, _>>()?;

            let mut args = CreateChatCompletionRequestArgs::default();
            args.model(self.options.model.clone()).messages(mapped);
            if let Some(max_tokens) = self.options.max_tokens {
                args.max_completion_tokens(max_tokens);
            }
            if let Some(temperature) = self.options.temperature {
                args.temperature(temperature);
            }
            let request = args.build()?;

            debug!(model = %self.options.model, messages = messages.len(), "sending chat request to OpenAI");
            let response = self.client.chat().create(request).await?;

            let generation = response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .ok_or_else(|| LLMError::InvalidResponse("completion has no content".to_string()))?;

            let tokens = response
                .usage
                .map(|usage| TokenUsage {
                    prompt_tokens: usage.prompt_tokens,
                    completion_tokens: usage.completion_tokens,
                    total_tokens: usage.total_tokens,
                })
                .unwrap_or_default();

            Ok(GenerateResult { tokens, generation })
        }
        .boxed()
    }
}

impl Embedder for OpenAI {
    fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, LLMResult<Vec<Vec<f32>>>> {
        async move {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            let request = CreateEmbeddingRequestArgs::default()
                .model(self.embedding_model.clone())
                .input(texts.to_vec())
                .build()?;
            let response = self.client.embeddings().create(request).await?;

            let mut data = response.data;
            if data.len() != texts.len() {
                return Err(LLMError::InvalidResponse(format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    data.len()
                )));
            }
            data.sort_by_key(|item| item.index);
            Ok(data.into_iter().map(|item| item.embedding).collect())
        }
        .boxed()
    }
}
