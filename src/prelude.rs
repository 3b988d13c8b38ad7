pub use crate::agent::{
    error::AgentError,
    parser::Action,
    traits::AgentRunner,
    transcript::{Step, Transcript},
    types::{Agent, AgentResult},
};
pub use crate::config::AppConfig;
pub use crate::error::{Error, Result};
pub use crate::llm::{
    ollama::Ollama,
    openai::OpenAI,
    traits::{Embedder, LLM},
};
pub use crate::message::Message;
pub use crate::prompt::ChatPrompt;
pub use crate::retrieval::{Document, InMemoryVectorStore, PineconeStore, TextSplitter, VectorStore};
pub use crate::search::{SearchProvider, TavilyClient};
pub use crate::setup::Runtime;
pub use crate::tools::{
    error::ToolError,
    registry::ToolRegistry,
    traits::Tool,
    VectorStoreSearch,
    WebSearch,
};
pub use crate::tool;
