use crate::llm::traits::LLM;
use crate::llm::tokens::TokenUsage;
use crate::prompt::ChatPrompt;
use crate::tools::registry::ToolRegistry;
use std::sync::Arc;
use std::time::Duration;
use super::error::AgentError;
use super::transcript::Transcript;
use serde::{Serialize, Deserialize};

pub const DEFAULT_MAX_ITERATIONS: usize = 15;
pub const DEFAULT_MAX_PARSE_RETRIES: usize = 3;

/// Single-step ReAct agent: one tool call per generator turn until a final answer.
pub struct Agent {
    /// A short, human-friendly name for the agent instance.
    pub name: String,

    /// The LLM that picks actions.
    pub llm: Arc<dyn LLM>,

    /// Registered tools the agent may call by name.
    pub tools: ToolRegistry,

    /// System and human templates.
    pub prompt: ChatPrompt,

    /// Value for `{current_date}`; fixed so runs are reproducible.
    pub current_date: String,

    /// Generator calls allowed per run.
    pub max_iterations: usize,

    /// Consecutive malformed replies tolerated before giving up.
    pub max_parse_retries: usize,

    /// Wall-clock limit for one run, checked at every network call.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct AgentResult {
    pub tokens: TokenUsage,
    pub output: String,
    pub transcript: Transcript,
}

pub type AgentExecuteResult = Result<AgentResult, AgentError>;
