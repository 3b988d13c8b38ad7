use super::types::AgentExecuteResult;

/// Trait describing runtime operations an agent can perform.
#[async_trait::async_trait]
pub trait AgentRunner: Send + Sync {
    /// Answer `input`, returning the final answer and the transcript that led to it.
    async fn run(&self, input: &str) -> AgentExecuteResult;
}
