use super::error::ToolError;

// re-export ArgSchema for macros use
pub use super::schema::ArgSchema;

/// A named capability the agent can invoke with a single string input.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn args(&self) -> Vec<ArgSchema>;
    async fn run(&self, input: &str) -> Result<String, ToolError>;
}
