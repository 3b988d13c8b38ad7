
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    UnknownTool(String),
    
    /// The collaborator behind a tool failed (network, auth, quota, bad response).
    #[error("Tool execution error in '{name}': {reason}")]
    ExecutionError {
        name: String,
        reason: String,
    },
}

impl ToolError {
    pub fn execution(name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ExecutionError {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}
