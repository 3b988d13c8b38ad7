use std::sync::Arc;
use tracing::info;

use super::error::ToolError;
use super::schema::ToolSchema;
use super::traits::Tool;

/// Ordered set of tools the agent may call.
///
/// Insertion order is the order tools are listed in the prompt.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A tool with the same name is replaced in place, keeping its position.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> &mut Self {
        info!("Registering tool: {}", tool.name());
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(idx) => self.tools[idx] = tool,
            None => self.tools.push(tool),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name() == name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools
            .iter()
            .map(|t| ToolSchema {
                name: t.name().to_string(),
                description: t.description().to_string(),
                args: t.args(),
            })
            .collect()
    }

    /// Text for the `{tools}` placeholder.
    pub fn render(&self) -> String {
        self.schemas()
            .iter()
            .map(ToolSchema::render)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Text for the `{tool_names}` placeholder.
    pub fn render_names(&self) -> String {
        self.names().join(", ")
    }

    pub async fn dispatch(&self, name: &str, input: &str) -> Result<String, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        tool.run(input).await
    }
}
