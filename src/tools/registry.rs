//! Tool registry: registration, lookup by name and execution.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::music::{CheckMediaFileTool, GenerateCustomSongTool, GeneratePromptSongTool};
use super::spec::{ToolContext, ToolError, ToolResult, ToolSpec};

/// Registry that holds all available tools.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolSpec>>,
    context: ToolContext,
}

impl ToolRegistry {
    #[must_use]
    pub fn new(context: ToolContext) -> Self {
        Self {
            tools: HashMap::new(),
            context,
        }
    }

    /// Registry preloaded with the song generation tools.
    #[must_use]
    pub fn with_music_tools(context: ToolContext) -> Self {
        let mut registry = Self::new(context);
        registry.register(Arc::new(GeneratePromptSongTool));
        registry.register(Arc::new(GenerateCustomSongTool));
        registry.register(Arc::new(CheckMediaFileTool));
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn ToolSpec>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!("Overwriting existing tool: {}", name);
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolSpec>> {
        self.tools.get(name).cloned()
    }

    /// Registered tool names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Execute a tool by name, returning the full `ToolResult`.
    pub async fn execute(&self, name: &str, input: Value) -> Result<ToolResult, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::not_available(format!("tool '{name}' is not registered")))?;

        tracing::debug!(tool = name, "executing tool");
        tool.execute(input, &self.context).await
    }
}
