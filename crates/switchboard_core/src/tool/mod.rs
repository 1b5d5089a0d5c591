//! Tool capability registry.
//!
//! Agent definitions name their tools; the registry resolves those names
//! against statically linked implementations at activation time. There is no
//! loading of code from stored strings; a name that doesn't resolve fails
//! the whole agent activation.

mod builtin;

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::model::ToolDescriptor;

pub use builtin::{CurrentTimeTool, WordCountTool};

/// A capability an agent can invoke during a turn.
#[async_trait]
pub trait AgentTool: Send + Sync {
    /// Unique tool name, as referenced by agent definitions.
    fn name(&self) -> &str;

    /// Human-readable description, surfaced to the model.
    fn description(&self) -> &str;

    /// JSON schema of the argument object.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute with already-validated arguments.
    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value>;
}

impl std::fmt::Debug for dyn AgentTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentTool").field("name", &self.name()).finish()
    }
}

/// Name-keyed set of tool implementations.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Arc<DashMap<String, Arc<dyn AgentTool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in tools.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry
            .register(Arc::new(CurrentTimeTool))
            .expect("empty registry cannot hold duplicates");
        registry
            .register(Arc::new(WordCountTool))
            .expect("empty registry cannot hold duplicates");
        registry
    }

    /// Register a tool implementation. Names are unique.
    pub fn register(&self, tool: Arc<dyn AgentTool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(CoreError::DuplicateTool { name });
        }
        debug!("Registered tool {}", name);
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Look up a single tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn AgentTool>> {
        self.tools.get(name).map(|entry| entry.value().clone())
    }

    /// All registered tool names.
    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Resolve a definition's declared tool names into bound implementations.
    ///
    /// Any missing name aborts the whole binding, no partial activation.
    pub fn bind(&self, agent: &str, names: &[String]) -> Result<Vec<Arc<dyn AgentTool>>> {
        let mut bound = Vec::with_capacity(names.len());
        for name in names {
            match self.get(name) {
                Some(tool) => bound.push(tool),
                None => {
                    return Err(CoreError::tool_load(agent, name.as_str(), self.available()));
                }
            }
        }
        Ok(bound)
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.available())
            .finish()
    }
}

/// Build the model-facing descriptors for a set of bound tools.
pub fn descriptors(tools: &[Arc<dyn AgentTool>]) -> Vec<ToolDescriptor> {
    tools
        .iter()
        .map(|tool| ToolDescriptor {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.parameters_schema(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_registration_rejected() {
        let registry = ToolRegistry::with_builtins();
        let err = registry.register(Arc::new(CurrentTimeTool)).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateTool { .. }));
    }

    #[test]
    fn bind_fails_whole_set_on_missing_tool() {
        let registry = ToolRegistry::with_builtins();
        let names = vec!["current_time".to_string(), "nonesuch".to_string()];
        let err = registry.bind("billing", &names).unwrap_err();
        match err {
            CoreError::ToolLoad { tool, available, .. } => {
                assert_eq!(tool, "nonesuch");
                assert!(available.contains(&"current_time".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn word_count_counts_words() {
        let registry = ToolRegistry::with_builtins();
        let tool = registry.get("word_count").unwrap();
        let result = tool
            .execute(serde_json::json!({"text": "one two three"}))
            .await
            .unwrap();
        assert_eq!(result["count"], 3);
    }
}
