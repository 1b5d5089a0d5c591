//! Agents: definitions, runtime instances, and the registry.
//!
//! An [`AgentDefinition`] lives in the catalog; the [`AgentRegistry`] turns
//! it into a cached [`DynamicAgent`] on first resolution. A `DynamicAgent`
//! performs one model turn per request and, when its output fails schema
//! validation, delegates down its configured fallback chain with a strict
//! depth budget, writing an execution provenance row for every attempt.

mod dynamic;
mod registry;

pub use dynamic::{AgentReply, DynamicAgent};
pub use registry::AgentRegistry;

use chrono::Utc;
use sqlx::types::Json;

use crate::config::RegistryConfig;
use crate::id::{ConversationId, ExecutionId};
use crate::model::ChatMessage;
use switchboard_db::{AgentDefinition, SchemaCheck};

/// One request routed to an agent.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    /// Conversation this request belongs to
    pub conversation_id: ConversationId,
    /// Inbound payload: `{"message": ..., "user": ..., "platform": ...}`
    pub payload: serde_json::Value,
    /// Prior turns replayed into the prompt
    pub history: Vec<ChatMessage>,
    /// Formatted memory context block, if any
    pub context: Option<String>,
    /// 0 for the initial attempt, incremented per fallback hop
    pub chain_depth: i64,
    /// Execution that delegated this request, if any
    pub parent_execution_id: Option<ExecutionId>,
}

impl AgentRequest {
    pub fn new(conversation_id: ConversationId, payload: serde_json::Value) -> Self {
        Self {
            conversation_id,
            payload,
            history: Vec::new(),
            context: None,
            chain_depth: 0,
            parent_execution_id: None,
        }
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// The message text inside the payload.
    pub fn message(&self) -> &str {
        self.payload
            .get("message")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
    }

    /// Derive the request for one fallback hop deeper.
    pub fn fallback_hop(&self, parent: ExecutionId) -> Self {
        Self {
            conversation_id: self.conversation_id.clone(),
            payload: self.payload.clone(),
            history: self.history.clone(),
            context: self.context.clone(),
            chain_depth: self.chain_depth + 1,
            parent_execution_id: Some(parent),
        }
    }
}

/// Build a definition carrying the configured defaults.
///
/// Callers set description, schemas, tools, and fallback on the returned
/// value before registering it.
pub fn new_definition(config: &RegistryConfig, name: &str, system_prompt: &str) -> AgentDefinition {
    let now = Utc::now();
    AgentDefinition {
        id: crate::id::AgentId::generate().into_inner(),
        name: name.to_string(),
        description: None,
        system_prompt: system_prompt.to_string(),
        input_schema: None,
        output_schema: None,
        llm_provider: config.llm_provider.clone(),
        llm_model: config.llm_model.clone(),
        llm_params: Json(config.default_llm_params()),
        tools: Json(Vec::new()),
        fallback_agent: None,
        max_chain_depth: config.max_chain_depth,
        chain_strategy: config.chain_strategy,
        schema_check: SchemaCheck::Structural,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_hop_increments_depth_and_links_parent() {
        let request = AgentRequest::new(
            ConversationId::for_user("cli", "u1"),
            serde_json::json!({"message": "hi"}),
        );
        let parent = ExecutionId::generate();
        let hop = request.fallback_hop(parent.clone());
        assert_eq!(hop.chain_depth, 1);
        assert_eq!(hop.parent_execution_id, Some(parent));
        assert_eq!(hop.message(), "hi");
    }

    #[test]
    fn new_definition_carries_config_defaults() {
        let config = RegistryConfig::default();
        let def = new_definition(&config, "assistant", "You are helpful.");
        assert_eq!(def.max_chain_depth, 3);
        assert_eq!(def.llm_params.0.timeout_seconds, 30);
        assert!(def.is_active);
    }
}
