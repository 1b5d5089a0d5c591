//! Shared fixtures for integration tests.
#![allow(dead_code)] // each test binary uses a different subset

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use switchboard_core::prelude::*;
use switchboard_core::{
    new_definition, ChatRequest, ChatResponse, RegistryConfig, TokenUsage,
};

/// Provider that answers from per-agent scripts.
///
/// Scripts are keyed by a marker substring of the agent's system prompt;
/// responses pop in order, with the last one repeating. Every request is
/// recorded for assertions.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    scripts: Mutex<HashMap<String, Vec<String>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, marker: &str, responses: &[&str]) {
        self.scripts.lock().insert(
            marker.to_string(),
            responses.iter().map(|r| r.to_string()).collect(),
        );
    }

    /// Requests in call order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }

    pub fn calls_for(&self, marker: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|request| request.system_prompt.contains(marker))
            .count()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, request: ChatRequest) -> switchboard_core::Result<ChatResponse> {
        self.requests.lock().push(request.clone());

        let mut scripts = self.scripts.lock();
        for (marker, responses) in scripts.iter_mut() {
            if request.system_prompt.contains(marker.as_str()) {
                let text = if responses.len() > 1 {
                    responses.remove(0)
                } else {
                    responses[0].clone()
                };
                return Ok(ChatResponse {
                    text,
                    tool_call: None,
                    usage: TokenUsage {
                        prompt_tokens: 10,
                        completion_tokens: 5,
                    },
                });
            }
        }
        Ok(ChatResponse::text("unscripted response"))
    }
}

/// Provider that always fails with a transport error.
#[derive(Debug)]
pub struct DeadProvider;

#[async_trait]
impl ModelProvider for DeadProvider {
    fn name(&self) -> &str {
        "dead"
    }

    async fn chat(&self, _request: ChatRequest) -> switchboard_core::Result<ChatResponse> {
        Err(CoreError::ModelTransport {
            provider: "dead".to_string(),
            model: "none".to_string(),
            details: "connection refused".to_string(),
        })
    }
}

/// Fresh in-memory registry wired to the given provider.
pub async fn registry_with(provider: Arc<dyn ModelProvider>) -> (SwitchboardDb, Arc<AgentRegistry>) {
    let db = SwitchboardDb::open_in_memory().await.unwrap();
    let registry = Arc::new(AgentRegistry::new(
        db.clone(),
        provider,
        ToolRegistry::with_builtins(),
    ));
    (db, registry)
}

/// A definition whose system prompt carries a script marker and whose output
/// must be a `{"response": string}` object.
pub fn strict_definition(marker: &str, name: &str) -> AgentDefinition {
    let mut definition = new_definition(
        &RegistryConfig::default(),
        name,
        &format!("[{marker}] You are the {name} agent."),
    );
    definition.output_schema = Some(sqlx::types::Json(json!({
        "type": "object",
        "required": ["response"],
        "properties": { "response": { "type": "string" } }
    })));
    definition
}

/// A definition that accepts any output.
pub fn lenient_definition(marker: &str, name: &str) -> AgentDefinition {
    new_definition(
        &RegistryConfig::default(),
        name,
        &format!("[{marker}] You are the {name} agent."),
    )
}
