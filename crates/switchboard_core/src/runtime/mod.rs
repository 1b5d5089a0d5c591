//! Top-level message routing.
//!
//! The [`Switchboard`] is what front-ends call: it resolves an explicit
//! `@name` address or scans registered agents for a handler, injects memory
//! context, delegates, and records both sides of the exchange back into
//! memory. Transports themselves (Telegram, Discord, HTTP) live outside this
//! crate and are pure callers of [`Switchboard::handle`].

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::agent::{AgentRegistry, AgentRequest};
use crate::config::RouterConfig;
use crate::error::Result;
use crate::id::ConversationId;
use crate::memory::MemoryStore;
use crate::model::ChatMessage;
use switchboard_db::{MemoryEntry, MemoryType};

/// Who sent the inbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    /// Platform-scoped user identifier
    pub id: String,
    /// Display name, if the platform provides one
    #[serde(default)]
    pub name: Option<String>,
}

impl UserInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

/// The top-level router.
pub struct Switchboard {
    registry: Arc<AgentRegistry>,
    memory: Arc<MemoryStore>,
    history: DashMap<String, Vec<ChatMessage>>,
    config: RouterConfig,
}

impl Switchboard {
    pub fn new(registry: Arc<AgentRegistry>, memory: Arc<MemoryStore>, config: RouterConfig) -> Self {
        Self {
            registry,
            memory,
            history: DashMap::new(),
            config,
        }
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.memory
    }

    /// Route one inbound message and produce a response.
    ///
    /// `@name rest` addresses an agent directly; otherwise the first agent
    /// whose input schema claims the payload handles it, and the configured
    /// default agent covers everything else.
    pub async fn handle(&self, message: &str, user: &UserInfo, platform: &str) -> Result<String> {
        let conversation = ConversationId::for_user(platform, &user.id);
        let history = self.history_for(&conversation);

        let reply = if let Some((name, remainder)) = parse_explicit_address(message) {
            info!(agent = %name, conversation = %conversation, "explicit agent address");
            let agent = self.registry.resolve(name).await?;
            let request = AgentRequest::new(
                conversation.clone(),
                self.payload(remainder, user, platform),
            )
            .with_history(history);
            agent.process(&self.registry, request).await?
        } else {
            let relevant = self
                .memory
                .get_relevant(message, self.config.context_limit)
                .await;
            let context = format_memory_context(&relevant);
            let payload = self.payload(message, user, platform);

            let agent = match self.registry.resolve_handler(&payload).await? {
                Some(agent) => {
                    debug!(agent = %agent.name(), "handler scan matched");
                    agent
                }
                None => {
                    debug!(agent = %self.config.default_agent, "falling back to default agent");
                    self.registry.resolve(&self.config.default_agent).await?
                }
            };

            let mut request = AgentRequest::new(conversation.clone(), payload).with_history(history);
            if !context.is_empty() {
                request = request.with_context(context);
            }
            agent.process(&self.registry, request).await?
        };

        self.push_history(&conversation, message, &reply.text);
        self.record_exchange(&conversation, platform, user, message, &reply.text, &reply.agent)
            .await;

        Ok(reply.text)
    }

    fn payload(&self, message: &str, user: &UserInfo, platform: &str) -> serde_json::Value {
        json!({
            "message": message,
            "user": user,
            "platform": platform,
        })
    }

    fn history_for(&self, conversation: &ConversationId) -> Vec<ChatMessage> {
        self.history
            .get(conversation.as_str())
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    fn push_history(&self, conversation: &ConversationId, message: &str, response: &str) {
        let mut turns = self
            .history
            .entry(conversation.as_str().to_string())
            .or_default();
        turns.push(ChatMessage::user(message));
        turns.push(ChatMessage::assistant(response));
        let excess = turns.len().saturating_sub(self.config.history_limit);
        if excess > 0 {
            turns.drain(..excess);
        }
    }

    /// Record both sides of the exchange. Best-effort: memory loss never
    /// fails the request that produced the response.
    async fn record_exchange(
        &self,
        conversation: &ConversationId,
        platform: &str,
        user: &UserInfo,
        message: &str,
        response: &str,
        agent: &str,
    ) {
        let incoming = self
            .memory
            .add_memory(
                message,
                MemoryType::Conversation,
                json!({
                    "platform": platform,
                    "conversation_id": conversation.as_str(),
                    "user_id": user.id,
                    "direction": "incoming",
                }),
                0.0,
            )
            .await;
        let outgoing = self
            .memory
            .add_memory(
                response,
                MemoryType::Conversation,
                json!({
                    "platform": platform,
                    "conversation_id": conversation.as_str(),
                    "agent": agent,
                    "direction": "outgoing",
                }),
                0.0,
            )
            .await;
        if !incoming || !outgoing {
            warn!(conversation = %conversation, "failed to record conversation memory");
        }
    }
}

impl std::fmt::Debug for Switchboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Switchboard")
            .field("default_agent", &self.config.default_agent)
            .field("conversations", &self.history.len())
            .finish()
    }
}

/// Parse an explicit `@name rest` address.
///
/// Returns the agent name and the remainder with the marker and the single
/// separating space stripped.
fn parse_explicit_address(message: &str) -> Option<(&str, &str)> {
    let rest = message.strip_prefix('@')?;
    if rest.is_empty() {
        return None;
    }
    match rest.split_once(' ') {
        Some((name, remainder)) if !name.is_empty() => Some((name, remainder)),
        Some(_) => None,
        None => Some((rest, "")),
    }
}

/// Format relevant memories as a context block for the prompt.
fn format_memory_context(entries: &[MemoryEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }
    let mut block = String::from("Relevant context from memory:");
    for entry in entries {
        block.push_str("\n- ");
        block.push_str(entry.content.trim());
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::types::Json;

    #[test]
    fn explicit_address_strips_marker_and_space() {
        let (name, rest) = parse_explicit_address("@billing what is my balance").unwrap();
        assert_eq!(name, "billing");
        assert_eq!(rest, "what is my balance");
    }

    #[test]
    fn bare_name_address_has_empty_remainder() {
        let (name, rest) = parse_explicit_address("@billing").unwrap();
        assert_eq!(name, "billing");
        assert_eq!(rest, "");
    }

    #[test]
    fn non_addresses_are_not_parsed() {
        assert!(parse_explicit_address("hello there").is_none());
        assert!(parse_explicit_address("@").is_none());
        assert!(parse_explicit_address("@ leading space").is_none());
    }

    #[test]
    fn context_block_lists_entries() {
        let entry = MemoryEntry {
            id: "m1".to_string(),
            owner: "orchestrator".to_string(),
            content: "user prefers metric units".to_string(),
            memory_type: MemoryType::Conversation,
            metadata: Json(json!({})),
            importance: 0.5,
            created_at: Utc::now(),
        };
        let block = format_memory_context(&[entry]);
        assert!(block.starts_with("Relevant context from memory:"));
        assert!(block.contains("- user prefers metric units"));
        assert_eq!(format_memory_context(&[]), "");
    }
}
