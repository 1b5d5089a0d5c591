//! Long-term memory models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// A persisted memory entry.
///
/// Entries are immutable once written; consolidation creates new rows rather
/// than editing existing ones.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unique identifier
    pub id: String,

    /// Subsystem or agent the memory belongs to
    pub owner: String,

    /// Memory text
    pub content: String,

    /// Kind of memory
    pub memory_type: MemoryType,

    /// Free-form key/value annotations
    pub metadata: Json<serde_json::Value>,

    /// Importance score in [0.0, 1.0]
    pub importance: f64,

    /// When the memory was recorded
    pub created_at: DateTime<Utc>,
}

/// Kinds of memory entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// A conversational turn (incoming or outgoing)
    Conversation,
    /// A record of one agent invoking or observing another
    AgentInteraction,
    /// System-originated note
    System,
    /// Summary produced by short-term consolidation
    Consolidated,
}

impl MemoryType {
    /// Stable string form, matching the stored column value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conversation => "conversation",
            Self::AgentInteraction => "agent_interaction",
            Self::System => "system",
            Self::Consolidated => "consolidated",
        }
    }
}
