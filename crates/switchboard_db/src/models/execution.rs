//! Execution provenance models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// One delegation attempt.
///
/// `parent_execution_id` links fallback hops into a tree rooted at the
/// initial attempt. A row is created `in_progress` before the model call and
/// finalized to a terminal status exactly once, never mutated afterward.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AgentExecution {
    /// Unique identifier
    pub id: String,

    /// Agent that performed this attempt
    pub agent_id: String,

    /// Conversation the attempt belongs to
    pub conversation_id: String,

    /// Input payload as given to the agent
    pub input_data: Json<serde_json::Value>,

    /// Parsed output, present on success
    pub output_data: Option<Json<serde_json::Value>>,

    /// 0 for the initial attempt, incremented per fallback hop
    pub chain_depth: i64,

    /// Execution that delegated to this one, if any
    pub parent_execution_id: Option<String>,

    /// Lifecycle status
    pub status: ExecutionStatus,

    /// Error detail, present on failure
    pub error_message: Option<String>,

    /// Additional execution detail (error_type, error_details, fallback info)
    pub metadata: Option<Json<serde_json::Value>>,

    /// Wall-clock duration of the attempt
    pub duration_ms: Option<i64>,

    /// Tokens consumed by the prompt
    pub prompt_tokens: Option<i64>,

    /// Tokens produced by the model
    pub completion_tokens: Option<i64>,

    /// When the attempt started
    pub created_at: DateTime<Utc>,

    /// When the attempt reached a terminal status
    pub completed_at: Option<DateTime<Utc>>,
}

/// Execution lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Attempt is running
    InProgress,
    /// A usable result was produced (directly or via fallback)
    Success,
    /// No usable result
    Failure,
}

impl ExecutionStatus {
    /// Whether this status ends the row's lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }
}
