//! Agent definition models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// An agent definition stored in the catalog.
///
/// Definitions are created by seeding or the administrative workflow and are
/// never deleted, only deactivated. Runtime agents hold a read-only snapshot.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Unique identifier
    pub id: String,

    /// Human-readable name (unique across the catalog)
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// System prompt / base instructions
    pub system_prompt: String,

    /// Structural contract for inbound payloads (drives handler resolution)
    pub input_schema: Option<Json<serde_json::Value>>,

    /// Structural contract for model output (drives fallback delegation)
    pub output_schema: Option<Json<serde_json::Value>>,

    /// Model provider: 'anthropic', 'ollama', etc.
    pub llm_provider: String,

    /// Model name: 'claude-sonnet-4', 'mistral', etc.
    pub llm_model: String,

    /// Sampling and transport parameters
    pub llm_params: Json<LlmParams>,

    /// Names of tools bound to this agent, resolved at activation
    pub tools: Json<Vec<String>>,

    /// Name of the agent to delegate to when output fails validation
    pub fallback_agent: Option<String>,

    /// Maximum delegation depth for chains starting at this agent
    pub max_chain_depth: i64,

    /// How delegation chains are walked
    pub chain_strategy: ChainStrategy,

    /// How output is checked against `output_schema`
    pub schema_check: SchemaCheck,

    /// Inactive definitions are invisible to resolution
    pub is_active: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Per-agent model call parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmParams {
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Nucleus sampling cutoff
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Hard deadline for a single model call, in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Whether the provider should stream tokens
    #[serde(default)]
    pub stream: bool,

    /// Context window hint, in tokens
    #[serde(default)]
    pub context_window: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    1.0
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for LlmParams {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_p: default_top_p(),
            timeout_seconds: default_timeout_seconds(),
            stream: false,
            context_window: None,
        }
    }
}

/// Delegation chain strategy.
///
/// Only sequential chains are implemented; the column exists so definitions
/// created by older tooling keep round-tripping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChainStrategy {
    /// One fallback hop at a time, depth-first
    Sequential,
}

impl Default for ChainStrategy {
    fn default() -> Self {
        Self::Sequential
    }
}

/// How an agent's output is checked against its output schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SchemaCheck {
    /// Deterministic structural validation
    Structural,
    /// Ask the model whether the output conforms (soft check)
    ModelAssisted,
}

impl Default for SchemaCheck {
    fn default() -> Self {
        Self::Structural
    }
}
