//! Switchboard Core - Agent Delegation and Memory Engine
//!
//! This crate routes user requests to LLM-backed agents with bounded
//! fallback delegation and execution provenance, keeps a tiered memory of
//! past exchanges, and tracks inbound platform events through an
//! asynchronous trigger pipeline.
//!
//! Model inference, vector search, and message transports are external
//! collaborators behind traits; persistence lives in `switchboard-db`.

pub mod agent;
pub mod config;
pub mod error;
pub mod id;
pub mod memory;
pub mod model;
pub mod runtime;
pub mod schema;
pub mod seed;
pub mod tool;
pub mod trigger;
pub mod workflow;

pub use agent::{new_definition, AgentRegistry, AgentReply, AgentRequest, DynamicAgent};
pub use config::{
    CoreConfig, DatabaseConfig, MemoryConfig, RegistryConfig, RouterConfig, TriggerConfig,
};
pub use error::{ConfigError, CoreError, Result};
pub use id::{AgentId, ConversationId, EventId, ExecutionId, MemoryId};
pub use memory::MemoryStore;
pub use model::{
    ChatMessage, ChatRequest, ChatResponse, ChatRole, ModelOptions, ModelProvider, TokenUsage,
    ToolCall, ToolDescriptor,
};
pub use runtime::{Switchboard, UserInfo};
pub use schema::StructuralSchema;
pub use seed::seed_default_agents;
pub use tool::{AgentTool, ToolRegistry};
pub use trigger::{TriggerEvent, TriggerHandler, TriggerMonitor, TriggerStatus, TriggerStore};
pub use workflow::{AgentBuilder, WorkflowReply, WorkflowStep};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        AgentRegistry, AgentReply, AgentRequest, ChatMessage, ConversationId, CoreConfig,
        CoreError, DynamicAgent, MemoryStore, ModelProvider, Result, Switchboard, ToolRegistry,
        TriggerEvent, TriggerMonitor, UserInfo,
    };
    pub use switchboard_db::{AgentDefinition, MemoryType, SwitchboardDb};
}
