//! Typed row models for the switchboard database.

mod agent;
mod execution;
mod memory;

pub use agent::{AgentDefinition, ChainStrategy, LlmParams, SchemaCheck};
pub use execution::{AgentExecution, ExecutionStatus};
pub use memory::{MemoryEntry, MemoryType};
