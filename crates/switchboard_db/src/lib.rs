//! Switchboard Database Layer
//!
//! SQLite-backed storage for the agent catalog, execution provenance, and
//! long-term memory.
//!
//! # Usage
//!
//! ```rust,ignore
//! use switchboard_db::SwitchboardDb;
//!
//! let db = SwitchboardDb::open("path/to/switchboard.db").await?;
//! ```

pub mod connection;
pub mod error;
pub mod models;
pub mod queries;

pub use connection::SwitchboardDb;
pub use error::{DbError, DbResult};

// Re-export key model types for convenience
pub use models::{
    AgentDefinition, AgentExecution, ChainStrategy, ExecutionStatus, LlmParams, MemoryEntry,
    MemoryType, SchemaCheck,
};
pub use queries::ExecutionOutcome;
