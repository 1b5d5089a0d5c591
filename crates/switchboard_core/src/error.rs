use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration-specific errors
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for field {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Error, Diagnostic, Debug)]
pub enum CoreError {
    #[error("Agent already registered: {name}")]
    #[diagnostic(
        code(switchboard_core::duplicate_agent),
        help("Agent names are unique; deactivate or pick another name")
    )]
    DuplicateAgent { name: String },

    #[error("Agent not found: {identifier}")]
    #[diagnostic(
        code(switchboard_core::agent_not_found),
        help("Known agents: {}", available.join(", "))
    )]
    AgentNotFound {
        identifier: String,
        available: Vec<String>,
    },

    #[error("Delegation depth {chain_depth} reached the limit {max_chain_depth} for agent {agent}")]
    #[diagnostic(
        code(switchboard_core::chain_depth_exceeded),
        help("Raise max_chain_depth on the definition or shorten the fallback chain")
    )]
    ChainDepthExceeded {
        agent: String,
        chain_depth: i64,
        max_chain_depth: i64,
    },

    #[error("No valid output from agent {agent} after exhausting the fallback chain")]
    #[diagnostic(
        code(switchboard_core::validation_exhausted),
        help("Last validation errors: {}", validation_errors.join("; "))
    )]
    ValidationExhausted {
        agent: String,
        validation_errors: Vec<String>,
    },

    #[error("Tool {tool} could not be bound for agent {agent}")]
    #[diagnostic(
        code(switchboard_core::tool_load),
        help("Available tools: {}", available.join(", "))
    )]
    ToolLoad {
        agent: String,
        tool: String,
        available: Vec<String>,
    },

    #[error("Tool already registered: {name}")]
    #[diagnostic(code(switchboard_core::duplicate_tool))]
    DuplicateTool { name: String },

    #[error("Tool {tool_name} failed: {cause}")]
    #[diagnostic(
        code(switchboard_core::tool_execution_failed),
        help("Check tool parameters and ensure they match the expected schema")
    )]
    ToolExecutionFailed {
        tool_name: String,
        cause: String,
        parameters: serde_json::Value,
    },

    #[error("Model transport error: {provider}/{model}: {details}")]
    #[diagnostic(
        code(switchboard_core::model_transport),
        help("Network failure or timeout talking to {provider}; the request never completed")
    )]
    ModelTransport {
        provider: String,
        model: String,
        details: String,
    },

    #[error("Model error: {provider}/{model}: {details}")]
    #[diagnostic(
        code(switchboard_core::model_rejected),
        help("The provider answered but reported an error; check the request parameters")
    )]
    ModelRejected {
        provider: String,
        model: String,
        details: String,
    },

    #[error("Invalid trigger transition for event {event_id}: {from} -> {to}")]
    #[diagnostic(
        code(switchboard_core::trigger_transition),
        help("Trigger status only moves forward: pending -> processing -> completed|failed")
    )]
    TriggerTransition {
        event_id: String,
        from: String,
        to: String,
    },

    #[error("No active workflow for user {user_id}")]
    #[diagnostic(
        code(switchboard_core::no_active_workflow),
        help("Start a workflow with begin() before advancing it")
    )]
    NoActiveWorkflow { user_id: String },

    #[error("Serialization error for {data_type}")]
    #[diagnostic(code(switchboard_core::serialization_error))]
    SerializationError {
        data_type: String,
        #[source]
        cause: serde_json::Error,
    },

    #[error("Configuration error for field '{field}'")]
    #[diagnostic(
        code(switchboard_core::configuration_error),
        help("Check configuration file at {config_path}")
    )]
    ConfigurationError {
        config_path: String,
        field: String,
        #[source]
        cause: ConfigError,
    },

    #[error("Database error: {0}")]
    #[diagnostic(code(switchboard_core::database_error))]
    Database(#[from] switchboard_db::DbError),
}

pub type Result<T> = std::result::Result<T, CoreError>;

// Helper functions for creating common errors with context
impl CoreError {
    pub fn agent_not_found(identifier: impl Into<String>, available: Vec<String>) -> Self {
        Self::AgentNotFound {
            identifier: identifier.into(),
            available,
        }
    }

    pub fn tool_load(
        agent: impl Into<String>,
        tool: impl Into<String>,
        available: Vec<String>,
    ) -> Self {
        Self::ToolLoad {
            agent: agent.into(),
            tool: tool.into(),
            available,
        }
    }

    pub fn model_transport(
        provider: impl Into<String>,
        model: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self::ModelTransport {
            provider: provider.into(),
            model: model.into(),
            details: details.into(),
        }
    }

    pub fn model_rejected(
        provider: impl Into<String>,
        model: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self::ModelRejected {
            provider: provider.into(),
            model: model.into(),
            details: details.into(),
        }
    }

    pub fn tool_execution_error(tool_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self::ToolExecutionFailed {
            tool_name: tool_name.into(),
            cause: error.into(),
            parameters: serde_json::Value::Null,
        }
    }

    /// Short machine-readable tag for execution metadata.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::DuplicateAgent { .. } => "duplicate_agent",
            Self::AgentNotFound { .. } => "agent_not_found",
            Self::ChainDepthExceeded { .. } => "chain_depth_exceeded",
            Self::ValidationExhausted { .. } => "validation_exhausted",
            Self::ToolLoad { .. } => "tool_load",
            Self::DuplicateTool { .. } => "duplicate_tool",
            Self::ToolExecutionFailed { .. } => "tool_execution_failed",
            Self::ModelTransport { .. } => "model_transport",
            Self::ModelRejected { .. } => "model_rejected",
            Self::TriggerTransition { .. } => "trigger_transition",
            Self::NoActiveWorkflow { .. } => "no_active_workflow",
            Self::SerializationError { .. } => "serialization_error",
            Self::ConfigurationError { .. } => "configuration_error",
            Self::Database(_) => "database_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miette::Report;

    #[test]
    fn agent_not_found_lists_known_names() {
        let error = CoreError::agent_not_found(
            "nonesuch",
            vec!["billing".to_string(), "support".to_string()],
        );
        let report = Report::new(error);
        let output = format!("{:?}", report);
        assert!(output.contains("Known agents: billing, support"));
    }

    #[test]
    fn error_type_tags_are_stable() {
        let err = CoreError::model_transport("ollama", "mistral", "connection refused");
        assert_eq!(err.error_type(), "model_transport");
    }
}
