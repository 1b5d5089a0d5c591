//! Configuration for the switchboard runtime.
//!
//! Everything is optional in the TOML file; serde defaults mirror the
//! documented defaults so an empty file is a valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, CoreError, Result};
use switchboard_db::{ChainStrategy, LlmParams};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub database: DatabaseConfig,
    pub registry: RegistryConfig,
    pub memory: MemoryConfig,
    pub trigger: TriggerConfig,
    pub router: RouterConfig,
}

impl CoreConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| CoreError::ConfigurationError {
            config_path: path.display().to_string(),
            field: "<file>".to_string(),
            cause: ConfigError::Io(e.to_string()),
        })?;
        toml::from_str(&raw).map_err(|e| CoreError::ConfigurationError {
            config_path: path.display().to_string(),
            field: "<toml>".to_string(),
            cause: ConfigError::TomlParse(e.to_string()),
        })
    }
}

/// Database location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("switchboard.db"),
        }
    }
}

/// Defaults applied to new agent definitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Default delegation depth budget for new definitions
    pub max_chain_depth: i64,
    /// Delegation strategy (only "sequential" is implemented)
    pub chain_strategy: ChainStrategy,
    /// Default model provider for new definitions
    pub llm_provider: String,
    /// Default model name for new definitions
    pub llm_model: String,
    /// Default per-call deadline, in seconds
    pub timeout_seconds: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_chain_depth: 3,
            chain_strategy: ChainStrategy::Sequential,
            llm_provider: "ollama".to_string(),
            llm_model: "mistral".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl RegistryConfig {
    /// Model parameters carrying this config's deadline.
    pub fn default_llm_params(&self) -> LlmParams {
        LlmParams {
            timeout_seconds: self.timeout_seconds,
            ..LlmParams::default()
        }
    }
}

/// Memory tiering parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Short-term buffer size that triggers consolidation when exceeded
    pub short_term_cap: usize,
    /// How many recent entries fold into one consolidated summary
    pub consolidate_window: usize,
    /// Buffer size kept after consolidation
    pub short_term_keep: usize,
    /// Importance above which an entry is persisted long-term
    pub long_term_threshold: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            short_term_cap: 10,
            consolidate_window: 5,
            short_term_keep: 5,
            long_term_threshold: 0.3,
        }
    }
}

/// Trigger pipeline parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Ceiling on concurrently processing events
    pub max_concurrent_dispatch: usize,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_dispatch: 32,
        }
    }
}

/// Message routing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Agent handling messages no other agent claims
    pub default_agent: String,
    /// How many relevant memories are injected as context
    pub context_limit: usize,
    /// How many conversation turns are replayed per request
    pub history_limit: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_agent: "assistant".to_string(),
            context_limit: 5,
            history_limit: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_toml_yields_defaults() {
        let config: CoreConfig = toml::from_str("").unwrap();
        assert_eq!(config.registry.max_chain_depth, 3);
        assert_eq!(config.registry.timeout_seconds, 30);
        assert_eq!(config.memory.short_term_cap, 10);
        assert_eq!(config.router.default_agent, "assistant");
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config: CoreConfig = toml::from_str(
            r#"
            [registry]
            max_chain_depth = 5
            llm_model = "llama3"

            [trigger]
            max_concurrent_dispatch = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.registry.max_chain_depth, 5);
        assert_eq!(config.registry.llm_model, "llama3");
        assert_eq!(config.registry.llm_provider, "ollama");
        assert_eq!(config.trigger.max_concurrent_dispatch, 4);
    }

    #[test]
    fn load_reports_parse_errors_with_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "registry = 3").unwrap();
        let err = CoreConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, CoreError::ConfigurationError { .. }));
    }
}
