//! Built-in tools.

use async_trait::async_trait;
use chrono::Utc;
use schemars::{schema_for, JsonSchema};
use serde::Deserialize;
use serde_json::json;

use super::AgentTool;
use crate::error::{CoreError, Result};

/// Reports the current UTC time.
#[derive(Debug)]
pub struct CurrentTimeTool;

#[derive(Debug, Deserialize, JsonSchema)]
struct CurrentTimeArgs {
    /// strftime format string; RFC 3339 when omitted
    #[serde(default)]
    format: Option<String>,
}

#[async_trait]
impl AgentTool for CurrentTimeTool {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time in UTC"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::to_value(schema_for!(CurrentTimeArgs)).unwrap_or_default()
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value> {
        let args: CurrentTimeArgs = serde_json::from_value(arguments)
            .map_err(|e| CoreError::tool_execution_error(self.name(), e.to_string()))?;
        let now = Utc::now();
        let rendered = match args.format {
            Some(format) => now.format(&format).to_string(),
            None => now.to_rfc3339(),
        };
        Ok(json!({ "time": rendered }))
    }
}

/// Counts whitespace-separated words in a text.
#[derive(Debug)]
pub struct WordCountTool;

#[derive(Debug, Deserialize, JsonSchema)]
struct WordCountArgs {
    /// The text to count
    text: String,
}

#[async_trait]
impl AgentTool for WordCountTool {
    fn name(&self) -> &str {
        "word_count"
    }

    fn description(&self) -> &str {
        "Count the words in a piece of text"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::to_value(schema_for!(WordCountArgs)).unwrap_or_default()
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value> {
        let args: WordCountArgs = serde_json::from_value(arguments)
            .map_err(|e| CoreError::tool_execution_error(self.name(), e.to_string()))?;
        Ok(json!({ "count": args.text.split_whitespace().count() }))
    }
}
