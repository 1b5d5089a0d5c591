//! First-run seeding of the agent catalog.

use tracing::info;

use crate::agent::{new_definition, AgentRegistry};
use crate::config::RegistryConfig;
use crate::error::Result;

const DEFAULT_ASSISTANT_PROMPT: &str = "You are a helpful assistant. Answer clearly and \
concisely, and use your available tools when they help.";

/// Register the default assistant if the catalog is empty.
///
/// The default agent is the router's catch-all; seeding it keeps a fresh
/// deployment able to answer before any specialist agents exist.
pub async fn seed_default_agents(registry: &AgentRegistry, config: &RegistryConfig) -> Result<()> {
    if !registry.list().await?.is_empty() {
        return Ok(());
    }

    let mut definition = new_definition(config, "assistant", DEFAULT_ASSISTANT_PROMPT);
    definition.description =
        Some("General-purpose assistant that handles anything no specialist claims".to_string());
    registry.register(definition).await?;
    info!("seeded default assistant agent");
    Ok(())
}
