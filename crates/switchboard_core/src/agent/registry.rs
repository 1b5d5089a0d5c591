//! Agent definition registry with cached runtime instantiation.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use sqlx::types::Json;
use tracing::{debug, info};

use crate::agent::DynamicAgent;
use crate::error::{CoreError, Result};
use crate::model::ModelProvider;
use crate::schema::StructuralSchema;
use crate::tool::ToolRegistry;
use switchboard_db::queries::agent as agent_queries;
use switchboard_db::{AgentDefinition, DbError, SwitchboardDb};

/// Catalog of agent definitions plus a name-keyed cache of runtime instances.
///
/// Instances are created lazily on first resolution and reused across calls;
/// only [`clear_cache`](Self::clear_cache) invalidates them.
pub struct AgentRegistry {
    db: SwitchboardDb,
    provider: Arc<dyn ModelProvider>,
    tools: ToolRegistry,
    cache: DashMap<String, Arc<DynamicAgent>>,
}

impl AgentRegistry {
    pub fn new(db: SwitchboardDb, provider: Arc<dyn ModelProvider>, tools: ToolRegistry) -> Self {
        Self {
            db,
            provider,
            tools,
            cache: DashMap::new(),
        }
    }

    pub fn db(&self) -> &SwitchboardDb {
        &self.db
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Register a new definition and activate it.
    ///
    /// Tool binding happens before anything is persisted, so a missing tool
    /// aborts the whole activation with nothing written and nothing cached.
    pub async fn register(&self, definition: AgentDefinition) -> Result<Arc<DynamicAgent>> {
        let name = definition.name.clone();
        if self.cache.contains_key(&name) {
            return Err(CoreError::DuplicateAgent { name });
        }

        let agent = Arc::new(self.instantiate(definition.clone())?);

        match agent_queries::create_agent(self.db.pool(), &definition).await {
            Ok(()) => {}
            Err(DbError::AlreadyExists { .. }) => {
                return Err(CoreError::DuplicateAgent { name });
            }
            Err(err) => return Err(err.into()),
        }

        info!(agent = %name, "registered agent definition");
        self.cache.insert(name, agent.clone());
        Ok(agent)
    }

    /// Resolve an agent by name: cache first, then the catalog.
    pub async fn resolve(&self, name: &str) -> Result<Arc<DynamicAgent>> {
        if let Some(agent) = self.cache.get(name) {
            return Ok(agent.value().clone());
        }

        let Some(definition) =
            agent_queries::get_active_agent_by_name(self.db.pool(), name).await?
        else {
            return Err(CoreError::agent_not_found(name, self.known_names().await?));
        };

        let agent = Arc::new(self.instantiate(definition)?);
        // Under a race, keep whichever instance landed first so resolution
        // stays identity-stable.
        let agent = self
            .cache
            .entry(name.to_string())
            .or_insert(agent)
            .value()
            .clone();
        debug!(agent = %name, "instantiated runtime agent");
        Ok(agent)
    }

    /// First-match handler scan over active definitions in listing order.
    ///
    /// Definitions are checked by input schema without instantiating them;
    /// only the winner is resolved into a runtime agent.
    pub async fn resolve_handler(&self, payload: &Value) -> Result<Option<Arc<DynamicAgent>>> {
        for definition in agent_queries::list_active_agents(self.db.pool()).await? {
            let claims = definition
                .input_schema
                .as_ref()
                .map(|Json(schema)| StructuralSchema::new(schema.clone()).matches(payload))
                .unwrap_or(false);
            if claims {
                debug!(agent = %definition.name, "definition claims inbound payload");
                return self.resolve(&definition.name).await.map(Some);
            }
        }
        Ok(None)
    }

    /// Active definitions in listing order.
    pub async fn list(&self) -> Result<Vec<AgentDefinition>> {
        Ok(agent_queries::list_active_agents(self.db.pool()).await?)
    }

    /// Whether a name is already used, active or not.
    pub async fn name_taken(&self, name: &str) -> Result<bool> {
        if self.cache.contains_key(name) {
            return Ok(true);
        }
        Ok(agent_queries::get_agent_by_name(self.db.pool(), name)
            .await?
            .is_some())
    }

    /// Deactivate a definition and evict its cached instance.
    pub async fn deactivate(&self, name: &str) -> Result<()> {
        agent_queries::set_agent_active(self.db.pool(), name, false).await?;
        self.cache.remove(name);
        info!(agent = %name, "deactivated agent definition");
        Ok(())
    }

    /// Drop all cached runtime instances.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn instantiate(&self, definition: AgentDefinition) -> Result<DynamicAgent> {
        let bound = self.tools.bind(&definition.name, &definition.tools.0)?;
        Ok(DynamicAgent::new(
            definition,
            self.provider.clone(),
            bound,
            self.db.clone(),
        ))
    }

    async fn known_names(&self) -> Result<Vec<String>> {
        Ok(agent_queries::list_active_agents(self.db.pool())
            .await?
            .into_iter()
            .map(|definition| definition.name)
            .collect())
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("cached", &self.cache.len())
            .field("tools", &self.tools)
            .finish()
    }
}
