//! Agent catalog queries.

use sqlx::SqlitePool;

use crate::error::{DbError, DbResult};
use crate::models::AgentDefinition;

/// Get an agent definition by ID.
pub async fn get_agent(pool: &SqlitePool, id: &str) -> DbResult<Option<AgentDefinition>> {
    let agent = sqlx::query_as::<_, AgentDefinition>("SELECT * FROM agents WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(agent)
}

/// Get an agent definition by name, regardless of active flag.
pub async fn get_agent_by_name(pool: &SqlitePool, name: &str) -> DbResult<Option<AgentDefinition>> {
    let agent = sqlx::query_as::<_, AgentDefinition>("SELECT * FROM agents WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(agent)
}

/// Get an active agent definition by name.
pub async fn get_active_agent_by_name(
    pool: &SqlitePool,
    name: &str,
) -> DbResult<Option<AgentDefinition>> {
    let agent =
        sqlx::query_as::<_, AgentDefinition>("SELECT * FROM agents WHERE name = ? AND is_active = 1")
            .bind(name)
            .fetch_optional(pool)
            .await?;
    Ok(agent)
}

/// List active agent definitions in registration order.
///
/// Handler resolution iterates this list first-match, so the ordering here
/// is load-bearing.
pub async fn list_active_agents(pool: &SqlitePool) -> DbResult<Vec<AgentDefinition>> {
    let agents = sqlx::query_as::<_, AgentDefinition>(
        "SELECT * FROM agents WHERE is_active = 1 ORDER BY created_at, name",
    )
    .fetch_all(pool)
    .await?;
    Ok(agents)
}

/// List all agent definitions.
pub async fn list_agents(pool: &SqlitePool) -> DbResult<Vec<AgentDefinition>> {
    let agents = sqlx::query_as::<_, AgentDefinition>("SELECT * FROM agents ORDER BY created_at, name")
        .fetch_all(pool)
        .await?;
    Ok(agents)
}

/// Create a new agent definition.
///
/// The name check and insert run in one transaction so two concurrent
/// registrations of the same name cannot both succeed.
pub async fn create_agent(pool: &SqlitePool, agent: &AgentDefinition) -> DbResult<()> {
    let mut tx = pool.begin().await?;

    let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM agents WHERE name = ?")
        .bind(&agent.name)
        .fetch_optional(&mut *tx)
        .await?;
    if existing.is_some() {
        return Err(DbError::already_exists("agent", &agent.name));
    }

    sqlx::query(
        r#"
        INSERT INTO agents (id, name, description, system_prompt, input_schema,
                            output_schema, llm_provider, llm_model, llm_params,
                            tools, fallback_agent, max_chain_depth, chain_strategy,
                            schema_check, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&agent.id)
    .bind(&agent.name)
    .bind(&agent.description)
    .bind(&agent.system_prompt)
    .bind(&agent.input_schema)
    .bind(&agent.output_schema)
    .bind(&agent.llm_provider)
    .bind(&agent.llm_model)
    .bind(&agent.llm_params)
    .bind(&agent.tools)
    .bind(&agent.fallback_agent)
    .bind(agent.max_chain_depth)
    .bind(agent.chain_strategy)
    .bind(agent.schema_check)
    .bind(agent.is_active)
    .bind(agent.created_at)
    .bind(agent.updated_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Update a mutable subset of an agent definition.
///
/// Identity fields (id, name, created_at) never change.
pub async fn update_agent(pool: &SqlitePool, agent: &AgentDefinition) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE agents
        SET description = ?, system_prompt = ?, input_schema = ?, output_schema = ?,
            llm_provider = ?, llm_model = ?, llm_params = ?, tools = ?,
            fallback_agent = ?, max_chain_depth = ?, chain_strategy = ?,
            schema_check = ?, is_active = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&agent.description)
    .bind(&agent.system_prompt)
    .bind(&agent.input_schema)
    .bind(&agent.output_schema)
    .bind(&agent.llm_provider)
    .bind(&agent.llm_model)
    .bind(&agent.llm_params)
    .bind(&agent.tools)
    .bind(&agent.fallback_agent)
    .bind(agent.max_chain_depth)
    .bind(agent.chain_strategy)
    .bind(agent.schema_check)
    .bind(agent.is_active)
    .bind(agent.updated_at)
    .bind(&agent.id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("agent", &agent.id));
    }
    Ok(())
}

/// Deactivate an agent definition. Definitions are never deleted.
pub async fn set_agent_active(pool: &SqlitePool, name: &str, active: bool) -> DbResult<()> {
    let result = sqlx::query("UPDATE agents SET is_active = ?, updated_at = ? WHERE name = ?")
        .bind(active)
        .bind(chrono::Utc::now())
        .bind(name)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("agent", name));
    }
    Ok(())
}
