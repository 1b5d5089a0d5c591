//! Execution provenance queries.

use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::error::{DbError, DbResult};
use crate::models::{AgentExecution, ExecutionStatus};

/// Terminal outcome of one delegation attempt.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub status: ExecutionStatus,
    pub output_data: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub duration_ms: Option<i64>,
    pub prompt_tokens: Option<i64>,
    pub completion_tokens: Option<i64>,
}

impl ExecutionOutcome {
    /// Successful outcome with the parsed output payload.
    pub fn success(output: serde_json::Value) -> Self {
        Self {
            status: ExecutionStatus::Success,
            output_data: Some(output),
            error_message: None,
            metadata: None,
            duration_ms: None,
            prompt_tokens: None,
            completion_tokens: None,
        }
    }

    /// Failed outcome with an error message.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Failure,
            output_data: None,
            error_message: Some(error.into()),
            metadata: None,
            duration_ms: None,
            prompt_tokens: None,
            completion_tokens: None,
        }
    }

    pub fn with_error_message(mut self, error: impl Into<String>) -> Self {
        self.error_message = Some(error.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: i64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_tokens(mut self, prompt: i64, completion: i64) -> Self {
        self.prompt_tokens = Some(prompt);
        self.completion_tokens = Some(completion);
        self
    }
}

/// Create an execution row in the `in_progress` state.
pub async fn create_execution(pool: &SqlitePool, execution: &AgentExecution) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO agent_executions (id, agent_id, conversation_id, input_data,
                                      output_data, chain_depth, parent_execution_id,
                                      status, error_message, metadata, duration_ms,
                                      prompt_tokens, completion_tokens, created_at,
                                      completed_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&execution.id)
    .bind(&execution.agent_id)
    .bind(&execution.conversation_id)
    .bind(&execution.input_data)
    .bind(&execution.output_data)
    .bind(execution.chain_depth)
    .bind(&execution.parent_execution_id)
    .bind(execution.status)
    .bind(&execution.error_message)
    .bind(&execution.metadata)
    .bind(execution.duration_ms)
    .bind(execution.prompt_tokens)
    .bind(execution.completion_tokens)
    .bind(execution.created_at)
    .bind(execution.completed_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Finalize an execution row to a terminal status.
///
/// The `WHERE status = 'in_progress'` guard makes finalization one-shot: a
/// second attempt (or an attempt to finalize to a non-terminal status) is a
/// constraint violation, never a silent overwrite.
pub async fn finalize_execution(
    pool: &SqlitePool,
    id: &str,
    outcome: ExecutionOutcome,
) -> DbResult<()> {
    if !outcome.status.is_terminal() {
        return Err(DbError::constraint(format!(
            "execution {id} cannot be finalized to non-terminal status {:?}",
            outcome.status
        )));
    }

    let result = sqlx::query(
        r#"
        UPDATE agent_executions
        SET status = ?, output_data = ?, error_message = ?, metadata = ?,
            duration_ms = ?, prompt_tokens = ?, completion_tokens = ?,
            completed_at = ?
        WHERE id = ? AND status = 'in_progress'
        "#,
    )
    .bind(outcome.status)
    .bind(outcome.output_data.map(Json))
    .bind(&outcome.error_message)
    .bind(outcome.metadata.map(Json))
    .bind(outcome.duration_ms)
    .bind(outcome.prompt_tokens)
    .bind(outcome.completion_tokens)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::constraint(format!(
            "execution {id} already finalized or missing"
        )));
    }
    Ok(())
}

/// Get an execution row by ID.
pub async fn get_execution(pool: &SqlitePool, id: &str) -> DbResult<Option<AgentExecution>> {
    let execution =
        sqlx::query_as::<_, AgentExecution>("SELECT * FROM agent_executions WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(execution)
}

/// List executions for a conversation, oldest first.
pub async fn executions_for_conversation(
    pool: &SqlitePool,
    conversation_id: &str,
) -> DbResult<Vec<AgentExecution>> {
    let executions = sqlx::query_as::<_, AgentExecution>(
        "SELECT * FROM agent_executions WHERE conversation_id = ? ORDER BY created_at, chain_depth",
    )
    .bind(conversation_id)
    .fetch_all(pool)
    .await?;
    Ok(executions)
}

/// List direct children of an execution.
pub async fn child_executions(
    pool: &SqlitePool,
    parent_id: &str,
) -> DbResult<Vec<AgentExecution>> {
    let executions = sqlx::query_as::<_, AgentExecution>(
        "SELECT * FROM agent_executions WHERE parent_execution_id = ? ORDER BY created_at",
    )
    .bind(parent_id)
    .fetch_all(pool)
    .await?;
    Ok(executions)
}
