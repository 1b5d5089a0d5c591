//! Runtime agent instances and the fallback-delegation protocol.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::BoxFuture;
use serde_json::{json, Value};
use sqlx::types::Json;
use tracing::{debug, error, info, warn};

use crate::agent::{AgentRegistry, AgentRequest};
use crate::error::{CoreError, Result};
use crate::id::ExecutionId;
use crate::model::{
    chat_with_deadline, ChatMessage, ChatRequest, ModelOptions, ModelProvider, TokenUsage,
};
use crate::schema::StructuralSchema;
use crate::tool::{descriptors, AgentTool};
use switchboard_db::queries::execution as execution_queries;
use switchboard_db::{
    AgentDefinition, AgentExecution, ExecutionOutcome, ExecutionStatus, SchemaCheck, SwitchboardDb,
};

/// The final result of a delegation chain.
#[derive(Debug, Clone)]
pub struct AgentReply {
    /// Response text for the caller
    pub text: String,
    /// Parsed output payload, as recorded in provenance
    pub output: Value,
    /// Name of the agent that produced the usable result
    pub agent: String,
    /// Execution row of the producing attempt
    pub execution_id: ExecutionId,
    /// Token usage of the producing attempt
    pub usage: TokenUsage,
}

/// Result of a single model turn, before fallback is considered.
enum Attempt {
    Valid {
        output: Value,
        text: String,
        usage: TokenUsage,
    },
    Invalid {
        errors: Vec<String>,
        usage: TokenUsage,
    },
}

/// A runtime agent: one definition snapshot, a live model handle, and the
/// tools bound at activation.
///
/// Instances are created by the [`AgentRegistry`] and cached per name; the
/// registry hands out the same instance until its cache is cleared.
pub struct DynamicAgent {
    definition: AgentDefinition,
    provider: Arc<dyn ModelProvider>,
    tools: Vec<Arc<dyn AgentTool>>,
    input_schema: Option<StructuralSchema>,
    output_schema: Option<StructuralSchema>,
    db: SwitchboardDb,
}

impl DynamicAgent {
    pub(crate) fn new(
        definition: AgentDefinition,
        provider: Arc<dyn ModelProvider>,
        tools: Vec<Arc<dyn AgentTool>>,
        db: SwitchboardDb,
    ) -> Self {
        let input_schema = definition
            .input_schema
            .as_ref()
            .map(|Json(schema)| StructuralSchema::new(schema.clone()));
        let output_schema = definition
            .output_schema
            .as_ref()
            .map(|Json(schema)| StructuralSchema::new(schema.clone()));
        Self {
            definition,
            provider,
            tools,
            input_schema,
            output_schema,
            db,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &AgentDefinition {
        &self.definition
    }

    /// Whether this agent claims an inbound payload.
    ///
    /// A definition without an input schema never claims a message; the
    /// router's default agent covers those.
    pub fn can_handle(&self, payload: &Value) -> bool {
        self.input_schema
            .as_ref()
            .map(|schema| schema.matches(payload))
            .unwrap_or(false)
    }

    /// Run the delegation protocol for one request.
    ///
    /// Creates an execution row, performs one model turn, validates the
    /// output, and on validation failure delegates to the configured
    /// fallback while depth budget remains. Every attempt finalizes its own
    /// row exactly once.
    ///
    /// Returns a boxed future: the fallback hop re-enters this function, and
    /// recursion through an `async fn` needs the erased type.
    pub fn process<'a>(
        &'a self,
        registry: &'a AgentRegistry,
        request: AgentRequest,
    ) -> BoxFuture<'a, Result<AgentReply>> {
        Box::pin(async move {
            let def = &self.definition;

            // Entry guard: a request already at the budget would produce a
            // row violating the depth invariant, so it never gets one.
            if request.chain_depth >= def.max_chain_depth {
                return Err(CoreError::ChainDepthExceeded {
                    agent: def.name.clone(),
                    chain_depth: request.chain_depth,
                    max_chain_depth: def.max_chain_depth,
                });
            }

            let execution_id = ExecutionId::generate();
            self.create_execution_row(&execution_id, &request).await?;

            debug!(
                agent = %def.name,
                execution = %execution_id,
                depth = request.chain_depth,
                "delegation attempt started"
            );

            let started = Instant::now();
            let attempt = self.run_attempt(&request).await;
            let elapsed_ms = started.elapsed().as_millis() as i64;

            match attempt {
                Err(err) => {
                    // Transport/model/tool exceptions abort immediately; they
                    // never trigger the fallback.
                    let outcome = ExecutionOutcome::failure(err.to_string())
                        .with_metadata(json!({
                            "error_type": err.error_type(),
                            "error_details": err.to_string(),
                        }))
                        .with_duration_ms(elapsed_ms);
                    self.finalize(&execution_id, outcome).await;
                    Err(err)
                }
                Ok(Attempt::Valid {
                    output,
                    text,
                    usage,
                }) => {
                    let outcome = ExecutionOutcome::success(output.clone())
                        .with_duration_ms(elapsed_ms)
                        .with_tokens(usage.prompt_tokens as i64, usage.completion_tokens as i64);
                    self.finalize(&execution_id, outcome).await;
                    info!(agent = %def.name, execution = %execution_id, "delegation attempt succeeded");
                    Ok(AgentReply {
                        text,
                        output,
                        agent: def.name.clone(),
                        execution_id,
                        usage,
                    })
                }
                Ok(Attempt::Invalid { errors, usage }) => {
                    self.handle_invalid(registry, &request, execution_id, errors, usage, elapsed_ms)
                        .await
                }
            }
        })
    }

    /// Schema-invalid output: delegate while budget remains, else exhaust.
    async fn handle_invalid(
        &self,
        registry: &AgentRegistry,
        request: &AgentRequest,
        execution_id: ExecutionId,
        errors: Vec<String>,
        usage: TokenUsage,
        elapsed_ms: i64,
    ) -> Result<AgentReply> {
        let def = &self.definition;

        let fallback_name = def.fallback_agent.as_deref().filter(|_| {
            // Strict: a definition with max_chain_depth = 1 never delegates.
            request.chain_depth + 1 < def.max_chain_depth
        });

        let Some(fallback_name) = fallback_name else {
            warn!(
                agent = %def.name,
                execution = %execution_id,
                "output failed validation with no fallback available"
            );
            let outcome = ExecutionOutcome::failure("output failed schema validation")
                .with_metadata(json!({ "validation_errors": errors }))
                .with_duration_ms(elapsed_ms)
                .with_tokens(usage.prompt_tokens as i64, usage.completion_tokens as i64);
            self.finalize(&execution_id, outcome).await;
            return Err(CoreError::ValidationExhausted {
                agent: def.name.clone(),
                validation_errors: errors,
            });
        };

        debug!(
            agent = %def.name,
            fallback = %fallback_name,
            depth = request.chain_depth,
            "output failed validation, delegating"
        );

        let fallback = match registry.resolve(fallback_name).await {
            Ok(agent) => agent,
            Err(err) => {
                let outcome = ExecutionOutcome::failure(format!(
                    "fallback agent {fallback_name} could not be resolved: {err}"
                ))
                .with_metadata(json!({
                    "validation_errors": errors,
                    "delegated_to": fallback_name,
                    "error_type": err.error_type(),
                }))
                .with_duration_ms(elapsed_ms);
                self.finalize(&execution_id, outcome).await;
                return Err(err);
            }
        };

        let child = request.fallback_hop(execution_id.clone());
        // Depth-first and synchronous within the chain: the child finishes
        // and bubbles its result back before this row finalizes.
        match fallback.process(registry, child).await {
            Ok(reply) => {
                // The chain produced a usable result, so this attempt is
                // recorded as a success with the validation failure noted.
                let outcome = ExecutionOutcome::success(reply.output.clone())
                    .with_error_message(format!(
                        "output failed schema validation; delegated to {fallback_name}"
                    ))
                    .with_metadata(json!({
                        "validation_errors": errors,
                        "delegated_to": fallback_name,
                    }))
                    .with_duration_ms(elapsed_ms)
                    .with_tokens(usage.prompt_tokens as i64, usage.completion_tokens as i64);
                self.finalize(&execution_id, outcome).await;
                Ok(reply)
            }
            Err(err) => {
                let outcome = ExecutionOutcome::failure(format!(
                    "fallback chain failed after validation failure: {err}"
                ))
                .with_metadata(json!({
                    "validation_errors": errors,
                    "delegated_to": fallback_name,
                    "error_type": err.error_type(),
                }))
                .with_duration_ms(elapsed_ms)
                .with_tokens(usage.prompt_tokens as i64, usage.completion_tokens as i64);
                self.finalize(&execution_id, outcome).await;
                Err(err)
            }
        }
    }

    /// One model turn: render the prompt, call the model (with at most one
    /// tool round-trip), and validate the output.
    async fn run_attempt(&self, request: &AgentRequest) -> Result<Attempt> {
        let def = &self.definition;
        let options = ModelOptions::from(&def.llm_params.0);
        let rendered_input = self.render_input(request);

        let chat = ChatRequest {
            system_prompt: def.system_prompt.clone(),
            history: request.history.clone(),
            input: rendered_input.clone(),
            options: options.clone(),
            tools: descriptors(&self.tools),
        };

        let mut usage = TokenUsage::default();
        let response = chat_with_deadline(self.provider.as_ref(), &def.llm_model, chat).await?;
        usage.accumulate(response.usage);

        let text = match response.tool_call {
            Some(call) => {
                let tool = self
                    .tools
                    .iter()
                    .find(|tool| tool.name() == call.name)
                    .ok_or_else(|| {
                        CoreError::tool_execution_error(
                            call.name.clone(),
                            "tool is not bound to this agent",
                        )
                    })?;

                debug!(agent = %def.name, tool = %call.name, "executing tool call");
                let result = tool.execute(call.arguments.clone()).await?;

                let mut history = request.history.clone();
                history.push(ChatMessage::user(rendered_input));
                history.push(ChatMessage::assistant(response.text.clone()));

                let followup = ChatRequest {
                    system_prompt: def.system_prompt.clone(),
                    history,
                    input: format!("Tool {} returned: {}", call.name, result),
                    options,
                    tools: Vec::new(),
                };
                let second =
                    chat_with_deadline(self.provider.as_ref(), &def.llm_model, followup).await?;
                usage.accumulate(second.usage);
                second.text
            }
            None => response.text,
        };

        let errors = self.check_output(&text, &mut usage).await?;
        if errors.is_empty() {
            let output = parse_output(&text);
            Ok(Attempt::Valid {
                output,
                text,
                usage,
            })
        } else {
            Ok(Attempt::Invalid { errors, usage })
        }
    }

    /// Check output against the output schema per the definition's mode.
    async fn check_output(&self, text: &str, usage: &mut TokenUsage) -> Result<Vec<String>> {
        let Some(schema) = &self.output_schema else {
            return Ok(Vec::new());
        };
        let def = &self.definition;

        match def.schema_check {
            SchemaCheck::Structural => Ok(schema.check_text(text)),
            SchemaCheck::ModelAssisted => {
                let schema_json = def
                    .output_schema
                    .as_ref()
                    .map(|Json(schema)| schema.to_string())
                    .unwrap_or_default();
                let question = format!(
                    "Determine if the following text matches this JSON schema:\n{schema_json}\n\n\
                     Respond with only 'yes' or 'no'.\n\nText:\n{text}"
                );
                let chat = ChatRequest {
                    system_prompt: "You are a strict schema conformance checker.".to_string(),
                    history: Vec::new(),
                    input: question,
                    options: ModelOptions::from(&def.llm_params.0),
                    tools: Vec::new(),
                };
                let response =
                    chat_with_deadline(self.provider.as_ref(), &def.llm_model, chat).await?;
                usage.accumulate(response.usage);
                if response.text.trim().to_lowercase().starts_with("yes") {
                    Ok(Vec::new())
                } else {
                    Ok(vec!["model-assisted check rejected the output".to_string()])
                }
            }
        }
    }

    fn render_input(&self, request: &AgentRequest) -> String {
        match request.context.as_deref() {
            Some(context) if !context.is_empty() => {
                format!("{}\n\n{}", context, request.message())
            }
            _ => request.message().to_string(),
        }
    }

    async fn create_execution_row(
        &self,
        execution_id: &ExecutionId,
        request: &AgentRequest,
    ) -> Result<()> {
        let row = AgentExecution {
            id: execution_id.as_str().to_string(),
            agent_id: self.definition.id.clone(),
            conversation_id: request.conversation_id.as_str().to_string(),
            input_data: Json(request.payload.clone()),
            output_data: None,
            chain_depth: request.chain_depth,
            parent_execution_id: request
                .parent_execution_id
                .as_ref()
                .map(|parent| parent.as_str().to_string()),
            status: ExecutionStatus::InProgress,
            error_message: None,
            metadata: None,
            duration_ms: None,
            prompt_tokens: None,
            completion_tokens: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        execution_queries::create_execution(self.db.pool(), &row).await?;
        Ok(())
    }

    /// Finalize the attempt's provenance row.
    ///
    /// Provenance is internal bookkeeping; a failed write is logged, not
    /// allowed to replace the caller's result.
    async fn finalize(&self, execution_id: &ExecutionId, outcome: ExecutionOutcome) {
        if let Err(err) =
            execution_queries::finalize_execution(self.db.pool(), execution_id.as_str(), outcome)
                .await
        {
            error!(
                execution = %execution_id,
                "failed to finalize execution row: {err}"
            );
        }
    }
}

impl std::fmt::Debug for DynamicAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicAgent")
            .field("name", &self.definition.name)
            .field("model", &self.definition.llm_model)
            .field("tools", &self.tools.len())
            .field("fallback", &self.definition.fallback_agent)
            .finish()
    }
}

/// Interpret model output: structured JSON when it parses to a container,
/// otherwise wrapped as `{"response": <text>}`.
fn parse_output(text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(value) if value.is_object() || value.is_array() => value,
        _ => json!({ "response": text }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_output_is_kept_as_is() {
        let output = parse_output(r#"{"response": "hi", "confidence": 1.0}"#);
        assert_eq!(output["confidence"], 1.0);
    }

    #[test]
    fn prose_output_is_wrapped() {
        let output = parse_output("plain prose");
        assert_eq!(output["response"], "plain prose");
    }
}
