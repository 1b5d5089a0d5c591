//! Administrative agent-builder workflow.
//!
//! A multi-step, per-user session that collects the fields of a new agent
//! definition (name, description, system prompt, model config) and registers
//! it. Sessions are explicit objects keyed by user id with a TTL, swept
//! lazily on access; abandoning a workflow costs nothing.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::{debug, info};

use crate::agent::{new_definition, AgentRegistry};
use crate::config::RegistryConfig;
use crate::error::{CoreError, Result};

const DEFAULT_SESSION_TTL_MINUTES: i64 = 15;

/// Steps of the builder workflow, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStep {
    Name,
    Description,
    SystemPrompt,
    LlmConfig,
}

/// Collected fields for the definition under construction.
#[derive(Debug, Clone, Default)]
struct AgentDraft {
    name: String,
    description: String,
    system_prompt: String,
}

/// One user's in-progress workflow.
#[derive(Debug, Clone)]
struct WorkflowSession {
    step: WorkflowStep,
    draft: AgentDraft,
    last_active: DateTime<Utc>,
}

/// Outcome of one workflow interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowReply {
    /// Instruction for the next step
    Prompt(String),
    /// Input rejected; the step repeats
    Invalid(String),
    /// Workflow cancelled by the user
    Cancelled,
    /// Definition registered
    Created { name: String },
}

/// The agent-builder workflow engine.
pub struct AgentBuilder {
    registry: Arc<AgentRegistry>,
    config: RegistryConfig,
    sessions: DashMap<String, WorkflowSession>,
    ttl: Duration,
}

impl AgentBuilder {
    pub fn new(registry: Arc<AgentRegistry>, config: RegistryConfig) -> Self {
        Self {
            registry,
            config,
            sessions: DashMap::new(),
            ttl: Duration::minutes(DEFAULT_SESSION_TTL_MINUTES),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Start a workflow for a user, replacing any stale one.
    pub fn begin(&self, user_id: &str) -> WorkflowReply {
        self.sweep();
        self.sessions.insert(
            user_id.to_string(),
            WorkflowSession {
                step: WorkflowStep::Name,
                draft: AgentDraft::default(),
                last_active: Utc::now(),
            },
        );
        debug!(user = %user_id, "agent builder workflow started");
        WorkflowReply::Prompt("Enter a name for the new agent:".to_string())
    }

    /// Whether a user currently has a live workflow session.
    pub fn in_workflow(&self, user_id: &str) -> bool {
        self.sweep();
        self.sessions.contains_key(user_id)
    }

    /// Abort a user's workflow, if any.
    pub fn cancel(&self, user_id: &str) -> bool {
        self.sessions.remove(user_id).is_some()
    }

    /// Feed one user input into the workflow.
    pub async fn advance(&self, user_id: &str, input: &str) -> Result<WorkflowReply> {
        self.sweep();
        let mut session = self
            .sessions
            .get(user_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CoreError::NoActiveWorkflow {
                user_id: user_id.to_string(),
            })?;

        let input = input.trim();
        if input.eq_ignore_ascii_case("cancel") {
            self.sessions.remove(user_id);
            return Ok(WorkflowReply::Cancelled);
        }

        let reply = match session.step {
            WorkflowStep::Name => {
                if input.len() < 3 {
                    WorkflowReply::Invalid(
                        "Name must be at least 3 characters long. Please try again:".to_string(),
                    )
                } else if self.registry.name_taken(input).await? {
                    WorkflowReply::Invalid(
                        "An agent with this name already exists. Please choose another name:"
                            .to_string(),
                    )
                } else {
                    session.draft.name = input.to_string();
                    session.step = WorkflowStep::Description;
                    WorkflowReply::Prompt("Enter a description for the agent:".to_string())
                }
            }
            WorkflowStep::Description => {
                session.draft.description = input.to_string();
                session.step = WorkflowStep::SystemPrompt;
                WorkflowReply::Prompt(
                    "Enter the system prompt that defines the agent's behavior:".to_string(),
                )
            }
            WorkflowStep::SystemPrompt => {
                session.draft.system_prompt = input.to_string();
                session.step = WorkflowStep::LlmConfig;
                WorkflowReply::Prompt(format!(
                    "Configure the model. Provide settings in this format:\n\n{}",
                    llm_config_template(&self.config)
                ))
            }
            WorkflowStep::LlmConfig => match self.create_agent(&session.draft, input).await {
                Ok(name) => {
                    self.sessions.remove(user_id);
                    info!(user = %user_id, agent = %name, "agent created via builder workflow");
                    return Ok(WorkflowReply::Created { name });
                }
                Err(CoreError::DuplicateAgent { .. }) => {
                    self.sessions.remove(user_id);
                    return Ok(WorkflowReply::Invalid(
                        "An agent with this name was just registered by someone else. \
                         Please start over with a different name."
                            .to_string(),
                    ));
                }
                Err(err) => {
                    self.sessions.remove(user_id);
                    return Err(err);
                }
            },
        };

        match &reply {
            WorkflowReply::Prompt(_) | WorkflowReply::Invalid(_) => {
                session.last_active = Utc::now();
                self.sessions.insert(user_id.to_string(), session);
            }
            _ => {}
        }
        Ok(reply)
    }

    async fn create_agent(&self, draft: &AgentDraft, llm_input: &str) -> Result<String> {
        let mut definition = new_definition(&self.config, &draft.name, &draft.system_prompt);
        definition.description = Some(draft.description.clone());

        for line in llm_input.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());
            match key {
                "provider" => definition.llm_provider = value.to_string(),
                "model" => definition.llm_model = value.to_string(),
                "temperature" => {
                    if let Ok(parsed) = value.parse::<f32>() {
                        definition.llm_params.0.temperature = parsed;
                    }
                }
                "top_p" => {
                    if let Ok(parsed) = value.parse::<f32>() {
                        definition.llm_params.0.top_p = parsed;
                    }
                }
                _ => {}
            }
        }

        let name = definition.name.clone();
        self.registry.register(definition).await?;
        Ok(name)
    }

    /// Drop sessions idle past the TTL.
    fn sweep(&self) {
        let cutoff = Utc::now() - self.ttl;
        self.sessions.retain(|_, session| session.last_active > cutoff);
    }
}

impl std::fmt::Debug for AgentBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentBuilder")
            .field("sessions", &self.sessions.len())
            .field("ttl_minutes", &self.ttl.num_minutes())
            .finish()
    }
}

fn llm_config_template(config: &RegistryConfig) -> String {
    format!(
        "provider: {}\nmodel: {}\ntemperature: 0.7\ntop_p: 1.0",
        config.llm_provider, config.llm_model
    )
}
