//! The seam to the language-model collaborator.
//!
//! Inference itself lives outside this crate. Everything here is the typed
//! request/response surface a provider implementation must satisfy, plus the
//! uniform timeout wrapper every call site goes through.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use switchboard_db::LlmParams;

/// Role of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

/// One turn of conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Tool,
            content: content.into(),
        }
    }
}

/// Sampling/transport options for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub timeout: Duration,
    pub stream: bool,
    pub context_window: Option<u32>,
}

impl From<&LlmParams> for ModelOptions {
    fn from(params: &LlmParams) -> Self {
        Self {
            temperature: params.temperature,
            top_p: params.top_p,
            timeout: Duration::from_secs(params.timeout_seconds),
            stream: params.stream,
            context_window: params.context_window,
        }
    }
}

/// Tool surface advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Token accounting for one call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }

    pub fn accumulate(&mut self, other: TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
    }
}

/// One model call: rendered system prompt, prior turns, and the current input.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system_prompt: String,
    pub history: Vec<ChatMessage>,
    pub input: String,
    pub options: ModelOptions,
    pub tools: Vec<ToolDescriptor>,
}

/// Raw model output for one call.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub text: String,
    pub tool_call: Option<ToolCall>,
    pub usage: TokenUsage,
}

impl ChatResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_call: None,
            usage: TokenUsage::default(),
        }
    }
}

/// The external inference collaborator.
///
/// Implementations must surface transport failures (network, connection) as
/// [`CoreError::ModelTransport`] and provider-reported errors as
/// [`CoreError::ModelRejected`]; callers treat the two differently.
#[async_trait]
pub trait ModelProvider: Send + Sync + std::fmt::Debug {
    /// Provider name, e.g. "ollama" or "anthropic".
    fn name(&self) -> &str;

    /// Execute one chat turn.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;
}

/// Run one chat call with the per-agent deadline applied.
///
/// Every model call in the crate goes through here so the configured timeout
/// is enforced at all call sites, not just some.
pub async fn chat_with_deadline(
    provider: &dyn ModelProvider,
    model: &str,
    request: ChatRequest,
) -> Result<ChatResponse> {
    let deadline = request.options.timeout;
    match tokio::time::timeout(deadline, provider.chat(request)).await {
        Ok(result) => result,
        Err(_) => Err(CoreError::model_transport(
            provider.name(),
            model,
            format!("timed out after {}s", deadline.as_secs()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct SlowProvider;

    #[async_trait]
    impl ModelProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(ChatResponse::text("too late"))
        }
    }

    fn request_with_timeout(secs: u64) -> ChatRequest {
        ChatRequest {
            system_prompt: "test".to_string(),
            history: vec![],
            input: "hello".to_string(),
            options: ModelOptions {
                temperature: 0.7,
                top_p: 1.0,
                timeout: Duration::from_secs(secs),
                stream: false,
                context_window: None,
            },
            tools: vec![],
        }
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_elapse_is_a_transport_error() {
        let err = chat_with_deadline(&SlowProvider, "m", request_with_timeout(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ModelTransport { .. }));
    }

    #[test]
    fn options_come_from_llm_params() {
        let params = LlmParams {
            timeout_seconds: 5,
            ..LlmParams::default()
        };
        let options = ModelOptions::from(&params);
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert_eq!(options.top_p, 1.0);
    }

    #[test]
    fn usage_accumulates_across_calls() {
        let mut usage = TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
        };
        usage.accumulate(TokenUsage {
            prompt_tokens: 3,
            completion_tokens: 2,
        });
        assert_eq!(usage.total(), 20);
    }
}
