//! Tool round-trips during a delegation turn.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;

use common::{registry_with, strict_definition};
use switchboard_core::prelude::*;
use switchboard_core::{ChatRequest, ChatResponse, ConversationId, TokenUsage, ToolCall};
use switchboard_db::queries::execution as execution_queries;

/// Provider that asks for a tool on the first call and answers from the tool
/// result on the second.
#[derive(Debug)]
struct ToolCallingProvider {
    requests: Mutex<Vec<ChatRequest>>,
}

impl ToolCallingProvider {
    fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ModelProvider for ToolCallingProvider {
    fn name(&self) -> &str {
        "tool-calling"
    }

    async fn chat(&self, request: ChatRequest) -> switchboard_core::Result<ChatResponse> {
        let call_index = {
            let mut requests = self.requests.lock();
            requests.push(request.clone());
            requests.len()
        };

        if call_index == 1 {
            Ok(ChatResponse {
                text: String::new(),
                tool_call: Some(ToolCall {
                    name: "word_count".to_string(),
                    arguments: json!({"text": "alpha beta gamma"}),
                }),
                usage: TokenUsage {
                    prompt_tokens: 12,
                    completion_tokens: 3,
                },
            })
        } else {
            // The follow-up turn carries the tool result as its input
            let input = request.input.clone();
            assert!(input.contains("word_count"));
            Ok(ChatResponse {
                text: r#"{"response": "there are 3 words"}"#.to_string(),
                tool_call: None,
                usage: TokenUsage {
                    prompt_tokens: 20,
                    completion_tokens: 8,
                },
            })
        }
    }
}

#[tokio::test]
async fn tool_call_round_trip_feeds_result_back() {
    let provider = Arc::new(ToolCallingProvider::new());
    let (db, registry) = registry_with(provider.clone()).await;

    let mut definition = strict_definition("COUNTER", "counter");
    definition.tools = sqlx::types::Json(vec!["word_count".to_string()]);
    registry.register(definition).await.unwrap();

    let agent = registry.resolve("counter").await.unwrap();
    let request = AgentRequest::new(
        ConversationId::for_user("cli", "u1"),
        json!({"message": "how many words in 'alpha beta gamma'?"}),
    );
    let reply = agent.process(&registry, request).await.unwrap();

    assert_eq!(reply.output["response"], "there are 3 words");

    // Two model calls: the tool-requesting turn and the follow-up
    let requests = provider.requests.lock().clone();
    assert_eq!(requests.len(), 2);
    // The first call advertised the bound tool
    assert_eq!(requests[0].tools.len(), 1);
    assert_eq!(requests[0].tools[0].name, "word_count");
    // The follow-up carries the tool result and no tool surface
    assert!(requests[1].input.contains("\"count\":3"));
    assert!(requests[1].tools.is_empty());

    // Token usage accumulates across both calls
    let rows = execution_queries::executions_for_conversation(db.pool(), "cli:u1")
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].prompt_tokens, Some(32));
    assert_eq!(rows[0].completion_tokens, Some(11));
}
