//! Orchestrator routing: explicit addressing, handler scan, default agent,
//! and memory recording.

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use common::{lenient_definition, registry_with, ScriptedProvider};
use switchboard_core::prelude::*;
use switchboard_core::{seed_default_agents, MemoryConfig, RegistryConfig, RouterConfig};

async fn switchboard(provider: Arc<ScriptedProvider>) -> (Arc<AgentRegistry>, Switchboard) {
    let (db, registry) = registry_with(provider).await;
    let memory = Arc::new(MemoryStore::new(
        "orchestrator",
        db,
        MemoryConfig::default(),
    ));
    let board = Switchboard::new(registry.clone(), memory, RouterConfig::default());
    (registry, board)
}

#[tokio::test]
async fn explicit_address_routes_verbatim() {
    let provider = Arc::new(ScriptedProvider::new());
    provider.script("BILLING", &["Your balance is $10"]);

    let (registry, board) = switchboard(provider.clone()).await;
    registry
        .register(lenient_definition("BILLING", "billing"))
        .await
        .unwrap();

    let response = board
        .handle(
            "@billing what is my balance",
            &UserInfo::new("u1"),
            "telegram",
        )
        .await
        .unwrap();
    assert_eq!(response, "Your balance is $10");

    // The marker and its trailing space are stripped from the forwarded text
    let request = provider.requests().pop().unwrap();
    assert_eq!(request.input, "what is my balance");
}

#[tokio::test]
async fn unknown_explicit_address_lists_known_agents() {
    let provider = Arc::new(ScriptedProvider::new());
    let (registry, board) = switchboard(provider).await;
    registry
        .register(lenient_definition("BILLING", "billing"))
        .await
        .unwrap();

    let err = board
        .handle("@nonesuch hello", &UserInfo::new("u1"), "telegram")
        .await
        .unwrap_err();
    match err {
        CoreError::AgentNotFound {
            identifier,
            available,
        } => {
            assert_eq!(identifier, "nonesuch");
            assert_eq!(available, vec!["billing".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn handler_scan_takes_first_matching_agent() {
    let provider = Arc::new(ScriptedProvider::new());
    provider.script("ALPHA", &["alpha here"]);
    provider.script("BETA", &["beta here"]);

    let (registry, board) = switchboard(provider).await;

    // Both schemas claim every payload; registration order decides.
    let claim_all = json!({
        "type": "object",
        "required": ["message"],
        "properties": { "message": { "type": "string" } }
    });
    let mut alpha = lenient_definition("ALPHA", "alpha");
    alpha.input_schema = Some(sqlx::types::Json(claim_all.clone()));
    let mut beta = lenient_definition("BETA", "beta");
    beta.input_schema = Some(sqlx::types::Json(claim_all));
    registry.register(alpha).await.unwrap();
    registry.register(beta).await.unwrap();

    let response = board
        .handle("route me", &UserInfo::new("u1"), "cli")
        .await
        .unwrap();
    assert_eq!(response, "alpha here");
}

#[tokio::test]
async fn unclaimed_messages_fall_through_to_default_agent() {
    let provider = Arc::new(ScriptedProvider::new());
    provider.script("assistant", &["default agent speaking"]);

    let (registry, board) = switchboard(provider).await;
    // Seeded assistant has no input schema, so it claims nothing and only
    // serves as the configured default.
    seed_default_agents(&registry, &RegistryConfig::default())
        .await
        .unwrap();

    let response = board
        .handle("nobody claims this", &UserInfo::new("u1"), "cli")
        .await
        .unwrap();
    assert_eq!(response, "default agent speaking");
}

#[tokio::test]
async fn relevant_memory_is_injected_as_context() {
    let provider = Arc::new(ScriptedProvider::new());
    provider.script("assistant", &["noted"]);

    let (registry, board) = switchboard(provider.clone()).await;
    seed_default_agents(&registry, &RegistryConfig::default())
        .await
        .unwrap();

    board
        .memory()
        .add_memory(
            "the march invoice is overdue",
            MemoryType::Conversation,
            json!({}),
            0.0,
        )
        .await;

    board
        .handle("tell me about the march invoice", &UserInfo::new("u1"), "cli")
        .await
        .unwrap();

    let request = provider.requests().pop().unwrap();
    assert!(request.input.starts_with("Relevant context from memory:"));
    assert!(request.input.contains("the march invoice is overdue"));
    assert!(request.input.ends_with("tell me about the march invoice"));
}

#[tokio::test]
async fn both_sides_of_the_exchange_are_remembered() {
    let provider = Arc::new(ScriptedProvider::new());
    provider.script("assistant", &["hello to you"]);

    let (registry, board) = switchboard(provider).await;
    seed_default_agents(&registry, &RegistryConfig::default())
        .await
        .unwrap();

    board
        .handle("hello", &UserInfo::new("u1"), "telegram")
        .await
        .unwrap();

    let recent = board.memory().get_recent(Some(MemoryType::Conversation), 10).await;
    assert_eq!(recent.len(), 2);

    let incoming = recent
        .iter()
        .find(|entry| entry.metadata.0["direction"] == "incoming")
        .unwrap();
    assert_eq!(incoming.content, "hello");
    assert_eq!(incoming.metadata.0["platform"], "telegram");
    assert_eq!(incoming.metadata.0["conversation_id"], "telegram:u1");

    let outgoing = recent
        .iter()
        .find(|entry| entry.metadata.0["direction"] == "outgoing")
        .unwrap();
    assert_eq!(outgoing.content, "hello to you");
    assert_eq!(outgoing.metadata.0["agent"], "assistant");
}

#[tokio::test]
async fn conversation_history_is_replayed_per_user() {
    let provider = Arc::new(ScriptedProvider::new());
    provider.script("assistant", &["first answer", "second answer"]);

    let (registry, board) = switchboard(provider.clone()).await;
    seed_default_agents(&registry, &RegistryConfig::default())
        .await
        .unwrap();

    let first = board
        .handle("first question", &UserInfo::new("u1"), "cli")
        .await
        .unwrap();
    assert_eq!(first, "first answer");
    board
        .handle("second question", &UserInfo::new("u1"), "cli")
        .await
        .unwrap();

    // The second call replays the first exchange as history
    let second_request = provider.requests().pop().unwrap();
    assert_eq!(second_request.history.len(), 2);
    assert_eq!(second_request.history[0].content, "first question");
    assert_eq!(second_request.history[1].content, "first answer");

    // A different user starts from an empty history
    board
        .handle("unrelated", &UserInfo::new("u2"), "cli")
        .await
        .unwrap();
    let other_request = provider.requests().pop().unwrap();
    assert!(other_request.history.is_empty());
}
