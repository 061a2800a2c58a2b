//! Unit tests for Langbase API types.

use super::*;
use super::types::PipeResponse;
use crate::config::PricingConfig;
use crate::error::LangbaseError;

fn parse(json: &str) -> PipeResponse {
    serde_json::from_str(json).unwrap()
}

#[test]
fn test_message_constructors() {
    let msg = Message::system("You are a script analyst");
    assert!(matches!(msg.role, MessageRole::System));
    assert_eq!(msg.content, "You are a script analyst");

    let msg = Message::user("Rate this");
    assert!(matches!(msg.role, MessageRole::User));
}

#[test]
fn test_pipe_request_new() {
    let req = PipeRequest::new("test-pipe", vec![Message::user("test")]);
    assert_eq!(req.name, "test-pipe");
    assert_eq!(req.messages.len(), 1);
    assert!(!req.stream);
    assert!(req.variables.is_empty());
}

#[test]
fn test_pipe_request_with_variable() {
    let req = PipeRequest::new("test", vec![])
        .with_variable("temperature", "0.9")
        .with_variable("response_hint", "branches");

    assert_eq!(req.variables.len(), 2);
    assert_eq!(req.variables.get("temperature"), Some(&"0.9".to_string()));
}

#[test]
fn test_pipe_request_serialization_skips_empty_variables() {
    let req = PipeRequest::new("test", vec![Message::user("hi")]);
    let json = serde_json::to_value(&req).unwrap();
    assert_eq!(json["name"], "test");
    assert_eq!(json["stream"], false);
    assert_eq!(json["messages"][0]["role"], "user");
    assert!(json.get("variables").is_none());
}

// ============================================================================
// Pipe runs
// ============================================================================

#[test]
fn test_into_run_reads_usage_and_model() {
    let resp = parse(
        r#"{
        "success": true,
        "completion": "0.8",
        "threadId": null,
        "raw": {"model": "gpt-4o-mini", "usage": {"prompt_tokens": 120, "completion_tokens": 4, "total_tokens": 124}}
    }"#,
    );
    let run = resp.into_run("analytical").unwrap();
    assert_eq!(run.completion, "0.8");
    assert_eq!(run.model.as_deref(), Some("gpt-4o-mini"));
    assert_eq!(
        run.usage,
        TokenUsage {
            prompt_tokens: 120,
            completion_tokens: 4
        }
    );
}

#[test]
fn test_into_run_without_usage_is_free() {
    let run = parse(r#"{"success": true, "completion": "text", "threadId": "t-1", "raw": null}"#)
        .into_run("creative")
        .unwrap();
    assert_eq!(run.thread_id.as_deref(), Some("t-1"));
    assert_eq!(run.usage, TokenUsage::default());

    let run = parse(r#"{"success": true, "completion": "text", "raw": {"usage": {"prompt_tokens": 7}}}"#)
        .into_run("creative")
        .unwrap();
    assert_eq!(run.usage.prompt_tokens, 7);
    assert_eq!(run.usage.completion_tokens, 0);
}

#[test]
fn test_into_run_rejects_unsuccessful_run() {
    let result = parse(r#"{"success": false, "completion": ""}"#).into_run("creative");
    match result {
        Err(LangbaseError::InvalidResponse { message }) => assert!(message.contains("creative")),
        other => panic!("expected InvalidResponse, got {:?}", other),
    }
}

#[test]
fn test_token_usage_cost() {
    let pricing = PricingConfig {
        input_per_mtok: 3.0,
        output_per_mtok: 15.0,
    };
    // 1M input at $3 plus 100k output at $15/M
    let usage = TokenUsage {
        prompt_tokens: 1_000_000,
        completion_tokens: 100_000,
    };
    assert!((usage.cost(&pricing) - 4.5).abs() < 1e-9);
    assert_eq!(TokenUsage::default().cost(&pricing), 0.0);
}

// ============================================================================
// Pipe provisioning
// ============================================================================

#[test]
fn test_create_pipe_request_upsert() {
    let req = CreatePipeRequest::upsert("my-pipe", "desc", "sys");

    let json = serde_json::to_value(&req).unwrap();
    assert_eq!(json["name"], "my-pipe");
    assert_eq!(json["model"], DEFAULT_PIPE_MODEL);
    assert_eq!(json["upsert"], true);
    assert_eq!(json["max_tokens"], 3000);
    assert_eq!(json["messages"][0]["role"], "system");
    assert_eq!(json["messages"][0]["content"], "sys");
}

#[test]
fn test_create_pipe_request_with_model() {
    let req = CreatePipeRequest::upsert("my-pipe", "desc", "sys").with_model("openai:gpt-4o");
    assert_eq!(req.model, "openai:gpt-4o");
    assert!(req.upsert);
}

#[test]
fn test_pipe_summary_tolerates_missing_url() {
    let summary: PipeSummary = serde_json::from_str(r#"{"name": "p", "status": "private"}"#).unwrap();
    assert_eq!(summary.name, "p");
    assert!(summary.url.is_none());
}
