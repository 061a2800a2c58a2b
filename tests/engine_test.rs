//! End-to-end engine tests
//!
//! Drives the explorer, ranker and consensus loop through the Langbase-backed
//! oracle against a wiremock server, routing by pipe name.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::{
    matchers::{body_partial_json, body_string_contains, method, path},
    Mock, MockServer, ResponseTemplate,
};

use idea_refinery::config::{EngineConfig, LangbaseConfig, PipeConfig, PricingConfig, RequestConfig};
use idea_refinery::langbase::LangbaseClient;
use idea_refinery::oracle::LangbaseOracle;
use idea_refinery::{
    DebateConfig, DebateContext, EvaluatorProfile, ExploreConfig, Idea, RankConfig, Refinery,
};

const CREATIVE: &str = "creative-generation-v1";
const ANALYTICAL: &str = "analytical-scoring-v1";

fn create_refinery(base_url: &str) -> Refinery {
    let client = LangbaseClient::new(
        &LangbaseConfig {
            api_key: "test-api-key".to_string(),
            base_url: base_url.to_string(),
        },
        RequestConfig {
            timeout_ms: 5000,
            max_retries: 0,
            retry_delay_ms: 10,
        },
    )
    .expect("Failed to create client");
    let oracle = LangbaseOracle::new(client, PipeConfig::default(), PricingConfig::default());
    Refinery::new(Arc::new(oracle), &EngineConfig::default())
}

fn pipe_reply(completion: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "completion": completion,
        "raw": {
            "model": "gpt-4o-mini",
            "usage": { "prompt_tokens": 1000, "completion_tokens": 100, "total_tokens": 1100 }
        }
    }))
}

async fn mount_pipe(server: &MockServer, pipe: &str, completion: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/pipes/run"))
        .and(body_partial_json(json!({ "name": pipe })))
        .respond_with(pipe_reply(completion))
        .mount(server)
        .await;
}

fn idea() -> Idea {
    Idea::new("Deep Sea Cities", "Hidden structures on the ocean floor")
        .with_keywords(vec!["ocean".to_string()])
}

#[tokio::test]
async fn test_explore_over_langbase() {
    let server = MockServer::start().await;
    mount_pipe(&server, CREATIVE, r#"["sunken temple", "sonar anomaly"]"#).await;
    mount_pipe(&server, ANALYTICAL, "0.8").await;

    let refinery = create_refinery(&server.uri());
    let config = ExploreConfig::default().with_max_branches(2).with_max_depth(1);
    let result = refinery
        .explore(&idea(), "science", &config, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.total_explored, 3);
    assert_eq!(result.total_pruned, 0);
    // Leaves at 0.8 never beat the root's 1.0
    assert_eq!(result.selected.id, "root");
    let tree = result.tree.to_json();
    let children = tree["children"].as_array().unwrap();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0]["content"], "sunken temple");
    assert_eq!(children[0]["parent_id"], "root");
}

#[tokio::test]
async fn test_explore_survives_unavailable_oracle() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/pipes/run"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let refinery = create_refinery(&server.uri());
    let result = refinery
        .explore(&idea(), "science", &ExploreConfig::default(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.total_explored, 1);
    assert_eq!(result.selected.id, "root");
    assert!(!result.cancelled);
}

#[tokio::test]
async fn test_rank_over_langbase() {
    let server = MockServer::start().await;
    mount_pipe(
        &server,
        CREATIVE,
        "[HOOK]\nWhat lies below?\n[MAIN CONTENT]\nA city of stone. [VISUAL: ruins]\n[CALL TO ACTION]\nFollow for part two.",
    )
    .await;
    mount_pipe(&server, ANALYTICAL, "Score: 0.66").await;

    let refinery = create_refinery(&server.uri());
    let result = refinery
        .rank(
            &idea(),
            "sunken temple",
            "science",
            &RankConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.candidates.len(), 3);
    let ranks: Vec<_> = result.candidates.iter().map(|c| c.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
    assert!(result.candidates.iter().all(|c| c.score == 0.66));

    // 1000 input tokens at $3/M plus 100 output tokens at $15/M, per candidate
    assert!((result.total_cost - 3.0 * 0.0045).abs() < 1e-9);

    let top = result.top_candidate.unwrap();
    assert_eq!(top.id, "candidate-0");
    assert_eq!(top.metadata.structure.opening, "What lies below?");
    assert_eq!(top.metadata.visual_cues, vec!["ruins".to_string()]);
}

#[tokio::test]
async fn test_debate_over_langbase() {
    let server = MockServer::start().await;
    mount_pipe(
        &server,
        ANALYTICAL,
        "SCORE: 91\nSTRENGTHS:\n- sharp hook\nWEAKNESSES:\n- none\nIMPROVEMENTS:\n- keep it\nREASONING:\nWorks.\nQUOTE:\n\"Ship it\"",
    )
    .await;

    let refinery = create_refinery(&server.uri());
    let context = DebateContext {
        niche: "science".to_string(),
        topic: "deep sea".to_string(),
        purpose: "short video".to_string(),
    };
    let result = refinery
        .debate(
            "What lies below?",
            &context,
            &EvaluatorProfile::default_panel(),
            &DebateConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(result.consensus_achieved);
    assert_eq!(result.rounds.len(), 1);
    assert_eq!(result.final_score, 91.0);
    assert_eq!(result.final_content, "What lies below?");
}

#[tokio::test]
async fn test_debate_revises_until_approved() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/pipes/run"))
        .and(body_partial_json(json!({ "name": ANALYTICAL })))
        .and(body_string_contains("polished draft"))
        .respond_with(pipe_reply("SCORE: 88\nIMPROVEMENTS:\n- none"))
        .mount(&server)
        .await;
    mount_pipe(&server, ANALYTICAL, "SCORE: 60\nIMPROVEMENTS:\n- stronger hook").await;
    mount_pipe(&server, CREATIVE, "polished draft").await;

    let refinery = create_refinery(&server.uri());
    let result = refinery
        .debate(
            "rough draft",
            &DebateContext::default(),
            &EvaluatorProfile::default_panel(),
            &DebateConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(result.consensus_achieved);
    assert_eq!(result.rounds.len(), 2);
    assert_eq!(result.rounds[0].average_score, 60.0);
    assert_eq!(result.rounds[0].improvements.len(), 3);
    assert_eq!(result.final_content, "polished draft");
}
