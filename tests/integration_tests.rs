//! Integration tests for prompt-to-workflow generation
//!
//! These tests drive the full pipeline and the HTTP API using mock models and
//! proposers, so nothing here touches the network.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use flowforge_rs::error::AdapterError;
use flowforge_rs::forge::catalog::catalog;
use flowforge_rs::forge::graph::synthesizer::{ORIGIN_X, STEP_X};
use flowforge_rs::forge::graph::WorkflowGraph;
use flowforge_rs::forge::pipeline::{GenerateOptions, GenerationMethod, Generator};
use flowforge_rs::forge::proposer::{GraphProposer, ModelProposer, RuleEngineProposer};
use flowforge_rs::forge::resolver::resolve;
use flowforge_rs::forge::server::{router, EXAMPLE_PROMPTS};
use flowforge_rs::forge::validator::validate;
use flowforge_rs::model::{Content, GenerationConfig, Model};
use flowforge_rs::FlowForgeError;
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

// ============================================================================
// Mock Components
// ============================================================================

/// Mock model that returns predefined text replies in order
struct MockModel {
    replies: Vec<String>,
    reply_index: AtomicUsize,
}

impl MockModel {
    fn new(replies: Vec<&str>) -> Self {
        Self {
            replies: replies.into_iter().map(str::to_string).collect(),
            reply_index: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Model for MockModel {
    fn name(&self) -> &str {
        "mock-model"
    }

    async fn generate_content(
        &self,
        _history: &[Content],
        _config: Option<&GenerationConfig>,
    ) -> Result<Content, AdapterError> {
        let idx = self.reply_index.fetch_add(1, Ordering::SeqCst);
        match self.replies.get(idx) {
            Some(reply) => Ok(Content::model(reply.clone())),
            None => Err(AdapterError::InvalidResponse("Max replies reached".to_string())),
        }
    }
}

/// Mock model that never answers in time
struct SlowModel;

#[async_trait]
impl Model for SlowModel {
    fn name(&self) -> &str {
        "slow-model"
    }

    async fn generate_content(
        &self,
        _history: &[Content],
        _config: Option<&GenerationConfig>,
    ) -> Result<Content, AdapterError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Content::model("{}"))
    }
}

/// Proposer whose upstream always fails
struct FailingProposer;

#[async_trait]
impl GraphProposer for FailingProposer {
    fn name(&self) -> &str {
        "failing"
    }

    async fn propose(&self, _prompt: &str) -> Result<Value, AdapterError> {
        Err(AdapterError::Status {
            status: 503,
            body: "Service Unavailable".to_string(),
        })
    }
}

fn rules_generator() -> Generator {
    Generator::new(RuleEngineProposer::default())
}

fn model_generator(model: impl Model + 'static, timeout: Duration) -> Generator {
    let proposer = ModelProposer::new(Arc::new(model), GenerationConfig::default());
    rules_generator().with_external(Arc::new(proposer), timeout)
}

fn external_workflow() -> Value {
    json!({
        "name": "Orders to Slack",
        "nodes": [
            {
                "name": "Incoming Order",
                "type": "n8n-nodes-base.webhook",
                "position": [250, 300],
                "parameters": {"path": "orders", "httpMethod": "POST"},
                "typeVersion": 1
            },
            {
                "name": "Notify Sales",
                "type": "n8n-nodes-base.slack",
                "position": [450, 300],
                "parameters": {"channel": "#sales"},
                "typeVersion": 1,
                "disabled": false,
                "notes": "added by the model"
            }
        ],
        "connections": {
            "Incoming Order": {"main": [{"node": "Notify Sales", "type": "main", "index": 0}]}
        },
        "active": true,
        "settings": {}
    })
}

fn trigger_count(graph: &WorkflowGraph) -> usize {
    graph
        .nodes
        .iter()
        .filter(|n| catalog().is_trigger_type(&n.wire_type))
        .count()
}

static PROPERTY_PROMPTS: Lazy<Vec<String>> = Lazy::new(|| {
    let extra = [
        "hello",
        "x",
        "Post tweets",
        "Every Monday back up Airtable to Dropbox and S3 bucket",
        "When a form is submitted, wait 5 minutes, then merge data and send SMS",
        "Sync Shopify orders into QuickBooks and Salesforce, then post to LinkedIn and Facebook",
        "manually: slack, discord, telegram, trello, asana, jira, notion, airtable, dropbox, shopify, paypal",
        "Use cron to call the API, transform the XML, and upload to Google Drive",
        "🚀 automate everything!!!",
    ];
    EXAMPLE_PROMPTS
        .iter()
        .copied()
        .chain(extra)
        .map(str::to_string)
        .collect()
});

// ============================================================================
// Rule Engine Properties
// ============================================================================

#[tokio::test]
async fn test_every_prompt_yields_one_trigger_and_valid_graph() {
    let generator = rules_generator();
    for prompt in PROPERTY_PROMPTS.iter() {
        let outcome = generator
            .generate(prompt, GenerateOptions::default())
            .await
            .unwrap_or_else(|e| panic!("'{}' failed: {}", prompt, e));
        let graph = &outcome.workflow;

        assert_eq!(trigger_count(graph), 1, "prompt: {}", prompt);
        assert!(graph.nodes.len() >= 2 && graph.nodes.len() <= 15, "prompt: {}", prompt);
        assert!(validate(&serde_json::to_value(graph).unwrap()).valid, "prompt: {}", prompt);
        assert!(!graph.active);
        assert!(graph.settings.is_empty());
    }
}

#[tokio::test]
async fn test_positions_and_linear_wiring() {
    let generator = rules_generator();
    for prompt in PROPERTY_PROMPTS.iter() {
        let graph = generator
            .generate(prompt, GenerateOptions::default())
            .await
            .unwrap()
            .workflow;

        for (i, node) in graph.nodes.iter().enumerate() {
            assert_eq!(node.position.x, ORIGIN_X + STEP_X * i as i64, "prompt: {}", prompt);
        }
        assert_eq!(graph.connections.len(), graph.nodes.len() - 1);
        for pair in graph.nodes.windows(2) {
            let targets: Vec<&str> = graph.connections[&pair[0].name]
                .targets()
                .map(|t| t.node.as_str())
                .collect();
            assert_eq!(targets, vec![pair[1].name.as_str()], "prompt: {}", prompt);
        }
    }
}

#[tokio::test]
async fn test_credentialed_nodes_are_always_disabled() {
    let generator = rules_generator();
    for prompt in PROPERTY_PROMPTS.iter() {
        let graph = generator
            .generate(prompt, GenerateOptions::default())
            .await
            .unwrap()
            .workflow;
        for node in &graph.nodes {
            if catalog().requires_credential(&node.wire_type) {
                assert!(node.disabled, "{} in '{}'", node.name, prompt);
            }
        }
    }
}

#[tokio::test]
async fn test_round_trip_and_resolver_idempotence() {
    let generator = rules_generator();
    for prompt in PROPERTY_PROMPTS.iter() {
        let graph = generator
            .generate(prompt, GenerateOptions::default())
            .await
            .unwrap()
            .workflow;

        let text = serde_json::to_string(&graph).unwrap();
        let parsed: WorkflowGraph = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, graph);

        let value = serde_json::to_value(&graph).unwrap();
        let once = resolve(value.clone());
        assert_eq!(resolve(once.clone()), once);
        assert_eq!(once, value, "rule engine output is already resolved");
    }
}

#[tokio::test]
async fn test_google_sheets_email_scenario() {
    let outcome = rules_generator()
        .generate(
            "Send an email when a new row is added to Google Sheets",
            GenerateOptions::default(),
        )
        .await
        .unwrap();
    let graph = outcome.workflow;

    assert_eq!(outcome.method, GenerationMethod::RuleEngine);
    assert_eq!(graph.nodes.len(), 2);
    assert_eq!(graph.nodes[0].wire_type, "n8n-nodes-base.googleSheetsTrigger");
    assert_eq!(graph.nodes[1].wire_type, "n8n-nodes-base.gmail");
    assert_eq!(trigger_count(&graph), 1);
    assert_eq!(graph.connections.len(), 1);
    let targets: Vec<&str> = graph.connections["Google Sheets Trigger"]
        .targets()
        .map(|t| t.node.as_str())
        .collect();
    assert_eq!(targets, vec!["Gmail"]);
}

#[tokio::test]
async fn test_empty_prompt_is_a_validation_error() {
    let err = rules_generator()
        .generate("", GenerateOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FlowForgeError::Validation(_)));
}

// ============================================================================
// External Generation
// ============================================================================

#[tokio::test]
async fn test_external_graph_is_resolved_and_accepted() {
    let reply = format!("Here is your workflow:\n```json\n{}\n```", external_workflow());
    let generator = model_generator(MockModel::new(vec![reply.as_str()]), Duration::from_secs(5));

    let outcome = generator
        .generate("Notify sales on Slack for new orders", GenerateOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.method, GenerationMethod::ExternalModel);

    let graph = outcome.workflow;
    assert_eq!(graph.name, "Orders to Slack");
    assert!(!graph.active);
    assert!(graph.nodes[1].disabled);
    assert_eq!(graph.nodes[1].parameters["channel"], "#sales");
    assert_eq!(graph.nodes[1].parameters["text"], "Automated notification");
    assert_eq!(graph.connections["Incoming Order"].main.len(), 1);

    let value = serde_json::to_value(&graph).unwrap();
    assert!(value["nodes"][1].get("notes").is_none());
}

#[tokio::test]
async fn test_external_timeout_falls_back_to_rules() {
    let generator = model_generator(SlowModel, Duration::from_millis(50));

    let outcome = generator
        .generate(
            "Send an email when a new row is added to Google Sheets",
            GenerateOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(outcome.method, GenerationMethod::ExternalModelFallback);
    assert!(validate(&serde_json::to_value(&outcome.workflow).unwrap()).valid);
    assert_eq!(outcome.workflow.nodes[0].wire_type, "n8n-nodes-base.googleSheetsTrigger");
}

#[tokio::test]
async fn test_malformed_model_output_falls_back() {
    let generator = model_generator(
        MockModel::new(vec!["I'm sorry, I can only help with workflows."]),
        Duration::from_secs(5),
    );
    let outcome = generator
        .generate("post to slack", GenerateOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.method, GenerationMethod::ExternalModelFallback);
}

#[tokio::test]
async fn test_structurally_invalid_external_graph_falls_back() {
    let mut bad = external_workflow();
    bad["nodes"][0]["type"] = json!("n8n-nodes-base.httpRequest");
    let reply = bad.to_string();
    let generator = model_generator(MockModel::new(vec![reply.as_str()]), Duration::from_secs(5));

    let outcome = generator
        .generate("post to slack", GenerateOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.method, GenerationMethod::ExternalModelFallback);
    assert_eq!(trigger_count(&outcome.workflow), 1);
}

#[tokio::test]
async fn test_upstream_error_falls_back() {
    let generator = rules_generator().with_external(Arc::new(FailingProposer), Duration::from_secs(1));
    let outcome = generator
        .generate("Create a workflow that sends Slack notification every day at 9am", GenerateOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.method, GenerationMethod::ExternalModelFallback);
    assert_eq!(outcome.workflow.nodes[0].wire_type, "n8n-nodes-base.scheduleTrigger");
}

// ============================================================================
// HTTP API
// ============================================================================

async fn call(generator: Generator, request: Request<Body>) -> (StatusCode, Value) {
    let response = router(Arc::new(generator)).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_api_generate_success() {
    let body = json!({"prompt": "Build workflow to save form submissions to Google Sheets"}).to_string();
    let (status, body) = call(rules_generator(), post_json("/api/generate", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["method"], "rule-engine");
    assert_eq!(body["prompt"], "Build workflow to save form submissions to Google Sheets");
    assert_eq!(body["workflow"]["nodes"][0]["type"], "n8n-nodes-base.formTrigger");
    assert_eq!(body["workflow"]["active"], false);
}

#[tokio::test]
async fn test_api_generate_fan_out() {
    let body = json!({
        "prompt": "When a webhook receives data, post to Slack and Discord",
        "topology": "fan-out"
    })
    .to_string();
    let (status, body) = call(rules_generator(), post_json("/api/generate", &body)).await;

    assert_eq!(status, StatusCode::OK);
    let fan = body["workflow"]["connections"]["Webhook"]["main"][0].as_array().unwrap();
    assert_eq!(fan.len(), 2);
}

#[tokio::test]
async fn test_api_generate_rejects_bad_requests() {
    let (status, body) = call(rules_generator(), post_json("/api/generate", r#"{"prompt": "   "}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["category"], "validation");

    let (status, _) = call(rules_generator(), post_json("/api/generate", "{}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(rules_generator(), post_json("/api/generate", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["category"], "validation");

    let (status, _) = call(
        rules_generator(),
        post_json("/api/generate", r#"{"prompt": "post to slack", "topology": "star"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_api_health_reports_generator() {
    let (status, body) = call(rules_generator(), get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "model": "rule-engine"}));

    let generator = rules_generator().with_external(Arc::new(FailingProposer), Duration::from_secs(1));
    let (_, body) = call(generator, get("/api/health")).await;
    assert_eq!(body["model"], "failing");
}

#[tokio::test]
async fn test_api_examples_and_catalog() {
    let (status, body) = call(rules_generator(), get("/api/examples")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), EXAMPLE_PROMPTS.len());

    let (status, body) = call(rules_generator(), get("/api/catalog")).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), catalog().len());
    assert!(entries
        .iter()
        .any(|e| e["key"] == "sheets_trigger" && e["category"] == "trigger"));
}

#[tokio::test]
async fn test_api_validate_reports_violations() {
    let candidate = json!({
        "name": "broken",
        "nodes": [
            {"name": "Slack", "type": "n8n-nodes-base.slack", "position": [250, 300], "parameters": {}}
        ],
        "connections": {}
    });
    let (status, body) = call(rules_generator(), post_json("/api/validate", &candidate.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], false);
    let kinds: Vec<&str> = body["violations"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v["kind"].as_str())
        .collect();
    assert!(kinds.contains(&"too_few_nodes"));
    assert!(kinds.contains(&"missing_trigger"));
    assert_eq!(body["workflow"]["nodes"][0]["disabled"], true);
    assert_eq!(body["workflow"]["settings"], json!({}));
}

#[tokio::test]
async fn test_api_validate_accepts_external_workflow() {
    let (status, body) = call(
        rules_generator(),
        post_json("/api/validate", &external_workflow().to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["violations"], json!([]));
}
