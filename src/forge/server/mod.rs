// SPDX-License-Identifier: MIT

//! HTTP API
//!
//! | Method | Path            | Purpose                                   |
//! |--------|-----------------|-------------------------------------------|
//! | GET    | `/api/health`   | Liveness and active generator             |
//! | POST   | `/api/generate` | Prompt to workflow graph                  |
//! | GET    | `/api/examples` | Sample prompts                            |
//! | GET    | `/api/catalog`  | Node catalog listing                      |
//! | POST   | `/api/validate` | Resolve and validate any candidate graph  |

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::{FlowForgeError, Result};
use crate::forge::catalog::{catalog, NodeDescriptor};
use crate::forge::config::ServerConfig;
use crate::forge::graph::Topology;
use crate::forge::pipeline::{GenerateOptions, Generator};
use crate::forge::resolver::resolve;
use crate::forge::validator::validate;

/// Prompts offered to users who don't know where to start
pub const EXAMPLE_PROMPTS: &[&str] = &[
    "Send an email when a new row is added to Google Sheets",
    "Create a workflow that sends Slack notification every day at 9am",
    "Build workflow to save form submissions to Google Sheets",
    "Whenever I receive a customer support email, create a Zendesk ticket, send auto-response, and notify support team on Slack",
    "Monitor Google Sheets for new rows where sales > $5000, send Slack alert, SMS via Twilio, and log to another sheet",
    "When GitHub issue is created, create Trello card, notify team on Discord, send email to stakeholders",
    "Process webhook data, validate with custom function, store in MongoDB, send confirmation email",
    "Daily at 9am: fetch weather data, analyze trends, create report in Notion, share on Teams",
    "When Stripe payment succeeds, update customer in HubSpot, send thank-you email, create invoice in QuickBooks, and notify accounting on Slack",
    "When form submission received, validate data, save to database, send confirmation SMS, and create lead in CRM",
];

#[derive(Clone)]
struct AppState {
    generator: Arc<Generator>,
}

/// Build the API router around a shared generator
pub fn router(generator: Arc<Generator>) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/generate", post(generate))
        .route("/api/examples", get(list_examples))
        .route("/api/catalog", get(list_catalog))
        .route("/api/validate", post(validate_workflow))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { generator })
}

pub async fn serve(config: &ServerConfig, generator: Generator) -> Result<()> {
    let app = router(Arc::new(generator));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Error body shared by every failing endpoint
struct ApiError {
    status: StatusCode,
    body: Value,
}

impl From<FlowForgeError> for ApiError {
    fn from(err: FlowForgeError) -> Self {
        let status = match &err {
            FlowForgeError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let mut body = json!({
            "success": false,
            "error": err.to_string(),
            "category": err.category(),
        });
        if !err.violations().is_empty() {
            body["violations"] = json!(err.violations());
        }
        Self { status, body }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: json!({
                "success": false,
                "error": rejection.body_text(),
                "category": "validation",
            }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "model": state.generator.external_name().unwrap_or("rule-engine"),
    }))
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    #[serde(default)]
    prompt: String,
    #[serde(default)]
    topology: Option<Topology>,
}

async fn generate(
    State(state): State<AppState>,
    payload: std::result::Result<Json<GenerateRequest>, JsonRejection>,
) -> std::result::Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    let options = GenerateOptions {
        topology: request.topology,
        rules_only: false,
    };

    let outcome = state.generator.generate(&request.prompt, options).await?;
    Ok(Json(json!({
        "success": true,
        "workflow": outcome.workflow,
        "prompt": outcome.prompt,
        "method": outcome.method,
    })))
}

async fn list_examples() -> Json<&'static [&'static str]> {
    Json(EXAMPLE_PROMPTS)
}

async fn list_catalog() -> Json<Vec<&'static NodeDescriptor>> {
    Json(catalog().iter().collect())
}

async fn validate_workflow(
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> std::result::Result<Json<Value>, ApiError> {
    let Json(candidate) = payload?;
    let resolved = resolve(candidate);
    let report = validate(&resolved);
    Ok(Json(json!({
        "valid": report.valid,
        "violations": report.violations,
        "workflow": resolved,
    })))
}
