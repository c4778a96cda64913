// SPDX-License-Identifier: MIT

//! Proposer for a self-hosted inference service
//!
//! The service takes `POST {base}/generate` with `{"prompt": ...}` and
//! answers `{"success": true, "workflow": {...}}` or `{"error": "..."}`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{extract_graph_json, GraphProposer};
use crate::error::AdapterError;

#[derive(Debug, Deserialize)]
struct InferenceResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    workflow: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Graph proposer calling a local fine-tuned model server
pub struct LocalInferenceProposer {
    client: Client,
    base_url: String,
}

impl LocalInferenceProposer {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AdapterError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn into_candidate(response: InferenceResponse) -> Result<Value, AdapterError> {
        if !response.success {
            return Err(AdapterError::InvalidResponse(
                response
                    .error
                    .unwrap_or_else(|| "inference service reported failure".to_string()),
            ));
        }

        match response.workflow {
            Some(workflow @ Value::Object(_)) => Ok(workflow),
            // Some servers return the raw generated text instead of parsed JSON.
            Some(Value::String(text)) => extract_graph_json(&text),
            Some(_) | None => Err(AdapterError::InvalidResponse(
                "inference response has no workflow object".to_string(),
            )),
        }
    }
}

#[async_trait]
impl GraphProposer for LocalInferenceProposer {
    fn name(&self) -> &str {
        "local-inference"
    }

    async fn propose(&self, prompt: &str) -> Result<Value, AdapterError> {
        let url = format!("{}/generate", self.base_url);
        log::info!("Requesting workflow from local inference at {}", url);

        let resp = self
            .client
            .post(&url)
            .json(&json!({ "prompt": prompt }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AdapterError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response: InferenceResponse = resp
            .json()
            .await
            .map_err(|e| AdapterError::InvalidResponse(e.to_string()))?;
        Self::into_candidate(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(value: Value) -> Result<Value, AdapterError> {
        LocalInferenceProposer::into_candidate(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_successful_response() {
        let workflow = parse(json!({"success": true, "workflow": {"name": "local"}})).unwrap();
        assert_eq!(workflow["name"], "local");
    }

    #[test]
    fn test_workflow_as_text() {
        let workflow = parse(json!({
            "success": true,
            "workflow": "Generated: {\"name\": \"text\"}"
        }))
        .unwrap();
        assert_eq!(workflow["name"], "text");
    }

    #[test]
    fn test_error_response() {
        let err = parse(json!({"error": "Model not loaded"})).unwrap_err();
        match err {
            AdapterError::InvalidResponse(msg) => assert_eq!(msg, "Model not loaded"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_workflow() {
        assert!(matches!(
            parse(json!({"success": true})),
            Err(AdapterError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse(json!({"success": true, "workflow": [1, 2]})),
            Err(AdapterError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let proposer =
            LocalInferenceProposer::new("http://localhost:5001/", Duration::from_secs(1)).unwrap();
        assert_eq!(proposer.base_url, "http://localhost:5001");
    }
}
