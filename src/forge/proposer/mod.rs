// SPDX-License-Identifier: MIT

//! Graph proposers - interchangeable sources of candidate graphs
//!
//! Every proposer returns raw JSON. Nothing a proposer returns is trusted:
//! the pipeline resolves and validates each candidate the same way,
//! regardless of where it came from.

pub mod local;
pub mod model;
pub mod rules;

pub use local::LocalInferenceProposer;
pub use model::ModelProposer;
pub use rules::RuleEngineProposer;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AdapterError;

/// Something that can turn a prompt into a candidate workflow graph
#[async_trait]
pub trait GraphProposer: Send + Sync {
    /// Short label used in logs and the health endpoint
    fn name(&self) -> &str;

    async fn propose(&self, prompt: &str) -> Result<Value, AdapterError>;
}

/// Strip markdown code fences a model may wrap around its answer
fn extract_json_block(text: &str) -> &str {
    let trimmed = text.trim();

    if let Some(start) = trimmed.find("```json") {
        let json_start = start + "```json".len();
        if let Some(end) = trimmed[json_start..].find("```") {
            return trimmed[json_start..json_start + end].trim();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let json_start = start + 3;
        if let Some(end) = trimmed[json_start..].find("```") {
            return trimmed[json_start..json_start + end].trim();
        }
    }

    trimmed
}

/// Pull a JSON object out of free-form model output.
///
/// Takes the fenced block if there is one, then everything between the first
/// `{` and the last `}`, so chatty preambles and trailers are ignored.
pub fn extract_graph_json(text: &str) -> Result<Value, AdapterError> {
    let block = extract_json_block(text);
    let (Some(start), Some(end)) = (block.find('{'), block.rfind('}')) else {
        return Err(AdapterError::InvalidResponse(
            "no JSON object in model output".to_string(),
        ));
    };
    if end < start {
        return Err(AdapterError::InvalidResponse(
            "no JSON object in model output".to_string(),
        ));
    }

    let value: Value = serde_json::from_str(&block[start..=end])
        .map_err(|e| AdapterError::InvalidResponse(format!("model output is not valid JSON: {}", e)))?;

    if value.is_object() {
        Ok(value)
    } else {
        Err(AdapterError::InvalidResponse(
            "model output is not a JSON object".to_string(),
        ))
    }
}
