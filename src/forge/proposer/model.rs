// SPDX-License-Identifier: MIT

//! Chat-model proposer
//!
//! Prompts a chat completions model with the catalog and one worked example,
//! then extracts whatever JSON object the model answers with.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Write as _;
use std::sync::Arc;

use super::{extract_graph_json, GraphProposer, RuleEngineProposer};
use crate::error::AdapterError;
use crate::forge::catalog::{catalog, NodeCategory};
use crate::forge::graph::synthesizer::{ORIGIN_X, ORIGIN_Y, STEP_X};
use crate::model::{Content, GenerationConfig, Model};

const EXAMPLE_PROMPT: &str = "Send a Slack message when a webhook receives data";

/// Graph proposer backed by a chat model
pub struct ModelProposer {
    model: Arc<dyn Model>,
    config: GenerationConfig,
    system_prompt: String,
    example_answer: String,
}

impl ModelProposer {
    pub fn new(model: Arc<dyn Model>, config: GenerationConfig) -> Self {
        let example_answer = RuleEngineProposer::default()
            .propose_with(EXAMPLE_PROMPT, None)
            .map(|graph| graph.to_string())
            .unwrap_or_default();

        Self {
            model,
            config,
            system_prompt: system_prompt(),
            example_answer,
        }
    }

    fn history(&self, prompt: &str) -> Vec<Content> {
        let mut history = vec![Content::system(self.system_prompt.clone())];
        if !self.example_answer.is_empty() {
            history.push(Content::user(EXAMPLE_PROMPT));
            history.push(Content::model(self.example_answer.clone()));
        }
        history.push(Content::user(prompt));
        history
    }
}

#[async_trait]
impl GraphProposer for ModelProposer {
    fn name(&self) -> &str {
        self.model.name()
    }

    async fn propose(&self, prompt: &str) -> Result<Value, AdapterError> {
        log::info!("Requesting workflow from model {}", self.model.name());
        let reply = self
            .model
            .generate_content(&self.history(prompt), Some(&self.config))
            .await?;
        extract_graph_json(&reply.text_output())
    }
}

/// Instructions listing every catalog node type the model may use
fn system_prompt() -> String {
    let mut triggers = String::new();
    let mut actions = String::new();
    for desc in catalog().iter() {
        let list = if desc.category == NodeCategory::Trigger {
            &mut triggers
        } else {
            &mut actions
        };
        let _ = writeln!(list, "- {} ({})", desc.wire_type, desc.display_name);
    }

    format!(
        "You are an expert n8n workflow designer. Convert the user's automation request into a \
         single n8n workflow JSON object.\n\n\
         A workflow has \"name\", \"nodes\", \"connections\", \"active\" and \"settings\". Each node \
         has \"name\", \"type\", \"position\", \"parameters\" and \"typeVersion\".\n\n\
         TRIGGER NODE TYPES:\n{triggers}\n\
         ACTION NODE TYPES:\n{actions}\n\
         RULES:\n\
         1. Use exactly one trigger node, and make it the first node.\n\
         2. Position nodes left to right: the first at [{x}, {y}], then add {step} to x for each next node.\n\
         3. Give every node a short, unique, descriptive name.\n\
         4. Connect nodes as {{\"Source\": {{\"main\": [[{{\"node\": \"Target\", \"type\": \"main\", \"index\": 0}}]]}}}}.\n\
         5. Use typeVersion 1, \"active\": false and \"settings\": {{}}.\n\
         6. Use between 2 and 15 nodes.\n\
         7. Return ONLY the JSON object, no markdown or explanations.",
        triggers = triggers,
        actions = actions,
        x = ORIGIN_X,
        y = ORIGIN_Y,
        step = STEP_X,
    )
}
