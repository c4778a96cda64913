// SPDX-License-Identifier: MIT

//! Generation pipeline - the fallback chain from prompt to final graph
//!
//! ```text
//! prompt ─┬─> external proposer (bounded by timeout) ─┐
//!         │                                           ├─> resolve ─> validate ─> WorkflowGraph
//!         └─> rule engine (on any external failure) ──┘
//! ```
//!
//! External failures of any kind (transport, timeout, garbage output, graphs
//! failing validation) are logged and recovered by the rule engine. Only a
//! rule-engine graph failing validation reaches the caller as an error.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AdapterError, FlowForgeError, Result};
use crate::forge::config::{AppConfig, ModelConfig, ModelProvider};
use crate::forge::graph::{workflow_name, Topology, WorkflowGraph};
use crate::forge::proposer::{GraphProposer, LocalInferenceProposer, ModelProposer, RuleEngineProposer};
use crate::forge::resolver::resolve;
use crate::forge::validator::{validate, Violation};
use crate::model::openai::OpenAIModel;

/// Timeout applied to the external proposer unless configured otherwise
pub const DEFAULT_EXTERNAL_TIMEOUT: Duration = Duration::from_secs(20);

/// Which path produced the returned graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GenerationMethod {
    #[serde(rename = "rule-engine")]
    RuleEngine,
    #[serde(rename = "external-model")]
    ExternalModel,
    #[serde(rename = "external-model-fallback")]
    ExternalModelFallback,
}

impl fmt::Display for GenerationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GenerationMethod::RuleEngine => "rule-engine",
            GenerationMethod::ExternalModel => "external-model",
            GenerationMethod::ExternalModelFallback => "external-model-fallback",
        };
        write!(f, "{}", s)
    }
}

/// Per-request knobs
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateOptions {
    /// Override the configured rule-engine topology
    pub topology: Option<Topology>,
    /// Skip the external proposer entirely
    pub rules_only: bool,
}

/// A validated graph and how it was made
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    pub prompt: String,
    pub workflow: WorkflowGraph,
    pub method: GenerationMethod,
}

/// Reject missing or blank prompts; returns the trimmed prompt
pub fn validate_prompt(prompt: &str) -> Result<&str> {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return Err(FlowForgeError::validation("Prompt is required"));
    }
    Ok(trimmed)
}

/// Resolve and validate a candidate, then parse it into a typed graph.
///
/// A missing or blank `name` is filled from the prompt before validation.
pub fn finalize(candidate: Value, prompt: &str) -> std::result::Result<WorkflowGraph, Vec<Violation>> {
    let mut candidate = candidate;
    if let Some(graph) = candidate.as_object_mut() {
        let has_name = graph
            .get("name")
            .and_then(Value::as_str)
            .is_some_and(|name| !name.trim().is_empty());
        if !has_name {
            graph.insert("name".to_string(), Value::String(workflow_name(prompt)));
        }
    }

    let resolved = resolve(candidate);
    validate(&resolved).into_result()?;

    serde_json::from_value(resolved).map_err(|e| {
        vec![Violation::Malformed {
            reason: e.to_string(),
        }]
    })
}

/// Turns prompts into workflow graphs
pub struct Generator {
    rules: RuleEngineProposer,
    external: Option<Arc<dyn GraphProposer>>,
    timeout: Duration,
}

impl Generator {
    /// Rule-engine-only generator
    pub fn new(rules: RuleEngineProposer) -> Self {
        Self {
            rules,
            external: None,
            timeout: DEFAULT_EXTERNAL_TIMEOUT,
        }
    }

    /// Try `proposer` first, giving it at most `timeout`
    pub fn with_external(mut self, proposer: Arc<dyn GraphProposer>, timeout: Duration) -> Self {
        self.external = Some(proposer);
        self.timeout = timeout;
        self
    }

    /// Build from config, reading API keys from the process environment
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::from_config_with(config, |key| std::env::var(key).ok())
    }

    /// Build from config with an explicit environment lookup.
    ///
    /// A missing API key is not fatal: the generator runs on rules only.
    pub fn from_config_with<F>(config: &AppConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let rules = RuleEngineProposer::new(config.synthesis.classifier(), config.synthesis.topology);
        let generator = Self::new(rules);

        let Some(model) = &config.model else {
            log::info!("No external generator configured, using the rule engine only");
            return Ok(generator);
        };

        match external_proposer(model, &lookup) {
            Ok(proposer) => {
                log::info!(
                    "External generator: {} ({}), timeout {}s",
                    proposer.name(),
                    model.provider,
                    model.timeout_secs
                );
                Ok(generator.with_external(proposer, model.timeout()))
            }
            Err(AdapterError::ApiKeyMissing(msg)) => {
                log::warn!("{}; using the rule engine only", msg);
                Ok(generator)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Name of the external proposer, if one is configured
    pub fn external_name(&self) -> Option<&str> {
        self.external.as_deref().map(|p| p.name())
    }

    /// Generate a validated graph for `prompt`
    pub async fn generate(&self, prompt: &str, options: GenerateOptions) -> Result<GenerationOutcome> {
        let prompt = validate_prompt(prompt)?;

        let mut method = GenerationMethod::RuleEngine;
        if let Some(external) = self.external.as_ref().filter(|_| !options.rules_only) {
            match self.propose_external(&**external, prompt).await {
                Ok(workflow) => {
                    log::info!(
                        "Generated {} node workflow with {}",
                        workflow.nodes.len(),
                        external.name()
                    );
                    return Ok(GenerationOutcome {
                        prompt: prompt.to_string(),
                        workflow,
                        method: GenerationMethod::ExternalModel,
                    });
                }
                Err(e) => {
                    log::warn!(
                        "External generator {} failed, falling back to rule engine: {}",
                        external.name(),
                        e
                    );
                    method = GenerationMethod::ExternalModelFallback;
                }
            }
        }

        let candidate = self.rules.propose_with(prompt, options.topology)?;
        let workflow = finalize(candidate, prompt).map_err(|violations| {
            log::error!("Rule engine produced an invalid workflow: {:?}", violations);
            FlowForgeError::GraphStructure { violations }
        })?;

        log::info!(
            "Generated {} node workflow with the rule engine ({})",
            workflow.nodes.len(),
            method
        );
        Ok(GenerationOutcome {
            prompt: prompt.to_string(),
            workflow,
            method,
        })
    }

    async fn propose_external(
        &self,
        external: &dyn GraphProposer,
        prompt: &str,
    ) -> std::result::Result<WorkflowGraph, AdapterError> {
        let candidate = tokio::time::timeout(self.timeout, external.propose(prompt))
            .await
            .map_err(|_| AdapterError::Timeout {
                after: self.timeout,
            })??;
        finalize(candidate, prompt).map_err(|violations| AdapterError::Rejected { violations })
    }
}

fn external_proposer<F>(
    model: &ModelConfig,
    lookup: &F,
) -> std::result::Result<Arc<dyn GraphProposer>, AdapterError>
where
    F: Fn(&str) -> Option<String>,
{
    match model.provider {
        ModelProvider::OpenAI => {
            let api_key = lookup(&model.api_key_env)
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| AdapterError::ApiKeyMissing(format!("{} is not set", model.api_key_env)))?;
            let chat = OpenAIModel::new(
                model.model_name.clone(),
                api_key,
                model.base_url(),
                model.timeout(),
            )?;
            Ok(Arc::new(ModelProposer::new(
                Arc::new(chat),
                model.generation_config(),
            )))
        }
        ModelProvider::Local => Ok(Arc::new(LocalInferenceProposer::new(
            model.base_url(),
            model.timeout(),
        )?)),
    }
}
