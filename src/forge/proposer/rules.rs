// SPDX-License-Identifier: MIT

//! Rule engine proposer - classifier followed by synthesizer

use async_trait::async_trait;
use serde_json::Value;

use super::GraphProposer;
use crate::error::AdapterError;
use crate::forge::classifier::{Classification, IntentClassifier};
use crate::forge::graph::{synthesize, Topology, WorkflowGraph};

/// Deterministic, offline graph proposer
#[derive(Debug, Clone, Default)]
pub struct RuleEngineProposer {
    classifier: IntentClassifier,
    topology: Topology,
}

impl RuleEngineProposer {
    pub fn new(classifier: IntentClassifier, topology: Topology) -> Self {
        Self {
            classifier,
            topology,
        }
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Classify and synthesize, overriding the default topology if asked
    pub fn build(&self, prompt: &str, topology: Option<Topology>) -> (Classification, WorkflowGraph) {
        let classification = self.classifier.classify(prompt);
        let graph = synthesize(
            prompt,
            &classification.keys(),
            topology.unwrap_or(self.topology),
        );
        (classification, graph)
    }

    /// Candidate JSON for a prompt with an explicit topology
    pub fn propose_with(&self, prompt: &str, topology: Option<Topology>) -> Result<Value, AdapterError> {
        let (_, graph) = self.build(prompt, topology);
        serde_json::to_value(graph).map_err(|e| AdapterError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl GraphProposer for RuleEngineProposer {
    fn name(&self) -> &str {
        "rule-engine"
    }

    async fn propose(&self, prompt: &str) -> Result<Value, AdapterError> {
        self.propose_with(prompt, None)
    }
}
