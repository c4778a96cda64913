// SPDX-License-Identifier: MIT

//! Typed error handling for flowforge-rs
//!
//! Every failure the generator can surface goes through [`FlowForgeError`].
//! Failures of the external generation path are [`AdapterError`]s; those are
//! normally recovered by falling back to the rule engine and only reach a
//! caller when no fallback is left.

use std::time::Duration;
use thiserror::Error;

use crate::forge::validator::Violation;

/// Top-level error type for flowforge-rs
#[derive(Debug, Error)]
pub enum FlowForgeError {
    /// Missing/empty prompt or an otherwise unusable request
    #[error("Validation error: {0}")]
    Validation(String),

    /// The final candidate graph failed structural validation
    #[error("Generated workflow failed validation: {}", join_violations(.violations))]
    GraphStructure { violations: Vec<Violation> },

    /// A classifier key has no descriptor in the node catalog
    #[error("Node key '{key}' not found in catalog")]
    CatalogLookup { key: String },

    /// External generation adapter failures
    #[error("External generator error: {0}")]
    Adapter(#[from] AdapterError),

    /// Configuration errors (bad YAML values, invalid URLs, missing keys)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Generic error wrapper
    #[error("{0}")]
    Other(String),
}

/// Errors raised by an external graph generator
#[derive(Debug, Error)]
pub enum AdapterError {
    /// API key not configured
    #[error("API key not configured: {0}")]
    ApiKeyMissing(String),

    /// The generator did not answer in time
    #[error("Generator timed out after {after:?}")]
    Timeout { after: Duration },

    /// Non-success HTTP status from the generator
    #[error("Generator returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response could not be turned into a candidate graph
    #[error("Invalid response from generator: {0}")]
    InvalidResponse(String),

    /// The candidate graph failed resolution/validation
    #[error("Candidate graph rejected: {}", join_violations(.violations))]
    Rejected { violations: Vec<Violation> },

    /// Transport errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl FlowForgeError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a catalog lookup error
    pub fn catalog_lookup(key: impl Into<String>) -> Self {
        Self::CatalogLookup { key: key.into() }
    }

    /// Machine-readable category reported to API callers
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::GraphStructure { .. } => "graph_structure",
            Self::Adapter(_) => "external_generator",
            Self::Config(_) => "config",
            _ => "internal",
        }
    }

    /// Violations carried by the error, if any
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::GraphStructure { violations } => violations,
            Self::Adapter(AdapterError::Rejected { violations }) => violations,
            _ => &[],
        }
    }
}

impl From<String> for FlowForgeError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for FlowForgeError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, FlowForgeError>;
