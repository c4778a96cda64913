// SPDX-License-Identifier: MIT

//! flowforge-rs turns natural-language automation requests into importable
//! n8n workflow graphs.
//!
//! The rule engine ([`forge::classifier`] + [`forge::graph::synthesizer`]) is
//! always available. An optional external model ([`model`]) can propose
//! graphs too; whatever it returns goes through the same
//! [`forge::resolver`] and [`forge::validator`] gates, and the
//! [`forge::pipeline`] falls back to the rule engine when it fails.

pub mod error;
pub mod forge;
pub mod model;

pub use error::{AdapterError, FlowForgeError, Result};
