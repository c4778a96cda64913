// SPDX-License-Identifier: MIT

//! Workflow graph model and rule-engine synthesis
//!
//! [`types`] is the n8n document model shared by every generation path;
//! [`synthesizer`] builds those documents from classifier keys.

pub mod synthesizer;
pub mod types;

pub use synthesizer::{synthesize, Topology};
pub use types::{
    workflow_name, ConnectionTarget, Connections, NodeConnections, Position, WorkflowGraph,
    WorkflowNode,
};
