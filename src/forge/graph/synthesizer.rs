// SPDX-License-Identifier: MIT

//! Graph synthesis - turns an ordered key list into a positioned, wired graph

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use super::types::{
    workflow_name, ConnectionTarget, Connections, NodeConnections, Position, WorkflowGraph,
    WorkflowNode,
};
use crate::forge::catalog::{catalog, NodeDescriptor};

/// Canvas x of the first node
pub const ORIGIN_X: i64 = 250;
/// Horizontal distance between consecutive nodes
pub const STEP_X: i64 = 200;
/// Canvas y shared by every node
pub const ORIGIN_Y: i64 = 300;

/// How synthesized nodes are wired together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topology {
    /// Each node feeds the next one
    #[default]
    Linear,
    /// The trigger feeds every action from a single output
    FanOut,
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topology::Linear => write!(f, "linear"),
            Topology::FanOut => write!(f, "fan-out"),
        }
    }
}

impl FromStr for Topology {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" | "sequential" => Ok(Topology::Linear),
            "fan-out" | "fanout" | "parallel" => Ok(Topology::FanOut),
            other => Err(format!(
                "Unknown topology '{}', expected 'linear' or 'fan-out'",
                other
            )),
        }
    }
}

/// Build a workflow graph from catalog keys.
///
/// Keys without a catalog entry are logged and skipped; the validator
/// decides whether what remains is still a usable graph.
pub fn synthesize(prompt: &str, keys: &[String], topology: Topology) -> WorkflowGraph {
    let descriptors: Vec<&NodeDescriptor> = keys
        .iter()
        .filter_map(|key| match catalog().get(key) {
            Ok(desc) => Some(desc),
            Err(e) => {
                log::error!("Skipping node: {}", e);
                None
            }
        })
        .collect();

    let mut used = HashSet::new();
    let nodes: Vec<WorkflowNode> = descriptors
        .iter()
        .zip(0i64..)
        .map(|(desc, i)| WorkflowNode {
            name: unique_name(desc.display_name, &mut used),
            wire_type: desc.wire_type.clone(),
            position: Position::new(ORIGIN_X + i * STEP_X, ORIGIN_Y),
            parameters: desc.default_parameters.clone(),
            type_version: Number::from(1),
            disabled: desc.requires_credential,
        })
        .collect();

    let connections = match topology {
        Topology::Linear => wire_linear(&nodes),
        Topology::FanOut => wire_fan_out(&nodes),
    };

    log::debug!(
        "Synthesized {} node(s) with {} topology",
        nodes.len(),
        topology
    );

    WorkflowGraph {
        name: workflow_name(prompt),
        nodes,
        connections,
        active: false,
        settings: Map::new(),
    }
}

/// Display name, suffixed with " 2", " 3", ... when already taken
fn unique_name(display_name: &str, used: &mut HashSet<String>) -> String {
    let mut name = display_name.to_string();
    let mut n = 1;
    while used.contains(&name) {
        n += 1;
        name = format!("{} {}", display_name, n);
    }
    used.insert(name.clone());
    name
}

fn wire_linear(nodes: &[WorkflowNode]) -> Connections {
    nodes
        .windows(2)
        .map(|pair| {
            (
                pair[0].name.clone(),
                NodeConnections {
                    main: vec![vec![ConnectionTarget::main(pair[1].name.clone(), 0)]],
                },
            )
        })
        .collect()
}

fn wire_fan_out(nodes: &[WorkflowNode]) -> Connections {
    let mut connections = Connections::new();
    if let Some((source, targets)) = nodes.split_first() {
        if !targets.is_empty() {
            let fan = targets
                .iter()
                .map(|node| ConnectionTarget::main(node.name.clone(), 0))
                .collect();
            connections.insert(source.name.clone(), NodeConnections { main: vec![fan] });
        }
    }
    connections
}
