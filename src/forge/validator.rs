// SPDX-License-Identifier: MIT

//! Structural validation of candidate graphs
//!
//! The validator is the gate every graph passes before it is handed out,
//! whether it came from the rule engine or an external generator. It works on
//! raw JSON so malformed documents produce a violation list instead of a
//! deserialization error.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;

use crate::forge::catalog::{catalog, WIRE_TYPE_PREFIX};

/// Fewest nodes a workflow may have
pub const MIN_NODES: usize = 2;
/// Most nodes a workflow may have
pub const MAX_NODES: usize = 15;

const REQUIRED_FIELDS: [&str; 5] = ["name", "nodes", "connections", "active", "settings"];
const REQUIRED_NODE_FIELDS: [&str; 4] = ["name", "type", "position", "parameters"];

/// A single broken structural invariant
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    #[error("workflow must be a JSON object")]
    NotAnObject,

    #[error("missing required field '{field}'")]
    MissingField { field: String },

    #[error("field '{field}' has the wrong type")]
    InvalidField { field: String },

    #[error("workflow must have at least {} nodes, found {count}", MIN_NODES)]
    TooFewNodes { count: usize },

    #[error("workflow must have at most {} nodes, found {count}", MAX_NODES)]
    TooManyNodes { count: usize },

    #[error("node {index} is missing '{field}'")]
    MissingNodeField { index: usize, field: String },

    #[error("node {index} has an invalid '{field}'")]
    InvalidNodeField { index: usize, field: String },

    #[error("node {index} position must be a pair of numbers")]
    InvalidPosition { index: usize },

    #[error("node {index} type '{wire_type}' is not in the {} namespace", WIRE_TYPE_PREFIX)]
    InvalidNodeType { index: usize, wire_type: String },

    #[error("node name '{name}' is used more than once")]
    DuplicateNodeName { name: String },

    #[error("workflow has no trigger node")]
    MissingTrigger,

    #[error("workflow has {count} trigger nodes, expected exactly one")]
    MultipleTriggers { count: usize },

    #[error("workflow with several nodes has no connections")]
    MissingConnections,

    #[error("connection source '{node}' is not a node")]
    UnknownConnectionSource { node: String },

    #[error("connection from '{from}' targets unknown node '{to}'")]
    UnknownConnectionTarget { from: String, to: String },

    #[error("node '{node}' connects to itself")]
    SelfLoop { node: String },

    #[error("connections of '{node}' are malformed")]
    InvalidConnection { node: String },

    #[error("node '{node}' is not reachable from the trigger")]
    UnreachableNode { node: String },

    #[error("workflow does not match the n8n document schema: {reason}")]
    Malformed { reason: String },
}

/// Outcome of validating one candidate graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            valid: violations.is_empty(),
            violations,
        }
    }

    /// Turn a failed report into its violations
    pub fn into_result(self) -> Result<(), Vec<Violation>> {
        if self.valid {
            Ok(())
        } else {
            Err(self.violations)
        }
    }
}

/// Validate a candidate graph and collect every violation found
pub fn validate(candidate: &Value) -> ValidationReport {
    let Some(graph) = candidate.as_object() else {
        return ValidationReport::from_violations(vec![Violation::NotAnObject]);
    };

    let mut violations = Vec::new();
    for field in REQUIRED_FIELDS {
        if !graph.contains_key(field) {
            violations.push(Violation::MissingField {
                field: field.to_string(),
            });
        }
    }

    let nodes: &[Value] = match graph.get("nodes") {
        Some(Value::Array(nodes)) => nodes.as_slice(),
        Some(_) => {
            violations.push(Violation::InvalidField {
                field: "nodes".to_string(),
            });
            &[]
        }
        None => &[],
    };

    if nodes.len() < MIN_NODES {
        violations.push(Violation::TooFewNodes { count: nodes.len() });
    } else if nodes.len() > MAX_NODES {
        violations.push(Violation::TooManyNodes { count: nodes.len() });
    }

    let names = check_nodes(nodes, &mut violations);

    let connections = match graph.get("connections") {
        Some(Value::Object(conns)) => Some(conns),
        Some(_) => {
            violations.push(Violation::InvalidField {
                field: "connections".to_string(),
            });
            None
        }
        None => None,
    };

    if let Some(conns) = connections {
        if nodes.len() > 1 && conns.is_empty() {
            violations.push(Violation::MissingConnections);
        }
        let edges = check_connections(conns, &names, &mut violations);
        check_reachability(&names, &edges, &mut violations);
    }

    ValidationReport::from_violations(violations)
}

/// Names of the valid nodes, in order, with trigger flags
struct NodeNames {
    ordered: Vec<String>,
    triggers: Vec<String>,
}

impl NodeNames {
    fn contains(&self, name: &str) -> bool {
        self.ordered.iter().any(|n| n == name)
    }
}

fn check_nodes(nodes: &[Value], violations: &mut Vec<Violation>) -> NodeNames {
    let mut seen = HashSet::new();
    let mut names = NodeNames {
        ordered: Vec::new(),
        triggers: Vec::new(),
    };

    for (index, node) in nodes.iter().enumerate() {
        let Some(node) = node.as_object() else {
            violations.push(Violation::InvalidNodeField {
                index,
                field: "node".to_string(),
            });
            continue;
        };

        for field in REQUIRED_NODE_FIELDS {
            if !node.contains_key(field) {
                violations.push(Violation::MissingNodeField {
                    index,
                    field: field.to_string(),
                });
            }
        }

        if node.get("position").is_some_and(|p| !is_position(p)) {
            violations.push(Violation::InvalidPosition { index });
        }
        if node.get("parameters").is_some_and(|p| !p.is_object()) {
            violations.push(Violation::InvalidNodeField {
                index,
                field: "parameters".to_string(),
            });
        }

        let wire_type = match node.get("type") {
            Some(Value::String(t)) if t.starts_with(WIRE_TYPE_PREFIX) => Some(t.as_str()),
            Some(other) => {
                violations.push(Violation::InvalidNodeType {
                    index,
                    wire_type: other.as_str().map_or_else(|| other.to_string(), str::to_string),
                });
                None
            }
            None => None,
        };

        match node.get("name") {
            Some(Value::String(name)) if !name.trim().is_empty() => {
                if !seen.insert(name.clone()) {
                    violations.push(Violation::DuplicateNodeName { name: name.clone() });
                    continue;
                }
                names.ordered.push(name.clone());
                if wire_type.is_some_and(|t| catalog().is_trigger_type(t)) {
                    names.triggers.push(name.clone());
                }
            }
            Some(_) => violations.push(Violation::InvalidNodeField {
                index,
                field: "name".to_string(),
            }),
            None => {}
        }
    }

    match names.triggers.len() {
        0 if !nodes.is_empty() => violations.push(Violation::MissingTrigger),
        0 | 1 => {}
        count => violations.push(Violation::MultipleTriggers { count }),
    }

    names
}

fn is_position(value: &Value) -> bool {
    matches!(value, Value::Array(pair) if pair.len() == 2 && pair.iter().all(Value::is_number))
}

/// Check every edge and return the adjacency of the well-formed ones
fn check_connections<'a>(
    connections: &'a Map<String, Value>,
    names: &NodeNames,
    violations: &mut Vec<Violation>,
) -> HashMap<&'a str, Vec<&'a str>> {
    let mut edges: HashMap<&str, Vec<&str>> = HashMap::new();

    for (source, outputs) in connections {
        if !names.contains(source) {
            violations.push(Violation::UnknownConnectionSource {
                node: source.clone(),
            });
            continue;
        }
        let Some(targets) = connection_targets(outputs) else {
            violations.push(Violation::InvalidConnection {
                node: source.clone(),
            });
            continue;
        };

        for target in targets {
            if target == source.as_str() {
                violations.push(Violation::SelfLoop { node: source.clone() });
            } else if !names.contains(target) {
                violations.push(Violation::UnknownConnectionTarget {
                    from: source.clone(),
                    to: target.to_string(),
                });
            } else {
                edges.entry(source.as_str()).or_default().push(target);
            }
        }
    }

    edges
}

/// Target node names of one `{ "main": ... }` entry, nested or flat
fn connection_targets(outputs: &Value) -> Option<Vec<&str>> {
    let main = outputs.get("main")?.as_array()?;
    let mut targets = Vec::new();
    for entry in main {
        match entry {
            Value::Array(port) => {
                for target in port {
                    targets.push(target.get("node")?.as_str()?);
                }
            }
            Value::Object(_) => targets.push(entry.get("node")?.as_str()?),
            _ => return None,
        }
    }
    Some(targets)
}

fn check_reachability(
    names: &NodeNames,
    edges: &HashMap<&str, Vec<&str>>,
    violations: &mut Vec<Violation>,
) {
    // Only meaningful once there is a single, unambiguous trigger.
    let [trigger] = names.triggers.as_slice() else {
        return;
    };

    let mut reached: HashSet<&str> = HashSet::from([trigger.as_str()]);
    let mut queue = VecDeque::from([trigger.as_str()]);
    while let Some(current) = queue.pop_front() {
        for &next in edges.get(current).into_iter().flatten() {
            if reached.insert(next) {
                queue.push_back(next);
            }
        }
    }

    for name in &names.ordered {
        if !reached.contains(name.as_str()) {
            violations.push(Violation::UnreachableNode { node: name.clone() });
        }
    }
}
