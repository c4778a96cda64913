//! Workflow graph type definitions
//!
//! These types mirror the n8n workflow import format. A [`WorkflowGraph`]
//! serializes to exactly the JSON document n8n expects, and parsing accepts
//! the slightly looser shapes external generators tend to produce.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeTuple, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Connections keyed by source node name
pub type Connections = BTreeMap<String, NodeConnections>;

/// A complete n8n workflow document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowGraph {
    /// Workflow name (the prompt, truncated)
    pub name: String,
    /// Nodes in left-to-right layout order
    pub nodes: Vec<WorkflowNode>,
    /// Outgoing edges of each node
    #[serde(default)]
    pub connections: Connections,
    /// Generated workflows are never active on import
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub settings: Map<String, Value>,
}

/// A single n8n node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
    /// Unique name within the workflow
    pub name: String,
    /// n8n node type, e.g. `n8n-nodes-base.slack`
    #[serde(rename = "type")]
    pub wire_type: String,
    pub position: Position,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(rename = "typeVersion", default = "default_type_version")]
    pub type_version: Number,
    /// Nodes needing credentials are imported disabled
    #[serde(default)]
    pub disabled: bool,
}

fn default_type_version() -> Number {
    Number::from(1)
}

/// Canvas position, serialized as `[x, y]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

impl Position {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.x)?;
        tuple.serialize_element(&self.y)?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Generators sometimes emit fractional coordinates; n8n rounds them too.
        let [x, y] = <[f64; 2]>::deserialize(deserializer)?;
        if !x.is_finite() || !y.is_finite() {
            return Err(de::Error::custom("position coordinates must be finite"));
        }
        Ok(Self {
            x: x.round() as i64,
            y: y.round() as i64,
        })
    }
}

/// Outgoing edges of one node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeConnections {
    /// One entry per output port of the source node, each listing its targets
    #[serde(default, deserialize_with = "deserialize_main")]
    pub main: Vec<Vec<ConnectionTarget>>,
}

impl NodeConnections {
    /// Iterate over every target regardless of output port
    pub fn targets(&self) -> impl Iterator<Item = &ConnectionTarget> {
        self.main.iter().flatten()
    }
}

/// Edge endpoint: the target node's name and its input port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionTarget {
    pub node: String,
    #[serde(rename = "type", default = "default_connection_type")]
    pub kind: String,
    #[serde(default)]
    pub index: u32,
}

impl ConnectionTarget {
    pub fn main(node: impl Into<String>, index: u32) -> Self {
        Self {
            node: node.into(),
            kind: default_connection_type(),
            index,
        }
    }
}

fn default_connection_type() -> String {
    "main".to_string()
}

/// Output ports as written by n8n (nested) or by sloppier generators (flat)
#[derive(Deserialize)]
#[serde(untagged)]
enum MainOutputs {
    Nested(Vec<Vec<ConnectionTarget>>),
    Flat(Vec<ConnectionTarget>),
}

fn deserialize_main<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<Vec<ConnectionTarget>>, D::Error> {
    Ok(match MainOutputs::deserialize(deserializer)? {
        MainOutputs::Nested(ports) => ports,
        MainOutputs::Flat(targets) if targets.is_empty() => Vec::new(),
        MainOutputs::Flat(targets) => vec![targets],
    })
}

/// Truncate a prompt to the 50-character workflow name limit
pub fn workflow_name(prompt: &str) -> String {
    prompt.trim().chars().take(WORKFLOW_NAME_LIMIT).collect()
}

/// Maximum length, in characters, of a generated workflow name
pub const WORKFLOW_NAME_LIMIT: usize = 50;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_graph() -> WorkflowGraph {
        let mut connections = Connections::new();
        connections.insert(
            "Webhook".to_string(),
            NodeConnections {
                main: vec![vec![ConnectionTarget::main("Slack", 0)]],
            },
        );
        WorkflowGraph {
            name: "Post to Slack".to_string(),
            nodes: vec![
                WorkflowNode {
                    name: "Webhook".to_string(),
                    wire_type: "n8n-nodes-base.webhook".to_string(),
                    position: Position::new(250, 300),
                    parameters: Map::new(),
                    type_version: Number::from(1),
                    disabled: false,
                },
                WorkflowNode {
                    name: "Slack".to_string(),
                    wire_type: "n8n-nodes-base.slack".to_string(),
                    position: Position::new(450, 300),
                    parameters: json!({"channel": "#general"}).as_object().cloned().unwrap(),
                    type_version: Number::from(1),
                    disabled: true,
                },
            ],
            connections,
            active: false,
            settings: Map::new(),
        }
    }

    #[test]
    fn test_serializes_to_n8n_shape() {
        let value = serde_json::to_value(sample_graph()).unwrap();
        assert_eq!(value["nodes"][0]["type"], "n8n-nodes-base.webhook");
        assert_eq!(value["nodes"][0]["position"], json!([250, 300]));
        assert_eq!(value["nodes"][1]["typeVersion"], 1);
        assert_eq!(
            value["connections"]["Webhook"]["main"][0][0],
            json!({"node": "Slack", "type": "main", "index": 0})
        );
        assert_eq!(value["active"], false);
        assert_eq!(value["settings"], json!({}));
    }

    #[test]
    fn test_round_trip_is_structurally_equal() {
        let graph = sample_graph();
        let text = serde_json::to_string(&graph).unwrap();
        let parsed: WorkflowGraph = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, graph);
    }

    #[test]
    fn test_fractional_position_is_rounded() {
        let pos: Position = serde_json::from_value(json!([250.4, 299.6])).unwrap();
        assert_eq!(pos, Position::new(250, 300));
    }

    #[test]
    fn test_position_requires_two_numbers() {
        assert!(serde_json::from_value::<Position>(json!([250])).is_err());
        assert!(serde_json::from_value::<Position>(json!(["a", "b"])).is_err());
    }

    #[test]
    fn test_flat_connections_are_normalized() {
        let conns: NodeConnections = serde_json::from_value(json!({
            "main": [{"node": "Slack", "type": "main", "index": 0}]
        }))
        .unwrap();
        assert_eq!(conns.main, vec![vec![ConnectionTarget::main("Slack", 0)]]);
    }

    #[test]
    fn test_connection_target_defaults() {
        let target: ConnectionTarget = serde_json::from_value(json!({"node": "Gmail"})).unwrap();
        assert_eq!(target.kind, "main");
        assert_eq!(target.index, 0);
    }

    #[test]
    fn test_external_type_version_is_preserved() {
        let node: WorkflowNode = serde_json::from_value(json!({
            "name": "HTTP Request",
            "type": "n8n-nodes-base.httpRequest",
            "position": [450, 300],
            "parameters": {},
            "typeVersion": 4.2
        }))
        .unwrap();
        assert_eq!(node.type_version.as_f64(), Some(4.2));
        assert!(!node.disabled);
    }

    #[test]
    fn test_workflow_name_truncates_on_characters() {
        let prompt = "é".repeat(80);
        assert_eq!(workflow_name(&prompt).chars().count(), 50);
        assert_eq!(workflow_name("  short  "), "short");
    }
}
