// SPDX-License-Identifier: MIT

//! Default/credential resolution for candidate graphs
//!
//! Works on raw JSON so that externally proposed graphs can be repaired
//! before they are validated or deserialized. The pass only ever adds
//! missing values or switches credentialed nodes off, which makes it
//! idempotent: `resolve(resolve(g)) == resolve(g)`.

use serde_json::{Map, Value};

use crate::forge::catalog::catalog;

/// Merge descriptor defaults under existing parameters.
///
/// Keys present in `existing` always win; defaults only fill the gaps.
pub fn merge_defaults(defaults: &Map<String, Value>, existing: Map<String, Value>) -> Map<String, Value> {
    let mut merged = defaults.clone();
    merged.extend(existing);
    merged
}

/// Resolve a candidate graph, returning the repaired document.
pub fn resolve(mut candidate: Value) -> Value {
    resolve_in_place(&mut candidate);
    candidate
}

/// In-place variant of [`resolve`]. Non-object input is left untouched.
pub fn resolve_in_place(candidate: &mut Value) {
    let Some(graph) = candidate.as_object_mut() else {
        return;
    };

    if let Some(Value::Array(nodes)) = graph.get_mut("nodes") {
        for node in nodes.iter_mut().filter_map(Value::as_object_mut) {
            resolve_node(node);
        }
    }

    if matches!(graph.get("settings"), None | Some(Value::Null)) {
        graph.insert("settings".to_string(), Value::Object(Map::new()));
    }
    graph.insert("active".to_string(), Value::Bool(false));
}

fn resolve_node(node: &mut Map<String, Value>) {
    if matches!(node.get("parameters"), None | Some(Value::Null)) {
        node.insert("parameters".to_string(), Value::Object(Map::new()));
    }
    if !node.contains_key("typeVersion") {
        node.insert("typeVersion".to_string(), Value::from(1));
    }

    let Some(wire_type) = node.get("type").and_then(Value::as_str).map(str::to_string) else {
        return;
    };

    if let Some(desc) = catalog().by_wire_type(&wire_type) {
        if let Some(Value::Object(params)) = node.get_mut("parameters") {
            let existing = std::mem::take(params);
            *params = merge_defaults(&desc.default_parameters, existing);
        }
    }

    if catalog().requires_credential(&wire_type) {
        node.insert("disabled".to_string(), Value::Bool(true));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn external_graph() -> Value {
        json!({
            "name": "Slack alert",
            "nodes": [
                {
                    "name": "Webhook",
                    "type": "n8n-nodes-base.webhook",
                    "position": [250, 300],
                    "parameters": {"path": "orders"}
                },
                {
                    "name": "Slack",
                    "type": "n8n-nodes-base.slack",
                    "position": [450, 300],
                    "parameters": {"channel": "#sales"},
                    "disabled": false
                },
                {
                    "name": "Custom",
                    "type": "n8n-nodes-base.somethingNew",
                    "position": [650, 300],
                    "typeVersion": 3
                }
            ],
            "connections": {},
            "active": true
        })
    }

    #[test]
    fn test_merge_defaults_existing_wins() {
        let defaults = json!({"a": 1, "b": 2}).as_object().cloned().unwrap();
        let existing = json!({"b": 20, "c": 30}).as_object().cloned().unwrap();
        let merged = merge_defaults(&defaults, existing);
        assert_eq!(Value::Object(merged), json!({"a": 1, "b": 20, "c": 30}));
    }

    #[test]
    fn test_fills_missing_parameters_without_overwriting() {
        let resolved = resolve(external_graph());
        let slack = &resolved["nodes"][1]["parameters"];
        assert_eq!(slack["channel"], "#sales");
        assert_eq!(slack["text"], "Automated notification");
        assert_eq!(resolved["nodes"][0]["parameters"]["path"], "orders");
        assert_eq!(resolved["nodes"][0]["parameters"]["httpMethod"], "POST");
    }

    #[test]
    fn test_credentialed_nodes_are_forced_off() {
        let resolved = resolve(external_graph());
        assert_eq!(resolved["nodes"][1]["disabled"], true);
        assert!(resolved["nodes"][0].get("disabled").is_none());
    }

    #[test]
    fn test_unknown_types_only_get_structural_defaults() {
        let resolved = resolve(external_graph());
        let custom = &resolved["nodes"][2];
        assert_eq!(custom["parameters"], json!({}));
        assert_eq!(custom["typeVersion"], 3);
        assert_eq!(resolved["nodes"][0]["typeVersion"], 1);
    }

    #[test]
    fn test_uncatalogued_services_are_disabled() {
        let resolved = resolve(json!({
            "nodes": [
                {"name": "Mattermost", "type": "n8n-nodes-base.mattermost", "disabled": false},
                {"name": "No Op", "type": "n8n-nodes-base.noOp"},
                {"name": "Plugin", "type": "acme.mattermost"}
            ]
        }));
        assert_eq!(resolved["nodes"][0]["disabled"], true);
        assert!(resolved["nodes"][1].get("disabled").is_none());
        assert!(resolved["nodes"][2].get("disabled").is_none());
    }

    #[test]
    fn test_graph_level_defaults() {
        let resolved = resolve(external_graph());
        assert_eq!(resolved["active"], false);
        assert_eq!(resolved["settings"], json!({}));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let once = resolve(external_graph());
        let twice = resolve(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_non_object_input_is_untouched() {
        assert_eq!(resolve(json!([1, 2, 3])), json!([1, 2, 3]));
        assert_eq!(resolve(json!({"nodes": "oops"}))["nodes"], "oops");
    }
}
