// SPDX-License-Identifier: MIT

//! Folding result fragments into the shared knowledge graph
//!
//! A result fragment is an opaque JSON tree; nodes and edges are pulled
//! out at the standard paths, deduplicated, repaired, and upserted.
//! Folding is idempotent: the same fragment folded twice leaves the same
//! graph state.

use crate::engine::query::JsonPath;
use crate::ops::capability::GraphStore;
use crate::ops::error::EngineError;
use once_cell::sync::Lazy;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

pub const NODES_PATH: &str = "$.[*].result_list.[*].[*].result_graph.node_list.[*]";
pub const EDGES_PATH: &str = "$.[*].result_list.[*].[*].result_graph.edge_list.[*]";

static NODES: Lazy<JsonPath> =
    Lazy::new(|| JsonPath::parse(NODES_PATH).expect("node extraction path"));
static EDGES: Lazy<JsonPath> =
    Lazy::new(|| JsonPath::parse(EDGES_PATH).expect("edge extraction path"));

/// Build a result fragment in the standard shape
pub fn kgs(nodes: Vec<Value>, edges: Vec<Value>) -> Value {
    json!([
        {
            "result_list": [
                {
                    "result_graph": {
                        "node_list": nodes,
                        "edge_list": edges,
                    }
                }
            ]
        }
    ])
}

/// Extract nodes at the standard path, merging same-id occurrences.
/// Later keys overwrite earlier ones; first-seen order is kept.
pub fn extract_nodes(fragment: &Value) -> Vec<Map<String, Value>> {
    let mut order: Vec<String> = Vec::new();
    let mut merged: HashMap<String, Map<String, Value>> = HashMap::new();

    for value in NODES.select(fragment) {
        let node = match value.as_object() {
            Some(map) => map.clone(),
            None => continue,
        };
        let id = match node.get("id") {
            Some(id) => id_key(id),
            None => continue,
        };
        match merged.get_mut(&id) {
            Some(existing) => {
                for (k, v) in node {
                    existing.insert(k, v);
                }
            }
            None => {
                order.push(id.clone());
                merged.insert(id, node);
            }
        }
    }

    order
        .into_iter()
        .map(|id| merged.remove(&id).expect("ordered id"))
        .collect()
}

/// Extract edges at the standard path
pub fn extract_edges(fragment: &Value) -> Vec<Map<String, Value>> {
    EDGES
        .select(fragment)
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect()
}

/// Fold a fragment into the shared graph
pub async fn fold(fragment: &Value, graph: &dyn GraphStore) -> Result<(), EngineError> {
    let raw_nodes = extract_nodes(fragment);
    let mut edges = extract_edges(fragment);

    // Upstream services sometimes renumber node ids to integers while the
    // curie survives in `name`. Promote such curies back into `id` and
    // rewrite edge endpoints accordingly; a node whose id stays numeric is
    // ambiguous and does not reach the graph.
    let mut promoted: HashMap<String, String> = HashMap::new();
    let mut dropped: Vec<String> = Vec::new();
    let mut nodes = Vec::new();
    for mut node in raw_nodes {
        let id = node.get("id").map(id_key).unwrap_or_default();
        if is_numeric_id(&id) {
            match node.get("name").and_then(Value::as_str) {
                Some(name) if name.contains(':') => {
                    promoted.insert(id, name.to_string());
                    node.insert("id".to_string(), json!(name));
                }
                _ => {
                    log::debug!("dropping ambiguous node with numeric id {id}");
                    dropped.push(id);
                    continue;
                }
            }
        }
        nodes.push(node);
    }

    edges.retain(|edge| {
        !["source_id", "target_id"]
            .iter()
            .any(|endpoint| dropped.contains(&edge.get(*endpoint).map(id_key).unwrap_or_default()))
    });
    for edge in &mut edges {
        for endpoint in ["source_id", "target_id"] {
            let id = edge.get(endpoint).map(id_key).unwrap_or_default();
            if let Some(curie) = promoted.get(&id) {
                edge.insert(endpoint.to_string(), json!(curie));
            }
        }
    }

    for node in &nodes {
        let label = node
            .get("type")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .unwrap_or("thing");
        graph.upsert_node(label, node).await?;
    }

    for edge in &edges {
        let subject = edge.get("source_id").map(id_key).unwrap_or_default();
        let object = edge.get("target_id").map(id_key).unwrap_or_default();
        let predicate = edge
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("related_to");
        if subject.is_empty() || object.is_empty() {
            log::debug!("dropping edge without endpoints: {edge:?}");
            continue;
        }
        graph.upsert_edge(&subject, predicate, &object, edge).await?;
    }
    Ok(())
}

/// Ids are opaque strings; numbers stringify
fn id_key(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_numeric_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_digit())
}
