// SPDX-License-Identifier: MIT

//! Shared knowledge-graph capability
//!
//! Every job's result fragment is folded into one labelled property graph
//! through this interface. Upserts are match-or-create: at most one node per
//! `id`, at most one edge per `(subject, predicate, object, properties)`
//! triple, so concurrent completions may interleave writes safely.

use crate::ops::error::EngineError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Match-or-create a node; `props` must carry an `id`
    async fn upsert_node(&self, label: &str, props: &Map<String, Value>)
        -> Result<(), EngineError>;

    /// Match-or-create an edge between two node ids
    async fn upsert_edge(
        &self,
        subject: &str,
        predicate: &str,
        object: &str,
        props: &Map<String, Value>,
    ) -> Result<(), EngineError>;

    /// Evaluate a property query, returning one value per matching row
    async fn query(&self, text: &str) -> Result<Vec<Value>, EngineError>;

    /// Drop every node and edge
    async fn delete_all(&self) -> Result<(), EngineError>;
}

#[derive(Debug, Clone)]
struct StoredNode {
    label: String,
    props: Map<String, Value>,
}

#[derive(Default)]
struct GraphData {
    /// node id -> node
    nodes: HashMap<String, StoredNode>,
    /// (subject, predicate, object, canonical props) -> edge props
    edges: HashMap<(String, String, String, String), Map<String, Value>>,
}

/// In-process graph store backing tests and embedded runs
#[derive(Clone, Default)]
pub struct MemoryGraphStore {
    data: Arc<RwLock<GraphData>>,
}

static PROPERTY_QUERY: Lazy<Regex> = Lazy::new(|| {
    // The shape emitted by the assertion-rule translator:
    //   match (obj{ type:'disease',id:'X' }) return obj.id
    Regex::new(r"^match \(obj\{ (?P<props>[^}]*) \}\) return obj\.(?P<field>[A-Za-z0-9_]+)$")
        .expect("property query pattern")
});

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn node_count(&self) -> usize {
        self.data.read().await.nodes.len()
    }

    pub async fn edge_count(&self) -> usize {
        self.data.read().await.edges.len()
    }

    pub async fn node(&self, id: &str) -> Option<Map<String, Value>> {
        self.data.read().await.nodes.get(id).map(|n| n.props.clone())
    }

    pub async fn node_label(&self, id: &str) -> Option<String> {
        self.data.read().await.nodes.get(id).map(|n| n.label.clone())
    }

    fn parse_constraints(text: &str) -> Result<Vec<(String, String)>, EngineError> {
        let mut constraints = Vec::new();
        for pair in text.split(',') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            let (key, raw) = pair
                .split_once(':')
                .ok_or_else(|| EngineError::capability(format!("bad query constraint: {pair}")))?;
            let value = raw.trim().trim_matches('\'');
            constraints.push((key.trim().to_string(), value.to_string()));
        }
        Ok(constraints)
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn upsert_node(
        &self,
        label: &str,
        props: &Map<String, Value>,
    ) -> Result<(), EngineError> {
        let id = match props.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => return Err(EngineError::capability("node props missing 'id'")),
        };
        let mut data = self.data.write().await;
        match data.nodes.get_mut(&id) {
            Some(existing) => {
                // Merge attributes; later writes win per key.
                for (k, v) in props {
                    existing.props.insert(k.clone(), v.clone());
                }
                existing.label = label.to_string();
            }
            None => {
                data.nodes.insert(
                    id,
                    StoredNode {
                        label: label.to_string(),
                        props: props.clone(),
                    },
                );
            }
        }
        Ok(())
    }

    async fn upsert_edge(
        &self,
        subject: &str,
        predicate: &str,
        object: &str,
        props: &Map<String, Value>,
    ) -> Result<(), EngineError> {
        let canonical = serde_json::to_string(&Value::Object(props.clone()))?;
        let key = (
            subject.to_string(),
            predicate.to_string(),
            object.to_string(),
            canonical,
        );
        self.data.write().await.edges.insert(key, props.clone());
        Ok(())
    }

    async fn query(&self, text: &str) -> Result<Vec<Value>, EngineError> {
        let caps = PROPERTY_QUERY
            .captures(text.trim())
            .ok_or_else(|| EngineError::capability(format!("unsupported graph query: {text}")))?;
        let constraints = Self::parse_constraints(&caps["props"])?;
        let field = &caps["field"];

        let data = self.data.read().await;
        let mut rows = Vec::new();
        for node in data.nodes.values() {
            let matches = constraints.iter().all(|(k, expect)| {
                node.props
                    .get(k)
                    .map(|v| match v {
                        Value::String(s) => s == expect,
                        other => other.to_string() == *expect,
                    })
                    .unwrap_or(false)
            });
            if matches {
                if let Some(v) = node.props.get(field) {
                    rows.push(v.clone());
                }
            }
        }
        // Stable output regardless of map iteration order.
        rows.sort_by_key(|v| v.to_string());
        Ok(rows)
    }

    async fn delete_all(&self) -> Result<(), EngineError> {
        let mut data = self.data.write().await;
        data.nodes.clear();
        data.edges.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn test_upsert_node_is_idempotent() {
        let graph = MemoryGraphStore::new();
        let node = props(json!({"id": "MONDO:1", "type": "disease", "name": "x"}));

        graph.upsert_node("disease", &node).await.unwrap();
        graph.upsert_node("disease", &node).await.unwrap();

        assert_eq!(graph.node_count().await, 1);
        assert_eq!(graph.node_label("MONDO:1").await.unwrap(), "disease");
    }

    #[tokio::test]
    async fn test_upsert_node_merges_props() {
        let graph = MemoryGraphStore::new();
        graph
            .upsert_node("disease", &props(json!({"id": "MONDO:1", "name": "a"})))
            .await
            .unwrap();
        graph
            .upsert_node(
                "disease",
                &props(json!({"id": "MONDO:1", "description": "d"})),
            )
            .await
            .unwrap();

        let merged = graph.node("MONDO:1").await.unwrap();
        assert_eq!(merged.get("name"), Some(&json!("a")));
        assert_eq!(merged.get("description"), Some(&json!("d")));
    }

    #[tokio::test]
    async fn test_upsert_edge_is_idempotent() {
        let graph = MemoryGraphStore::new();
        let edge = props(json!({"type": "affects", "source_id": "a", "target_id": "b"}));

        graph.upsert_edge("a", "affects", "b", &edge).await.unwrap();
        graph.upsert_edge("a", "affects", "b", &edge).await.unwrap();
        assert_eq!(graph.edge_count().await, 1);

        // A different property bag is a distinct edge.
        let other = props(json!({"type": "affects", "weight": 2}));
        graph
            .upsert_edge("a", "affects", "b", &other)
            .await
            .unwrap();
        assert_eq!(graph.edge_count().await, 2);
    }

    #[tokio::test]
    async fn test_property_query() {
        let graph = MemoryGraphStore::new();
        graph
            .upsert_node("disease", &props(json!({"id": "MONDO:1", "type": "disease"})))
            .await
            .unwrap();
        graph
            .upsert_node("gene", &props(json!({"id": "HGNC:5", "type": "gene"})))
            .await
            .unwrap();

        let rows = graph
            .query("match (obj{ type:'disease' }) return obj.id")
            .await
            .unwrap();
        assert_eq!(rows, vec![json!("MONDO:1")]);

        let rows = graph
            .query("match (obj{ type:'gene',id:'HGNC:5' }) return obj.id")
            .await
            .unwrap();
        assert_eq!(rows, vec![json!("HGNC:5")]);
    }

    #[tokio::test]
    async fn test_unsupported_query_is_rejected() {
        let graph = MemoryGraphStore::new();
        assert!(graph.query("MATCH (a)-->(b) RETURN a").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_all() {
        let graph = MemoryGraphStore::new();
        graph
            .upsert_node("disease", &props(json!({"id": "MONDO:1", "type": "disease"})))
            .await
            .unwrap();
        graph.delete_all().await.unwrap();
        assert_eq!(graph.node_count().await, 0);
    }
}
