// SPDX-License-Identifier: MIT

//! Abstract syntax tree for the declarative query language

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// A parsed program is an ordered list of statements
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Set(SetStatement),
    Select(SelectStatement),
}

/// `SET <name> = <scalar>` binds a variable in a statement-local context
#[derive(Debug, Clone, PartialEq)]
pub struct SetStatement {
    pub name: String,
    pub value: Value,
}

/// Constraint operators permitted in a WHERE clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
}

impl CompareOp {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "=" => Some(Self::Eq),
            "!=" => Some(Self::NotEq),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Lte),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Gte),
            "in" => Some(Self::In),
            _ => None,
        }
    }
}

/// One WHERE constraint
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub left: String,
    pub op: CompareOp,
    /// A scalar, or a `$name` reference string resolved at execution time
    pub right: Value,
}

/// `SET '<path>' AS <name>` output binding on a select statement
#[derive(Debug, Clone, PartialEq)]
pub struct OutputBinding {
    pub path: Option<String>,
    pub name: String,
}

/// A typed knowledge-graph question built from a concept chain
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStatement {
    /// Concept names in chain order
    pub concepts: Vec<String>,
    /// Service identifier (the `$name` after FROM, without the sigil)
    pub service: String,
    pub where_clause: Vec<Predicate>,
    pub outputs: Vec<OutputBinding>,
}

impl SelectStatement {
    /// Constraints that pin a concept to candidate values
    pub fn candidate_predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.where_clause.iter().filter(|p| {
            matches!(p.op, CompareOp::Eq | CompareOp::In) && self.concepts.contains(&p.left)
        })
    }

    /// Constraints that do not name a concept (passed through to the service)
    pub fn filter_predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.where_clause
            .iter()
            .filter(|p| !self.concepts.contains(&p.left))
    }

    /// Enumerate one question graph per combination of candidate values.
    ///
    /// Nodes are indexed in concept order with an edge between each
    /// adjacent pair; a concept with candidates contributes its value as
    /// the node's curie.
    pub fn generate_questions(&self, candidates: &BTreeMap<String, Vec<Value>>) -> Vec<Value> {
        let mut questions: Vec<(Vec<Value>, Vec<Value>)> = vec![(Vec::new(), Vec::new())];

        for (index, concept) in self.concepts.iter().enumerate() {
            let options: Vec<Option<Value>> = match candidates.get(concept) {
                Some(values) if !values.is_empty() => {
                    values.iter().map(|v| Some(curie_of(v))).collect()
                }
                _ => vec![None],
            };

            let mut next = Vec::with_capacity(questions.len() * options.len());
            for (nodes, edges) in &questions {
                for option in &options {
                    let mut nodes = nodes.clone();
                    let mut edges = edges.clone();
                    nodes.push(question_node(index, concept, option.clone()));
                    if index > 0 {
                        edges.push(json!({
                            "source_id": index - 1,
                            "target_id": index,
                        }));
                    }
                    next.push((nodes, edges));
                }
            }
            questions = next;
        }

        questions
            .into_iter()
            .map(|(nodes, edges)| {
                json!({
                    "machine_question": {
                        "nodes": nodes,
                        "edges": edges,
                    }
                })
            })
            .collect()
    }
}

fn question_node(index: usize, concept: &str, curie: Option<Value>) -> Value {
    let mut node = Map::new();
    node.insert("id".to_string(), json!(index));
    node.insert("type".to_string(), json!(concept));
    if let Some(curie) = curie {
        node.insert("curie".to_string(), curie);
    }
    Value::Object(node)
}

/// A candidate may be a bare identifier or an object carrying an `id`
fn curie_of(value: &Value) -> Value {
    match value {
        Value::Object(map) => map.get("id").cloned().unwrap_or_else(|| value.clone()),
        other => other.clone(),
    }
}
