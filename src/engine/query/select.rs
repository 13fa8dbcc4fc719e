// SPDX-License-Identifier: MIT

//! Selection queries
//!
//! Parses and evaluates expressions of the form
//! `select <pattern> from $<source>` where `<pattern>` is a JSON path
//! subset: `$`, `.key`, `[*]`, `.[*]`. A wildcard yields the elements of
//! an array and passes any other value through unchanged, so the same
//! path works over list-shaped and object-shaped result fragments.

use crate::ops::error::EngineError;
use serde_json::Value;

/// One step of a parsed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Wildcard,
}

/// A parsed JSON path pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    segments: Vec<Segment>,
}

impl JsonPath {
    pub fn parse(pattern: &str) -> Result<Self, EngineError> {
        let bad = || EngineError::BadExpression(pattern.to_string());
        let rest = pattern.strip_prefix('$').ok_or_else(bad)?;

        let mut segments = Vec::new();
        for token in rest.split('.') {
            match token {
                "" => continue,
                "[*]" => segments.push(Segment::Wildcard),
                key => {
                    if key.contains('[') || key.contains(']') || key.contains('$') {
                        return Err(bad());
                    }
                    segments.push(Segment::Key(key.to_string()));
                }
            }
        }
        Ok(Self { segments })
    }

    /// Evaluate the path, returning every matching subtree
    pub fn select(&self, root: &Value) -> Vec<Value> {
        let mut current = vec![root.clone()];
        for segment in &self.segments {
            let mut next = Vec::new();
            for value in current {
                match segment {
                    Segment::Key(key) => {
                        if let Some(found) = value.get(key) {
                            next.push(found.clone());
                        }
                    }
                    Segment::Wildcard => match value {
                        Value::Array(items) => next.extend(items),
                        other => next.push(other),
                    },
                }
            }
            current = next;
        }
        current
    }
}

/// A parsed `select <pattern> from $<source>` expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    pub pattern: JsonPath,
    pub source: String,
    pub raw: String,
}

impl SelectQuery {
    /// True when the text is shaped like a selection query
    pub fn matches(text: &str) -> bool {
        text.starts_with("select ")
    }

    pub fn parse(text: &str) -> Result<Self, EngineError> {
        let bad = || EngineError::BadExpression(text.to_string());
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.len() != 4 || tokens[0] != "select" || tokens[2] != "from" {
            return Err(bad());
        }
        let pattern = tokens[1].trim_matches('"');
        let source = tokens[3].strip_prefix('$').ok_or_else(bad)?;
        if source.is_empty() {
            return Err(bad());
        }
        Ok(Self {
            pattern: JsonPath::parse(pattern)?,
            source: source.to_string(),
            raw: text.to_string(),
        })
    }

    /// Evaluate against the resolved source value
    pub fn select(&self, source: &Value) -> Vec<Value> {
        self.pattern.select(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_simple_path() {
        let path = JsonPath::parse("$.a.b").unwrap();
        assert_eq!(
            path.segments,
            vec![
                Segment::Key("a".to_string()),
                Segment::Key("b".to_string())
            ]
        );
    }

    #[test]
    fn test_parse_wildcards() {
        let path = JsonPath::parse("$.[*].result_list.[*]").unwrap();
        assert_eq!(path.segments.len(), 3);
        assert_eq!(path.segments[0], Segment::Wildcard);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(JsonPath::parse("no dollar").is_err());
        assert!(JsonPath::parse("$.a[0]").is_err());
    }

    #[test]
    fn test_select_key_path() {
        let doc = json!({"a": {"b": 42}});
        let path = JsonPath::parse("$.a.b").unwrap();
        assert_eq!(path.select(&doc), vec![json!(42)]);
    }

    #[test]
    fn test_select_wildcard_over_array() {
        let doc = json!([{"x": 1}, {"x": 2}]);
        let path = JsonPath::parse("$.[*].x").unwrap();
        assert_eq!(path.select(&doc), vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_wildcard_passes_objects_through() {
        // The standard extraction path uses doubled wildcards; objects pass
        // through so both fragment shapes produce the same nodes.
        let doc = json!({
            "result_list": [
                {"result_graph": {"node_list": [
                    {"id": "X", "type": "disease"},
                    {"id": "Y", "type": "gene"}
                ]}}
            ]
        });
        let path = JsonPath::parse("$.[*].result_list.[*].[*].result_graph.node_list.[*]").unwrap();
        let nodes = path.select(&doc);
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0]["id"], json!("X"));
        assert_eq!(nodes[1]["id"], json!("Y"));
    }

    #[test]
    fn test_standard_path_over_list_fragment() {
        let doc = json!([
            {"result_list": [{"result_graph": {"node_list": [{"id": "N_a"}], "edge_list": []}}]},
            {"result_list": [{"result_graph": {"node_list": [{"id": "N_b"}], "edge_list": []}}]}
        ]);
        let path = JsonPath::parse("$.[*].result_list.[*].[*].result_graph.node_list.[*]").unwrap();
        let nodes = path.select(&doc);
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn test_missing_key_yields_nothing() {
        let doc = json!({"a": 1});
        let path = JsonPath::parse("$.b.c").unwrap();
        assert!(path.select(&doc).is_empty());
    }

    #[test]
    fn test_parse_select_query() {
        let q = SelectQuery::parse("select $.nodes.[*] from $answers").unwrap();
        assert_eq!(q.source, "answers");
        assert_eq!(q.select(&json!({"nodes": [1, 2]})), vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_parse_select_query_quoted_pattern() {
        let q = SelectQuery::parse(r#"select "$.nodes.[*]" from $answers"#).unwrap();
        assert_eq!(q.source, "answers");
    }

    #[test]
    fn test_malformed_select_query() {
        for text in [
            "select from $a",
            "select $.x to $a",
            "select $.x from a",
            "select $.x from $",
            "select $.x from $a extra",
        ] {
            assert!(
                matches!(SelectQuery::parse(text), Err(EngineError::BadExpression(_))),
                "'{text}' should be rejected"
            );
        }
    }
}
