// SPDX-License-Identifier: MIT

//! Argument resolution
//!
//! Turns a parsed argument expression into a concrete value against the
//! current run state: `$name` references resolve to workflow inputs or
//! completed job results, selection queries evaluate against their
//! source, everything else passes through shape-preserving.

use crate::engine::expr::ArgExpr;
use crate::engine::facade::WorkflowContext;
use crate::ops::error::EngineError;
use futures::future::BoxFuture;
use serde_json::{Map, Value};

/// Per-invocation fan-out bindings: `$k` resolves to `lists[k][index]`
/// when present, falling back to ordinary variable lookup
#[derive(Debug, Clone, Default)]
pub struct LoopBinding {
    pub lists: Map<String, Value>,
    pub index: usize,
}

impl LoopBinding {
    fn get(&self, name: &str) -> Option<Value> {
        self.lists
            .get(name)
            .and_then(Value::as_array)
            .and_then(|list| list.get(self.index))
            .cloned()
    }
}

/// Resolve a parsed expression
pub fn resolve_expr<'a>(
    expr: &'a ArgExpr,
    ctx: &'a WorkflowContext,
    loop_binding: Option<&'a LoopBinding>,
) -> BoxFuture<'a, Result<Value, EngineError>> {
    Box::pin(async move {
        match expr {
            ArgExpr::Lit(value) => Ok(value.clone()),
            ArgExpr::Ref(name) => {
                if let Some(bound) = loop_binding.and_then(|lp| lp.get(name)) {
                    return Ok(bound);
                }
                ctx.lookup_var(name).await
            }
            ArgExpr::Query(query) => {
                let source = ctx.lookup_var(&query.source).await?;
                Ok(Value::Array(query.select(&source)))
            }
            ArgExpr::List(items) => {
                let mut resolved = Vec::with_capacity(items.len());
                for item in items {
                    resolved.push(resolve_expr(item, ctx, loop_binding).await?);
                }
                Ok(Value::Array(resolved))
            }
            ArgExpr::Map(entries) => {
                let mut resolved = Map::new();
                for (key, value) in entries {
                    resolved.insert(key.clone(), resolve_expr(value, ctx, loop_binding).await?);
                }
                Ok(Value::Object(resolved))
            }
        }
    })
}

/// Parse and resolve a raw value tree in one step
pub async fn resolve_value(
    value: &Value,
    ctx: &WorkflowContext,
    loop_binding: Option<&LoopBinding>,
) -> Result<Value, EngineError> {
    let expr = ArgExpr::parse(value)?;
    resolve_expr(&expr, ctx, loop_binding).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::facade::test_support::context_for;
    use serde_json::json;

    const DOC: &str = r#"
info:
  version: 0.1.0
workflow:
  a:
    code: get
    args: {}
  return:
    code: get
    args:
      input: "$a"
"#;

    fn inputs(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_literal_trees_are_fixed_points() {
        let ctx = context_for(DOC, Map::new());
        for value in [
            json!(42),
            json!("plain"),
            json!(null),
            json!([1, "two", {"three": 3}]),
            json!({"nested": {"list": [true, false]}}),
        ] {
            let resolved = resolve_value(&value, &ctx, None).await.unwrap();
            assert_eq!(resolved, value);
        }
    }

    #[tokio::test]
    async fn test_reference_resolves_to_input() {
        let ctx = context_for(DOC, inputs(&[("disease", json!("asthma"))]));
        let resolved = resolve_value(&json!("$disease"), &ctx, None).await.unwrap();
        assert_eq!(resolved, json!("asthma"));
    }

    #[tokio::test]
    async fn test_reference_resolves_to_job_result() {
        let ctx = context_for(DOC, Map::new());
        ctx.set_result("a", json!({"answer": 1})).await.unwrap();
        let resolved = resolve_value(&json!("$a"), &ctx, None).await.unwrap();
        assert_eq!(resolved, json!({"answer": 1}));
    }

    #[tokio::test]
    async fn test_undefined_reference_fails() {
        let ctx = context_for(DOC, Map::new());
        assert!(matches!(
            resolve_value(&json!("$missing"), &ctx, None).await,
            Err(EngineError::UndefinedVariable(name)) if name == "missing"
        ));
    }

    #[tokio::test]
    async fn test_nested_references_resolve() {
        let ctx = context_for(DOC, inputs(&[("x", json!("X"))]));
        let tree = json!({"outer": ["$x", {"inner": "$x"}]});
        let resolved = resolve_value(&tree, &ctx, None).await.unwrap();
        assert_eq!(resolved, json!({"outer": ["X", {"inner": "X"}]}));
    }

    #[tokio::test]
    async fn test_selection_query_resolves() {
        let ctx = context_for(DOC, Map::new());
        ctx.set_result(
            "a",
            json!({"result_list": [{"result_graph": {"node_list": [
                {"id": "X", "type": "disease"},
                {"id": "Y", "type": "gene"}
            ]}}]}),
        )
        .await
        .unwrap();

        let resolved = resolve_value(
            &json!("select $.[*].result_list.[*].[*].result_graph.node_list.[*] from $a"),
            &ctx,
            None,
        )
        .await
        .unwrap();
        assert_eq!(
            resolved,
            json!([
                {"id": "X", "type": "disease"},
                {"id": "Y", "type": "gene"}
            ])
        );
    }

    #[tokio::test]
    async fn test_loop_binding_takes_precedence() {
        let ctx = context_for(DOC, inputs(&[("drug", json!("fallback"))]));
        let mut lists = Map::new();
        lists.insert("drug".to_string(), json!(["CHEMBL:1", "CHEMBL:2"]));

        let binding = LoopBinding { lists, index: 1 };
        let resolved = resolve_value(&json!("$drug"), &ctx, Some(&binding))
            .await
            .unwrap();
        assert_eq!(resolved, json!("CHEMBL:2"));
    }

    #[tokio::test]
    async fn test_loop_binding_falls_back_past_end() {
        let ctx = context_for(DOC, inputs(&[("drug", json!("fallback"))]));
        let mut lists = Map::new();
        lists.insert("drug".to_string(), json!(["only"]));

        let binding = LoopBinding { lists, index: 5 };
        let resolved = resolve_value(&json!("$drug"), &ctx, Some(&binding))
            .await
            .unwrap();
        assert_eq!(resolved, json!("fallback"));
    }
}
