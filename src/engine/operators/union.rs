// SPDX-License-Identifier: MIT

//! The `union` operator: the list of the `elements` jobs' results

use crate::engine::operator::{Event, Operator};
use crate::ops::error::EngineError;
use async_trait::async_trait;
use serde_json::Value;

pub struct UnionOperator;

#[async_trait]
impl Operator for UnionOperator {
    fn name(&self) -> &str {
        "union"
    }

    async fn invoke(&self, event: Event) -> Result<Value, EngineError> {
        let elements = event
            .arg("elements")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut results = Vec::with_capacity(elements.len());
        for element in &elements {
            let name = element.as_str().ok_or_else(|| {
                EngineError::operator("union", format!("elements entries must be job names, got {element}"))
            })?;
            let result = event
                .context
                .get_result(name)
                .await?
                .ok_or_else(|| EngineError::UndefinedVariable(name.to_string()))?;
            results.push(result);
        }
        Ok(Value::Array(results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::facade::test_support::context_for;
    use serde_json::{json, Map};

    const DOC: &str = r#"
info:
  version: 0.1.0
workflow:
  a:
    code: get
    args: {}
  b:
    code: get
    args: {}
  return:
    code: union
    args:
      elements: [a, b]
"#;

    #[tokio::test]
    async fn test_union_collects_results_in_order() {
        let ctx = context_for(DOC, Map::new());
        ctx.set_result("a", json!({"from": "a"})).await.unwrap();
        ctx.set_result("b", json!({"from": "b"})).await.unwrap();

        let event = Event {
            context: ctx.clone(),
            job_name: "return".to_string(),
            node: ctx.plan().job("return").unwrap().spec.clone(),
            op: None,
            args: ctx.plan().job("return").unwrap().spec.args.clone(),
        };

        let result = UnionOperator.invoke(event).await.unwrap();
        assert_eq!(result, json!([{"from": "a"}, {"from": "b"}]));
    }

    #[tokio::test]
    async fn test_union_fails_on_missing_result() {
        let ctx = context_for(DOC, Map::new());
        let event = Event {
            context: ctx.clone(),
            job_name: "return".to_string(),
            node: ctx.plan().job("return").unwrap().spec.clone(),
            op: None,
            args: ctx.plan().job("return").unwrap().spec.args.clone(),
        };
        assert!(matches!(
            UnionOperator.invoke(event).await,
            Err(EngineError::UndefinedVariable(_))
        ));
    }
}
