// SPDX-License-Identifier: MIT

//! The `get` operator: HTTP GET convenience
//!
//! Fetches `url` (with `{placeholder}` slots filled from the resolved
//! args) and wraps the JSON response as a result fragment. An optional
//! `rename` mapping rewrites field names on the returned node objects.

use super::{check_status, fill_url};
use crate::engine::fold::kgs;
use crate::engine::operator::{Event, Operator};
use crate::ops::error::EngineError;
use async_trait::async_trait;
use serde_json::{Map, Value};

pub struct GetOperator;

#[async_trait]
impl Operator for GetOperator {
    fn name(&self) -> &str {
        "get"
    }

    async fn invoke(&self, event: Event) -> Result<Value, EngineError> {
        let pattern = event.require_str("url")?;
        let url = fill_url(pattern, &event.args);

        log::info!("{}: GET {url}", event.job_name);
        let response = event.context.http().get(&url, &[]).await?;
        check_status(response.status, &response.body)?;
        let body = response.json()?;

        let renames = event.arg("rename").and_then(Value::as_object).cloned();
        let nodes = match body {
            Value::Array(items) => items
                .into_iter()
                .map(|item| rename_fields(item, renames.as_ref()))
                .collect(),
            other => vec![rename_fields(other, renames.as_ref())],
        };
        Ok(kgs(nodes, vec![]))
    }
}

fn rename_fields(value: Value, renames: Option<&Map<String, Value>>) -> Value {
    let renames = match renames {
        Some(r) if !r.is_empty() => r,
        _ => return value,
    };
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, v)| {
                    let renamed = renames
                        .get(&key)
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or(key);
                    (renamed, v)
                })
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rename_fields() {
        let renames = json!({"label": "name"});
        let renamed = rename_fields(
            json!({"label": "asthma", "id": "MONDO:1"}),
            renames.as_object(),
        );
        assert_eq!(renamed, json!({"name": "asthma", "id": "MONDO:1"}));
    }

    #[test]
    fn test_rename_leaves_scalars_alone() {
        let renames = json!({"a": "b"});
        assert_eq!(rename_fields(json!("text"), renames.as_object()), json!("text"));
    }

    #[test]
    fn test_no_renames_is_identity() {
        let node = json!({"label": "x"});
        assert_eq!(rename_fields(node.clone(), None), node);
    }
}
