// SPDX-License-Identifier: MIT

//! The `validate` operator: assertion rules over the shared graph
//!
//! Arguments:
//!   - `when`: `{var, val}` activation condition; the rules run only when
//!     the resolved variable equals the expected value.
//!   - `then`: named assertions, each with a `doc` string, an `items`
//!     graph query in match-return form (`match type=disease return id`),
//!     and any of `all` / `match` / `none` checks. `match` entries are
//!     regular expressions anchored at the start.

use crate::engine::fold::kgs;
use crate::engine::operator::{Event, Operator};
use crate::ops::error::EngineError;
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

pub struct ValidateOperator;

const FORBIDDEN_VERBS: &[&str] = &["delete", "detach", "create", "remove"];

#[async_trait]
impl Operator for ValidateOperator {
    fn name(&self) -> &str {
        "validate"
    }

    async fn invoke(&self, event: Event) -> Result<Value, EngineError> {
        if let Some(when) = event.arg("when").and_then(Value::as_object) {
            let var = when.get("var").cloned().unwrap_or(Value::Null);
            let val = when.get("val").cloned().unwrap_or(Value::Null);
            if var != val {
                log::info!(
                    "{}: skipping validation, unmet condition {var} == {val}",
                    event.job_name
                );
                return Ok(kgs(vec![], vec![]));
            }
        }

        let assertions = event
            .arg("then")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        for (name, assertion) in &assertions {
            let doc = assertion
                .get("doc")
                .and_then(Value::as_str)
                .unwrap_or_default();
            log::info!("{}: running test {name}: {doc}", event.job_name);

            let items_query = assertion
                .get("items")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    EngineError::operator("validate", format!("assertion {name} missing items query"))
                })?;
            let rows = event
                .context
                .graph()
                .query(&translate(items_query)?)
                .await?;
            let items: Vec<String> = rows.iter().map(row_text).collect();

            check_assertion(name, assertion, &items)?;
        }
        Ok(kgs(vec![], vec![]))
    }
}

fn check_assertion(name: &str, assertion: &Value, items: &[String]) -> Result<(), EngineError> {
    let fail = |message: String| EngineError::operator("validate", format!("{name}: {message}"));

    if let Some(required) = assertion.get("all").and_then(Value::as_array) {
        for entry in required {
            let text = row_text(entry);
            if !items.contains(&text) {
                return Err(fail(format!("failed to find element {text} in items {items:?}")));
            }
        }
    }

    if let Some(patterns) = assertion.get("match").and_then(Value::as_array) {
        for entry in patterns {
            let pattern = entry.as_str().ok_or_else(|| {
                fail(format!("match entries must be strings, got {entry}"))
            })?;
            let re = Regex::new(pattern)
                .map_err(|e| fail(format!("bad match pattern '{pattern}': {e}")))?;
            for item in items {
                if re.find(item).map(|m| m.start() != 0).unwrap_or(true) {
                    return Err(fail(format!(
                        "failed to match element {pattern} against item {item}"
                    )));
                }
            }
        }
    }

    if let Some(absent) = assertion.get("none").and_then(Value::as_array) {
        for entry in absent {
            let text = row_text(entry);
            if items.contains(&text) {
                return Err(fail(format!(
                    "found element {text} which must not appear in items {items:?}"
                )));
            }
        }
    }
    Ok(())
}

/// Translate the match-return query form into graph-store query text:
/// `match type=disease return id` becomes
/// `match (obj{ type:'disease' }) return obj.id`
pub fn translate(query: &str) -> Result<String, EngineError> {
    let bad = || EngineError::BadExpression(query.to_string());
    let tokens: Vec<&str> = query.split_whitespace().collect();

    if tokens.len() < 4 || !tokens[0].eq_ignore_ascii_case("match") {
        return Err(bad());
    }
    let return_at = tokens.len() - 2;
    if !tokens[return_at].eq_ignore_ascii_case("return") {
        return Err(bad());
    }
    let field = tokens[return_at + 1];

    let mut constraints = Vec::new();
    for token in &tokens[1..return_at] {
        let (key, value) = token.split_once('=').ok_or_else(bad)?;
        if FORBIDDEN_VERBS.contains(&key.to_ascii_lowercase().as_str()) {
            return Err(bad());
        }
        constraints.push(format!("{key}:'{value}'"));
    }
    if constraints.is_empty() {
        return Err(bad());
    }
    Ok(format!(
        "match (obj{{ {} }}) return obj.{field}",
        constraints.join(",")
    ))
}

fn row_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
