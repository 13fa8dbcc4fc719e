// SPDX-License-Identifier: MIT

//! Argument value expressions
//!
//! Job argument values are parsed once, at plan time, into a tagged
//! variant instead of being string-inspected on every call. A scalar
//! string is a variable reference when it matches `$name` exactly, a
//! selection query when it starts with `select `, and a literal
//! otherwise.

use crate::engine::query::SelectQuery;
use crate::ops::error::EngineError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

static REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$([A-Za-z_][A-Za-z0-9_.]*)$").expect("reference pattern"));

/// A parsed argument value
#[derive(Debug, Clone, PartialEq)]
pub enum ArgExpr {
    /// Literal scalar, returned verbatim
    Lit(Value),
    /// `$name` variable reference
    Ref(String),
    /// Inline selection query over a prior result
    Query(SelectQuery),
    List(Vec<ArgExpr>),
    Map(BTreeMap<String, ArgExpr>),
}

impl ArgExpr {
    pub fn parse(value: &Value) -> Result<Self, EngineError> {
        Ok(match value {
            Value::Array(items) => {
                ArgExpr::List(items.iter().map(ArgExpr::parse).collect::<Result<_, _>>()?)
            }
            Value::Object(map) => ArgExpr::Map(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), ArgExpr::parse(v)?)))
                    .collect::<Result<_, EngineError>>()?,
            ),
            Value::String(text) => {
                if let Some(name) = reference_name(text) {
                    ArgExpr::Ref(name.to_string())
                } else if SelectQuery::matches(text) {
                    ArgExpr::Query(SelectQuery::parse(text)?)
                } else {
                    ArgExpr::Lit(value.clone())
                }
            }
            other => ArgExpr::Lit(other.clone()),
        })
    }

    /// Names of every variable reference at scalar or list positions.
    ///
    /// Dependency inference deliberately ignores references buried inside
    /// nested maps; those resolve at run time against inputs or completed
    /// jobs but do not order the schedule.
    pub fn shallow_refs(&self) -> Vec<&str> {
        match self {
            ArgExpr::Ref(name) => vec![name.as_str()],
            ArgExpr::List(items) => items.iter().flat_map(ArgExpr::shallow_refs).collect(),
            _ => Vec::new(),
        }
    }
}

/// The `name` in a `$name` scalar, when the whole string is a reference
pub fn reference_name(text: &str) -> Option<&str> {
    REFERENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}
