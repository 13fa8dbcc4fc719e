// SPDX-License-Identifier: MIT

//! Built-in operators

mod get;
mod requests;
mod union;
mod validate;

pub use get::GetOperator;
pub use requests::RequestsOperator;
pub use union::UnionOperator;
pub use validate::ValidateOperator;

use crate::ops::error::EngineError;
use serde_json::{Map, Value};

/// Fill `{placeholder}` slots in a url pattern from resolved arguments
pub(crate) fn fill_url(pattern: &str, args: &Map<String, Value>) -> String {
    let mut url = pattern.to_string();
    for (key, value) in args {
        let slot = format!("{{{key}}}");
        if url.contains(&slot) {
            url = url.replace(&slot, &scalar_text(value));
        }
    }
    url
}

/// Accept 200 and 202; anything else is an upstream failure
pub(crate) fn check_status(status: u16, body: &str) -> Result<(), EngineError> {
    match status {
        200 | 202 => Ok(()),
        other => Err(EngineError::upstream(other as i64, body)),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
