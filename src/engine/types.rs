// SPDX-License-Identifier: MIT

//! Schema types for workflow documents
//!
//! This module contains the data structures a workflow document
//! deserializes into after imports and templates have been merged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Top-level workflow specification
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct WorkflowSpec {
    #[serde(default)]
    pub info: Info,
    /// Reusable argument bundles keyed by name
    #[serde(default)]
    pub templates: BTreeMap<String, JobSpec>,
    /// Job name -> job definition; must be non-empty
    #[serde(default)]
    pub workflow: BTreeMap<String, JobSpec>,
    /// Standard-library type catalogue, attached during validation
    #[serde(default)]
    pub types: BTreeMap<String, TypeEntry>,
}

/// Document metadata
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Info {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// A single job: one invocation of a named operator
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct JobSpec {
    /// Operator name, or the name of a template this job extends
    #[serde(default)]
    pub code: String,
    /// Human-readable description; preserved verbatim across merges
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    /// Actual arguments: literal scalars, lists, maps, `$var` references,
    /// and selection-query strings
    #[serde(default)]
    pub args: Map<String, Value>,
    /// Operator signatures for validation, keyed by inner op name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, OpSignature>,
}

impl JobSpec {
    /// The inner operator variant this job invokes
    pub fn op(&self) -> &str {
        self.args
            .get("op")
            .and_then(Value::as_str)
            .unwrap_or("main")
    }
}

/// Signature of one operator variant
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct OpSignature {
    #[serde(default)]
    pub args: BTreeMap<String, ArgSpec>,
}

/// Formal argument declaration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ArgSpec {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub required: bool,
}

/// A named entry in the standard-library type catalogue
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TypeEntry {
    #[serde(default)]
    pub doc: String,
    /// The type this one refines, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
}

/// Name of the conventional terminal job
pub const RETURN_JOB: &str = "return";
