// SPDX-License-Identifier: MIT

//! Typed error handling for kgflow
//!
//! Every failure the engine surfaces is one of the kinds below. Plan-time
//! kinds (parse, resolve, validation, plan) abort before any job runs;
//! the remaining kinds propagate out of the executor as the workflow result.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for kgflow
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed workflow document
    #[error("Parse error: {0}")]
    Parse(String),

    /// Import not found on the library path
    #[error("Module '{module}' not found on library path {searched:?}")]
    Resolve {
        module: String,
        searched: Vec<PathBuf>,
    },

    /// Aggregate of type-validation issues
    #[error(transparent)]
    Validation(#[from] ValidationFailed),

    /// Structural plan defects
    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    /// `$name` not bound at resolve time
    #[error("Referenced undefined variable: {0}")]
    UndefinedVariable(String),

    /// Malformed selection or declarative query
    #[error("Bad expression: {0}")]
    BadExpression(String),

    /// An HTTP operator received a non-200/202 status
    #[error("Upstream service returned {status}: {body}")]
    Upstream { status: i64, body: String },

    /// An operator itself raised
    #[error("Operator '{code}' failed: {cause}")]
    Operator { code: String, cause: String },

    /// A graph/cache/http capability failed unrecoverably
    #[error("Capability failure: {0}")]
    Capability(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP transport errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Structural defects detected while building the workflow plan
#[derive(Debug, Error)]
pub enum PlanError {
    /// The conventional terminal job is absent
    #[error("Workflow has no 'return' job")]
    MissingReturn,

    /// Job references form a cycle
    #[error("Circular dependency detected: {0:?}")]
    CycleDetected(Vec<String>),

    /// A job depends on a name that is not a job
    #[error("Job '{job}' depends on unknown job '{dependency}'")]
    UnknownDependency { job: String, dependency: String },
}

/// A single issue found while validating job signatures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    UnknownType { type_name: String, job: String },
    MissingRequiredArg { arg: String, job: String },
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationIssue::UnknownType { type_name, job } => {
                write!(f, "unknown type {type_name} referenced in job {job}")
            }
            ValidationIssue::MissingRequiredArg { arg, job } => {
                write!(f, "required argument {arg} not present in job {job}")
            }
        }
    }
}

/// Aggregate of every validation issue found in a document
#[derive(Debug, Error)]
#[error("Validation failed: {}", .issues.iter().map(|i| i.to_string()).collect::<Vec<_>>().join("; "))]
pub struct ValidationFailed {
    pub issues: Vec<ValidationIssue>,
}

impl EngineError {
    /// Create an operator error
    pub fn operator(code: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::Operator {
            code: code.into(),
            cause: cause.into(),
        }
    }

    /// Create a capability error
    pub fn capability(message: impl Into<String>) -> Self {
        Self::Capability(message.into())
    }

    /// Create an upstream error
    pub fn upstream(status: i64, body: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            body: body.into(),
        }
    }

    /// True for errors that abort before any job runs
    pub fn is_plan_time(&self) -> bool {
        matches!(
            self,
            Self::Parse(_) | Self::Resolve { .. } | Self::Validation(_) | Self::Plan(_)
        )
    }
}
