// SPDX-License-Identifier: MIT

//! The operator contract
//!
//! An operator is a named, reusable unit of computation. Each invocation
//! receives a single `Event` carrying the workflow facade, the job being
//! run, and the already-resolved arguments, and returns a result fragment.

use crate::engine::facade::WorkflowContext;
use crate::engine::types::JobSpec;
use crate::ops::error::EngineError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Context of one operator invocation
#[derive(Clone)]
pub struct Event {
    pub context: Arc<WorkflowContext>,
    pub job_name: String,
    /// Copy of the job definition with resolved argument values
    pub node: JobSpec,
    /// Inner op name, when the job selects an operator variant
    pub op: Option<String>,
    /// Resolved actual arguments
    pub args: Map<String, Value>,
}

impl Event {
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    /// A required string argument
    pub fn require_str(&self, name: &str) -> Result<&str, EngineError> {
        self.args.get(name).and_then(Value::as_str).ok_or_else(|| {
            EngineError::operator(
                &self.node.code,
                format!("job {}: missing string argument '{name}'", self.job_name),
            )
        })
    }
}

#[async_trait]
pub trait Operator: Send + Sync {
    fn name(&self) -> &str;
    async fn invoke(&self, event: Event) -> Result<Value, EngineError>;
}

/// Extension point surfacing additional operators to the router
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;
    /// Workflow modules this plugin ships, if any
    fn workflows(&self) -> Vec<String>;
    /// Operator names this plugin can instantiate
    fn libraries(&self) -> Vec<String>;
    fn instantiate(&self, library: &str) -> Option<Arc<dyn Operator>>;
}
