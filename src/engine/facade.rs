// SPDX-License-Identifier: MIT

//! Run-scoped workflow facade
//!
//! One `WorkflowContext` exists per execution. It owns the immutable plan,
//! the workflow inputs, the capability handles, and the per-job result
//! slots; operators reach everything through it.

use crate::engine::plan::WorkflowPlan;
use crate::ops::capability::{Cache, Clock, GraphStore, Http};
use crate::ops::error::EngineError;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// The external collaborators a run depends on
#[derive(Clone)]
pub struct Capabilities {
    pub graph: Arc<dyn GraphStore>,
    pub cache: Arc<dyn Cache>,
    pub http: Arc<dyn Http>,
    pub clock: Arc<dyn Clock>,
}

pub struct WorkflowContext {
    run_id: Uuid,
    plan: WorkflowPlan,
    inputs: Map<String, Value>,
    caps: Capabilities,
    results: RwLock<HashMap<String, Value>>,
}

impl WorkflowContext {
    pub fn new(plan: WorkflowPlan, inputs: Map<String, Value>, caps: Capabilities) -> Arc<Self> {
        Arc::new(Self {
            run_id: Uuid::new_v4(),
            plan,
            inputs,
            caps,
            results: RwLock::new(HashMap::new()),
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn plan(&self) -> &WorkflowPlan {
        &self.plan
    }

    pub fn inputs(&self) -> &Map<String, Value> {
        &self.inputs
    }

    pub fn graph(&self) -> &dyn GraphStore {
        self.caps.graph.as_ref()
    }

    pub fn cache(&self) -> &dyn Cache {
        self.caps.cache.as_ref()
    }

    pub fn http(&self) -> &dyn Http {
        self.caps.http.as_ref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.caps.clock.as_ref()
    }

    /// Cache key scoping a job's result to this run
    pub fn result_key(&self, job_name: &str) -> String {
        format!("{}.{job_name}.res", self.run_id)
    }

    /// Record a job's result: per-run cache entry plus the in-memory slot
    pub async fn set_result(&self, job_name: &str, value: Value) -> Result<(), EngineError> {
        if value.is_null() {
            return Err(EngineError::operator(
                job_name,
                "null result value".to_string(),
            ));
        }
        let bytes = serde_json::to_vec(&value)?;
        self.caps.cache.put(&self.result_key(job_name), &bytes).await?;
        self.results
            .write()
            .await
            .insert(job_name.to_string(), value);
        Ok(())
    }

    /// A completed job's result, if any
    pub async fn get_result(&self, job_name: &str) -> Result<Option<Value>, EngineError> {
        if let Some(value) = self.results.read().await.get(job_name) {
            return Ok(Some(value.clone()));
        }
        match self.caps.cache.get(&self.result_key(job_name)).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn done_jobs(&self) -> Vec<String> {
        self.results.read().await.keys().cloned().collect()
    }

    /// Resolve a `$name` reference: workflow inputs shadow job results.
    /// Comma-separated string inputs split into lists.
    pub async fn lookup_var(&self, name: &str) -> Result<Value, EngineError> {
        if let Some(value) = self.inputs.get(name) {
            return Ok(split_csv(value));
        }
        if let Some(result) = self.get_result(name).await? {
            return Ok(result);
        }
        Err(EngineError::UndefinedVariable(name.to_string()))
    }
}

fn split_csv(value: &Value) -> Value {
    match value {
        Value::String(s) if s.contains(',') => Value::Array(
            s.split(',')
                .map(|part| Value::String(part.trim().to_string()))
                .collect(),
        ),
        other => other.clone(),
    }
}
