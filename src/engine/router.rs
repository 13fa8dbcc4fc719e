// SPDX-License-Identifier: MIT

//! Operator routing
//!
//! Routes a job to its named operator through a shared registry:
//! resolve the arguments, consult the memo cache, invoke on a miss,
//! then write the result to the cache and fold it into the shared
//! graph before returning. Template-backed and plugin operators
//! register into the same registry as the built-ins.

use crate::engine::facade::WorkflowContext;
use crate::engine::fold;
use crate::engine::operator::{Event, Operator, Plugin};
use crate::engine::operators::{GetOperator, RequestsOperator, UnionOperator, ValidateOperator};
use crate::engine::resolve;
use crate::engine::types::WorkflowSpec;
use crate::ops::error::EngineError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type Registry = Arc<RwLock<HashMap<String, Arc<dyn Operator>>>>;

#[derive(Clone)]
pub struct Router {
    operators: Registry,
}

impl Router {
    /// A router with the built-in operators registered
    pub fn new() -> Self {
        let mut operators: HashMap<String, Arc<dyn Operator>> = HashMap::new();
        for op in [
            Arc::new(RequestsOperator) as Arc<dyn Operator>,
            Arc::new(GetOperator),
            Arc::new(UnionOperator),
            Arc::new(ValidateOperator),
        ] {
            operators.insert(op.name().to_string(), op);
        }
        Self {
            operators: Arc::new(RwLock::new(operators)),
        }
    }

    pub async fn register(&self, operator: Arc<dyn Operator>) {
        let mut operators = self.operators.write().await;
        operators.insert(operator.name().to_string(), operator);
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Operator>> {
        self.operators.read().await.get(name).cloned()
    }

    /// Auto-register a dispatch for each template: it merges the
    /// template's args into the inbound node and forwards to the
    /// template's underlying code
    pub async fn register_templates(&self, spec: &WorkflowSpec) {
        for (name, template) in &spec.templates {
            if template.code.is_empty() || template.code == *name {
                continue;
            }
            log::debug!("registering template operator {name} -> {}", template.code);
            self.register(Arc::new(TemplateOperator {
                name: name.clone(),
                code: template.code.clone(),
                args: template.args.clone(),
                registry: self.operators.clone(),
            }))
            .await;
        }
    }

    /// Register every operator a plugin exposes
    pub async fn register_plugin(&self, plugin: &dyn Plugin) {
        for library in plugin.libraries() {
            match plugin.instantiate(&library) {
                Some(operator) => {
                    log::info!("plugin {}: registered operator {library}", plugin.name());
                    self.register(operator).await;
                }
                None => log::warn!(
                    "plugin {}: could not instantiate operator {library}",
                    plugin.name()
                ),
            }
        }
    }

    /// Invoke the operator for one job, applying the cache discipline
    pub async fn route(
        &self,
        ctx: &Arc<WorkflowContext>,
        job_name: &str,
    ) -> Result<Value, EngineError> {
        let job = ctx
            .plan()
            .job(job_name)
            .ok_or_else(|| EngineError::operator("router", format!("unknown job {job_name}")))?;
        let code = job.spec.code.clone();

        // Work on a copy so the plan stays immutable.
        let mut node = job.spec.clone();
        let mut args = Map::new();
        for (name, expr) in &job.args {
            args.insert(name.clone(), resolve::resolve_expr(expr, ctx, None).await?);
        }
        node.args = args.clone();

        let op = args
            .get("op")
            .and_then(Value::as_str)
            .map(str::to_string);
        let memo_key = match &op {
            Some(op) => format!("{job_name}-{code}_{op}"),
            None => format!("{job_name}-{code}"),
        };

        if let Some(bytes) = ctx.cache().get(&memo_key).await? {
            log::info!("{job_name}: serving cached result for {memo_key}");
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let operator = self
            .get(&code)
            .await
            .ok_or_else(|| EngineError::operator(&code, "unknown operator"))?;

        log::info!("{job_name}: invoking operator {code}");
        let result = operator
            .invoke(Event {
                context: ctx.clone(),
                job_name: job_name.to_string(),
                node,
                op,
                args,
            })
            .await?;

        ctx.cache()
            .put(&memo_key, &serde_json::to_vec(&result)?)
            .await?;
        fold::fold(&result, ctx.graph()).await?;
        Ok(result)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Dispatch registered for a named template
struct TemplateOperator {
    name: String,
    code: String,
    args: Map<String, Value>,
    registry: Registry,
}

#[async_trait]
impl Operator for TemplateOperator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, mut event: Event) -> Result<Value, EngineError> {
        // Template arguments override the inbound ones, resolving any
        // references they carry.
        for (key, value) in &self.args {
            let resolved = resolve::resolve_value(value, &event.context, None).await?;
            event.args.insert(key.clone(), resolved);
        }
        event.node.args = event.args.clone();
        event.node.code = self.code.clone();

        let inner = self
            .registry
            .read()
            .await
            .get(&self.code)
            .cloned()
            .ok_or_else(|| EngineError::operator(&self.code, "unknown operator"))?;
        inner.invoke(event).await
    }
}
