// SPDX-License-Identifier: MIT

//! Runtime assembly
//!
//! Wires capabilities, the router, and the loader into a reusable
//! runtime. Everything configurable arrives through `RuntimeOptions` or
//! the builder; there are no ambient singletons.

use crate::engine::executor::{Executor, RunReport};
use crate::engine::facade::{Capabilities, WorkflowContext};
use crate::engine::loader::WorkflowLoader;
use crate::engine::operator::{Operator, Plugin};
use crate::engine::plan;
use crate::engine::router::Router;
use crate::engine::types::WorkflowSpec;
use crate::ops::capability::{
    Cache, Clock, FileCache, GraphStore, Http, MemoryCache, MemoryGraphStore, ReqwestHttp,
    TokioClock, DEFAULT_TIMEOUT,
};
use crate::ops::error::EngineError;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Directories searched for imported workflow modules, in order
    pub library_path: Vec<PathBuf>,
    /// Root of the file-backed result cache; in-memory when absent
    pub cache_dir: Option<PathBuf>,
    pub http_timeout: Duration,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            library_path: vec![PathBuf::from(".")],
            cache_dir: None,
            http_timeout: DEFAULT_TIMEOUT,
        }
    }
}

pub struct Runtime {
    options: RuntimeOptions,
    caps: Capabilities,
    router: Router,
}

#[derive(Default)]
pub struct RuntimeBuilder {
    options: RuntimeOptions,
    graph: Option<Arc<dyn GraphStore>>,
    cache: Option<Arc<dyn Cache>>,
    http: Option<Arc<dyn Http>>,
    clock: Option<Arc<dyn Clock>>,
    operators: Vec<Arc<dyn Operator>>,
    plugins: Vec<Arc<dyn Plugin>>,
}

impl RuntimeBuilder {
    pub fn options(mut self, options: RuntimeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn graph(mut self, graph: Arc<dyn GraphStore>) -> Self {
        self.graph = Some(graph);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn http(mut self, http: Arc<dyn Http>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Register an extension operator
    pub fn operator(mut self, operator: Arc<dyn Operator>) -> Self {
        self.operators.push(operator);
        self
    }

    pub fn plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub async fn build(self) -> Result<Runtime, EngineError> {
        let cache: Arc<dyn Cache> = match self.cache {
            Some(cache) => cache,
            None => match &self.options.cache_dir {
                Some(dir) => Arc::new(FileCache::new(dir)?),
                None => Arc::new(MemoryCache::new()),
            },
        };
        let http: Arc<dyn Http> = match self.http {
            Some(http) => http,
            None => Arc::new(ReqwestHttp::new(self.options.http_timeout)?),
        };
        let caps = Capabilities {
            graph: self
                .graph
                .unwrap_or_else(|| Arc::new(MemoryGraphStore::new())),
            cache,
            http,
            clock: self.clock.unwrap_or_else(|| Arc::new(TokioClock)),
        };

        let router = Router::new();
        for operator in self.operators {
            router.register(operator).await;
        }
        for plugin in &self.plugins {
            router.register_plugin(plugin.as_ref()).await;
        }

        Ok(Runtime {
            options: self.options,
            caps,
            router,
        })
    }
}

impl Runtime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    pub fn loader(&self) -> WorkflowLoader {
        WorkflowLoader::new(self.options.library_path.clone())
    }

    /// Plan and execute a loaded spec.
    ///
    /// Plan-time failures return `Err`; run-time failures surface inside
    /// the report alongside the partial `done` set.
    pub async fn run_spec(
        &self,
        spec: WorkflowSpec,
        inputs: Map<String, Value>,
    ) -> Result<RunReport, EngineError> {
        let plan = plan::build(spec)?;
        self.router.register_templates(&plan.spec).await;
        let ctx = WorkflowContext::new(plan, inputs, self.caps.clone());
        log::info!("run {} starting", ctx.run_id());
        Ok(Executor::new(self.router.clone())
            .execute_with_report(ctx)
            .await)
    }

    pub async fn run_file(
        &self,
        path: impl AsRef<Path>,
        inputs: Map<String, Value>,
    ) -> Result<RunReport, EngineError> {
        let spec = self.loader().load_file(path)?;
        self.run_spec(spec, inputs).await
    }

    /// The thin workflow surface: `{workflow, args}` in, the `return`
    /// fragment out
    pub async fn run_request(&self, request: Value) -> Result<Value, EngineError> {
        let workflow = request
            .get("workflow")
            .cloned()
            .ok_or_else(|| EngineError::Parse("request missing 'workflow'".to_string()))?;
        let inputs = request
            .get("args")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let spec = self.loader().load_tree(workflow)?;
        self.run_spec(spec, inputs).await?.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::router::test_support::LiteralOperator;
    use serde_json::json;

    #[tokio::test]
    async fn test_run_request_round_trip() {
        let (literal, _) = LiteralOperator::new();
        let runtime = Runtime::builder().operator(literal).build().await.unwrap();

        let response = runtime
            .run_request(json!({
                "workflow": {
                    "info": {"version": "0.1.0"},
                    "workflow": {
                        "return": {"code": "literal", "args": {"value": "$seed"}}
                    }
                },
                "args": {"seed": "hello"}
            }))
            .await
            .unwrap();
        assert_eq!(response, json!("hello"));
    }

    #[tokio::test]
    async fn test_empty_workflow_never_executes() {
        let runtime = Runtime::builder().build().await.unwrap();
        let result = runtime
            .run_request(json!({"workflow": {"info": {"version": "0.1.0"}, "workflow": {}}}))
            .await;
        assert!(matches!(result, Err(EngineError::Parse(_))));
    }

    #[tokio::test]
    async fn test_file_cache_option() {
        let dir = tempfile::tempdir().unwrap();
        let (literal, _) = LiteralOperator::new();
        let runtime = Runtime::builder()
            .options(RuntimeOptions {
                cache_dir: Some(dir.path().to_path_buf()),
                ..Default::default()
            })
            .operator(literal)
            .build()
            .await
            .unwrap();

        runtime
            .run_request(json!({
                "workflow": {
                    "info": {"version": "0.1.0"},
                    "workflow": {"return": {"code": "literal", "args": {"value": 1}}}
                }
            }))
            .await
            .unwrap();

        // The router memo entry lands on disk.
        assert!(dir.path().join("return-literal").exists());
    }
}
