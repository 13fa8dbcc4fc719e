// SPDX-License-Identifier: MIT

//! Concurrent DAG execution
//!
//! A single cooperative loop launches every ready job (dependencies all
//! done) in topsort order, harvests finished tasks in completion order,
//! and yields between passes. The first failure cancels the remaining
//! in-flight tasks and surfaces as the workflow error; the workflow
//! result is the `return` job's result.

use crate::engine::facade::WorkflowContext;
use crate::engine::router::Router;
use crate::engine::types::RETURN_JOB;
use crate::ops::error::EngineError;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Pause between scheduling passes
const YIELD_MS: u64 = 20;

pub struct Executor {
    router: Router,
}

/// Final execution state of one run
pub struct RunReport {
    pub result: Result<Value, EngineError>,
    /// Jobs completed before the run ended, in completion order
    pub done: Vec<String>,
    /// Jobs that failed, with their error text
    pub failed: BTreeMap<String, String>,
}

impl Executor {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    pub async fn execute(&self, ctx: Arc<WorkflowContext>) -> Result<Value, EngineError> {
        self.execute_with_report(ctx).await.result
    }

    pub async fn execute_with_report(&self, ctx: Arc<WorkflowContext>) -> RunReport {
        let started = ctx.clock().now();
        let topsort = ctx.plan().topsort.clone();
        let mut done: BTreeSet<String> = BTreeSet::new();
        let mut completion_order: Vec<String> = Vec::new();
        let mut failed: BTreeMap<String, String> = BTreeMap::new();
        let mut running: HashMap<String, JoinHandle<Result<Value, EngineError>>> = HashMap::new();

        while done.len() < topsort.len() {
            let mut launched = 0;
            for job_name in &topsort {
                if done.contains(job_name) || running.contains_key(job_name) {
                    continue;
                }
                let dependencies = ctx.plan().dependencies(job_name);
                if !dependencies.iter().all(|d| done.contains(d)) {
                    continue;
                }

                log::info!("executing job: {job_name}");
                let router = self.router.clone();
                let task_ctx = ctx.clone();
                let name = job_name.clone();
                let handle = tokio::spawn(async move {
                    let result = router.route(&task_ctx, &name).await?;
                    task_ctx.set_result(&name, result.clone()).await?;
                    Ok(result)
                });
                running.insert(job_name.clone(), handle);
                launched += 1;
            }

            let finished: Vec<String> = running
                .iter()
                .filter(|(_, handle)| handle.is_finished())
                .map(|(name, _)| name.clone())
                .collect();
            let harvested = finished.len();
            for name in finished {
                let handle = running.remove(&name).expect("finished handle");
                let outcome = match handle.await {
                    Ok(outcome) => outcome,
                    Err(join_error) => Err(EngineError::operator(
                        &name,
                        format!("task aborted: {join_error}"),
                    )),
                };
                match outcome {
                    Ok(_) => {
                        log::info!("job {name} completed");
                        done.insert(name.clone());
                        completion_order.push(name);
                    }
                    Err(error) => {
                        log::error!("job {name} failed: {error}");
                        failed.insert(name, error.to_string());
                        cancel_all(&mut running).await;
                        return RunReport {
                            result: Err(error),
                            done: completion_order,
                            failed,
                        };
                    }
                }
            }

            if done.len() == topsort.len() {
                break;
            }
            if launched == 0 && harvested == 0 && running.is_empty() {
                // Cannot happen for an acyclic plan; bail out rather than spin.
                let error = EngineError::capability("scheduler stalled with unrunnable jobs");
                return RunReport {
                    result: Err(error),
                    done: completion_order,
                    failed,
                };
            }
            ctx.clock().sleep(YIELD_MS).await;
        }

        let elapsed = ctx.clock().now() - started;
        log::info!(
            "run {} finished {} job(s) in {} ms",
            ctx.run_id(),
            completion_order.len(),
            elapsed.num_milliseconds()
        );
        let result = match ctx.get_result(RETURN_JOB).await {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(EngineError::capability("return job produced no result")),
            Err(error) => Err(error),
        };
        RunReport {
            result,
            done: completion_order,
            failed,
        }
    }
}

/// Best-effort cancellation of in-flight tasks
async fn cancel_all(running: &mut HashMap<String, JoinHandle<Result<Value, EngineError>>>) {
    for (name, handle) in running.drain() {
        log::info!("cancelling in-flight job {name}");
        handle.abort();
        // Join so side effects settle; an abort surfaces as a JoinError.
        let _ = handle.await;
    }
}
