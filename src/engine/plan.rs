// SPDX-License-Identifier: MIT

//! Dependency analysis and plan construction
//!
//! Scans each job's arguments for references to other jobs, builds the
//! dependency DAG, rejects cycles, and produces a deterministic
//! linearization: dependencies first, reverse-lexicographic tie-break
//! among ready jobs, the `return` job last.

use crate::engine::expr::ArgExpr;
use crate::engine::types::{JobSpec, WorkflowSpec, RETURN_JOB};
use crate::engine::validate;
use crate::ops::error::{EngineError, PlanError};
use petgraph::graphmap::DiGraphMap;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// One job, analyzed and ready to schedule
#[derive(Debug, Clone)]
pub struct JobPlan {
    pub name: String,
    pub spec: JobSpec,
    /// Arguments parsed into expression trees
    pub args: BTreeMap<String, ArgExpr>,
    /// Jobs that must complete before this one launches
    pub dependencies: Vec<String>,
}

/// Immutable execution plan for one workflow document
#[derive(Debug, Clone)]
pub struct WorkflowPlan {
    pub spec: WorkflowSpec,
    pub jobs: BTreeMap<String, JobPlan>,
    /// Scheduling order: dependencies before dependents
    pub topsort: Vec<String>,
}

impl WorkflowPlan {
    pub fn job(&self, name: &str) -> Option<&JobPlan> {
        self.jobs.get(name)
    }

    pub fn dependencies(&self, name: &str) -> &[String] {
        self.jobs
            .get(name)
            .map(|j| j.dependencies.as_slice())
            .unwrap_or_default()
    }
}

/// Validate a loaded spec and derive its plan
pub fn build(mut spec: WorkflowSpec) -> Result<WorkflowPlan, EngineError> {
    validate::validate(&mut spec)?;

    if !spec.workflow.contains_key(RETURN_JOB) {
        return Err(PlanError::MissingReturn.into());
    }

    let mut jobs = BTreeMap::new();
    for (name, job_spec) in &spec.workflow {
        let mut args = BTreeMap::new();
        for (arg_name, value) in &job_spec.args {
            args.insert(arg_name.clone(), ArgExpr::parse(value)?);
        }
        let dependencies = dependencies_of(name, job_spec, &args, &spec)?;
        log::debug!("{name} depends on {dependencies:?}");
        jobs.insert(
            name.clone(),
            JobPlan {
                name: name.clone(),
                spec: job_spec.clone(),
                args,
                dependencies,
            },
        );
    }

    let topsort = linearize(&jobs)?;
    Ok(WorkflowPlan {
        spec,
        jobs,
        topsort,
    })
}

/// Infer the dependency set of one job from its arguments
fn dependencies_of(
    name: &str,
    job: &JobSpec,
    args: &BTreeMap<String, ArgExpr>,
    spec: &WorkflowSpec,
) -> Result<Vec<String>, EngineError> {
    // `elements` encodes an explicit union of jobs and overrides inference.
    if let Some(Value::Array(elements)) = job.args.get("elements") {
        let mut dependencies = Vec::new();
        for element in elements {
            let dep = element.as_str().ok_or_else(|| {
                EngineError::Parse(format!("job {name}: elements entries must be job names"))
            })?;
            require_job(name, dep, spec)?;
            if !dependencies.iter().any(|d| d == dep) {
                dependencies.push(dep.to_string());
            }
        }
        return check_self(name, dependencies);
    }

    let mut dependencies = Vec::new();
    for expr in args.values() {
        for referenced in expr.shallow_refs() {
            if spec.workflow.contains_key(referenced)
                && !dependencies.iter().any(|d| d == referenced)
            {
                dependencies.push(referenced.to_string());
            }
        }
    }

    // An `inputs.from` mapping names the producing job explicitly.
    if let Some(Value::Object(inputs)) = job.args.get("inputs") {
        if let Some(from) = inputs.get("from").and_then(Value::as_str) {
            require_job(name, from, spec)?;
            if !dependencies.iter().any(|d| d == from) {
                dependencies.push(from.to_string());
            }
        }
    }

    check_self(name, dependencies)
}

fn require_job(job: &str, dependency: &str, spec: &WorkflowSpec) -> Result<(), EngineError> {
    if spec.workflow.contains_key(dependency) {
        Ok(())
    } else {
        Err(PlanError::UnknownDependency {
            job: job.to_string(),
            dependency: dependency.to_string(),
        }
        .into())
    }
}

fn check_self(name: &str, dependencies: Vec<String>) -> Result<Vec<String>, EngineError> {
    if dependencies.iter().any(|d| d == name) {
        return Err(PlanError::CycleDetected(vec![name.to_string()]).into());
    }
    Ok(dependencies)
}

/// Kahn's algorithm with an ordered ready set: deterministic, dependencies
/// first, reverse-lexicographic tie-break among simultaneously ready jobs
fn linearize(jobs: &BTreeMap<String, JobPlan>) -> Result<Vec<String>, EngineError> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for name in jobs.keys() {
        graph.add_node(name.as_str());
    }
    for job in jobs.values() {
        for dep in &job.dependencies {
            graph.add_edge(dep.as_str(), job.name.as_str(), ());
        }
    }

    let mut indegree: BTreeMap<&str, usize> = jobs
        .values()
        .map(|j| (j.name.as_str(), j.dependencies.len()))
        .collect();
    let mut ready: BTreeSet<&str> = indegree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(n, _)| *n)
        .collect();

    let mut order = Vec::with_capacity(jobs.len());
    while let Some(&next) = ready.iter().next_back() {
        ready.remove(next);
        order.push(next.to_string());
        for successor in graph.neighbors(next) {
            let remaining = indegree.get_mut(successor).expect("known node");
            *remaining -= 1;
            if *remaining == 0 {
                ready.insert(successor);
            }
        }
    }

    if order.len() < jobs.len() {
        let mut cycle: Vec<String> = petgraph::algo::tarjan_scc(&graph)
            .into_iter()
            .find(|scc| scc.len() > 1)
            .map(|scc| scc.into_iter().map(str::to_string).collect())
            .unwrap_or_else(|| {
                jobs.keys()
                    .filter(|n| !order.contains(*n))
                    .cloned()
                    .collect()
            });
        cycle.sort();
        return Err(PlanError::CycleDetected(cycle).into());
    }
    Ok(order)
}
