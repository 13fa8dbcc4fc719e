// SPDX-License-Identifier: MIT

//! Signature validation against the standard-library type catalogue

use crate::engine::types::{TypeEntry, WorkflowSpec};
use crate::ops::error::{EngineError, ValidationFailed, ValidationIssue};
use std::collections::BTreeMap;

const STDLIB: &str = include_str!("../../assets/stdlib.yaml");

#[derive(serde::Deserialize)]
struct Catalogue {
    types: BTreeMap<String, TypeEntry>,
}

/// Load the embedded standard-library type catalogue
pub fn load_catalogue() -> Result<BTreeMap<String, TypeEntry>, EngineError> {
    let catalogue: Catalogue = serde_yaml::from_str(STDLIB)?;
    Ok(catalogue.types)
}

/// Attach the catalogue to the spec and check every job signature.
///
/// All issues are collected; any issue aborts plan construction.
pub fn validate(spec: &mut WorkflowSpec) -> Result<(), EngineError> {
    spec.types = load_catalogue()?;

    let mut issues = Vec::new();
    for (job_name, job) in &spec.workflow {
        let op = job.op();
        let signature = match job.meta.get(op) {
            Some(sig) => sig,
            None => continue,
        };
        for (arg_name, arg_spec) in &signature.args {
            log::debug!(
                "{job_name}: arg {arg_name} type {} required {}",
                arg_spec.type_name,
                arg_spec.required
            );
            if !spec.types.contains_key(&arg_spec.type_name) {
                issues.push(ValidationIssue::UnknownType {
                    type_name: arg_spec.type_name.clone(),
                    job: job_name.clone(),
                });
            }
            if arg_spec.required && !job.args.contains_key(arg_name) {
                issues.push(ValidationIssue::MissingRequiredArg {
                    arg: arg_name.clone(),
                    job: job_name.clone(),
                });
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationFailed { issues }.into())
    }
}
