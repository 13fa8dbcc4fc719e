// SPDX-License-Identifier: MIT

//! Workflow document loader
//!
//! Parses YAML workflow documents, resolves `import` chains against a
//! library search path, merges template bodies into the jobs extending
//! them, and checks document-level invariants (version, non-empty
//! workflow) before handing a typed spec to the planner.

use crate::engine::merge::{deep_update, OVERWRITE_KEYS, SKIP_KEYS};
use crate::engine::types::WorkflowSpec;
use crate::ops::error::EngineError;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// File extension for workflow modules on the library path
pub const MODULE_EXTENSION: &str = "kgf";

/// Engine-supported document major version
const SUPPORTED_MAJOR: u64 = 0;

pub struct WorkflowLoader {
    library_path: Vec<PathBuf>,
}

impl WorkflowLoader {
    pub fn new(library_path: Vec<PathBuf>) -> Self {
        Self { library_path }
    }

    /// Load a workflow document from a file
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<WorkflowSpec, EngineError> {
        let content = std::fs::read_to_string(path)?;
        self.load_str(&content)
    }

    /// Load a workflow document from YAML text
    pub fn load_str(&self, content: &str) -> Result<WorkflowSpec, EngineError> {
        let tree = parse_yaml(content)?;
        self.load_tree(tree)
    }

    /// Load an already-parsed workflow document tree
    pub fn load_tree(&self, mut tree: Value) -> Result<WorkflowSpec, EngineError> {
        let mut seen = HashSet::new();
        self.resolve_imports(&mut tree, &mut seen)?;
        merge_templates(&mut tree);

        let spec: WorkflowSpec = serde_json::from_value(tree)
            .map_err(|e| EngineError::Parse(e.to_string()))?;
        check_version(&spec.info.version)?;
        if spec.workflow.is_empty() {
            return Err(EngineError::Parse(
                "workflow must declare at least one job".to_string(),
            ));
        }
        Ok(spec)
    }

    /// Merge every imported module into `tree`, depth first
    fn resolve_imports(
        &self,
        tree: &mut Value,
        seen: &mut HashSet<String>,
    ) -> Result<(), EngineError> {
        let imports = match tree.get("import") {
            Some(Value::Array(list)) => list
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect::<Vec<_>>(),
            Some(other) => {
                return Err(EngineError::Parse(format!(
                    "import must be a list of module names, got {other}"
                )))
            }
            None => Vec::new(),
        };

        for module in imports {
            if !seen.insert(module.clone()) {
                log::debug!("module {module} already merged, skipping");
                continue;
            }
            let mut imported = self.read_module(&module)?;
            self.resolve_imports(&mut imported, seen)?;
            deep_update(tree, &imported, OVERWRITE_KEYS, SKIP_KEYS);
        }

        if let Some(map) = tree.as_object_mut() {
            map.remove("import");
        }
        Ok(())
    }

    fn read_module(&self, module: &str) -> Result<Value, EngineError> {
        for dir in &self.library_path {
            let file = dir.join(format!("{module}.{MODULE_EXTENSION}"));
            if file.exists() {
                log::info!("module: {module} from {}", file.display());
                let content = std::fs::read_to_string(&file)?;
                let mut tree = parse_yaml(&content)?;
                // Imported modules must not reintroduce themselves.
                if let Some(map) = tree.as_object_mut() {
                    map.remove("info");
                }
                return Ok(tree);
            }
        }
        Err(EngineError::Resolve {
            module: module.to_string(),
            searched: self.library_path.clone(),
        })
    }
}

/// Merge template bodies into every job whose `code` names a template
fn merge_templates(tree: &mut Value) {
    let templates = match tree.get("templates").cloned() {
        Some(Value::Object(map)) => map,
        _ => return,
    };
    let jobs = match tree.get_mut("workflow").and_then(Value::as_object_mut) {
        Some(jobs) => jobs,
        None => return,
    };
    for (name, job) in jobs.iter_mut() {
        let code = job.get("code").and_then(Value::as_str).unwrap_or_default();
        if let Some(template) = templates.get(code) {
            log::debug!("job {name} extends template {code}");
            deep_update(job, template, OVERWRITE_KEYS, SKIP_KEYS);
        }
    }
}

/// Parse YAML text into a JSON tree
fn parse_yaml(content: &str) -> Result<Value, EngineError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;
    serde_json::to_value(&yaml).map_err(|e| EngineError::Parse(e.to_string()))
}

/// Versions are `major.minor.patch` with a supported major
fn check_version(version: &str) -> Result<(), EngineError> {
    let parts: Vec<_> = version.split('.').collect();
    let numeric = parts.len() == 3 && parts.iter().all(|p| p.parse::<u64>().is_ok());
    if !numeric {
        return Err(EngineError::Parse(format!(
            "version must be major.minor.patch, got '{version}'"
        )));
    }
    let major: u64 = parts[0].parse().unwrap();
    if major != SUPPORTED_MAJOR {
        return Err(EngineError::Parse(format!(
            "unsupported document version {version}"
        )));
    }
    Ok(())
}

/// Parse CLI-style workflow inputs (`key=value`); comma-separated values
/// become lists
pub fn parse_inputs(args: &[String]) -> Result<Map<String, Value>, EngineError> {
    let mut inputs = Map::new();
    for arg in args {
        let (key, value) = arg
            .split_once('=')
            .ok_or_else(|| EngineError::Parse(format!("expected key=value, got '{arg}'")))?;
        let parsed = if value.contains(',') {
            Value::Array(
                value
                    .split(',')
                    .map(|v| Value::String(v.trim().to_string()))
                    .collect(),
            )
        } else {
            Value::String(value.to_string())
        };
        inputs.insert(key.to_string(), parsed);
    }
    Ok(inputs)
}
