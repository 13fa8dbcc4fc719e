// SPDX-License-Identifier: MIT

//! kgflow - a declarative workflow engine for knowledge-graph services
//!
//! A workflow document declares named jobs; each job invokes a typed
//! operator and produces a result graph fragment. The engine parses and
//! links the document, validates argument types, derives the dependency
//! DAG, executes jobs concurrently with a persistent result cache, and
//! folds every result into a shared knowledge graph.

pub mod engine;
pub mod ops;

pub use engine::executor::{Executor, RunReport};
pub use engine::facade::{Capabilities, WorkflowContext};
pub use engine::loader::{parse_inputs, WorkflowLoader};
pub use engine::operator::{Event, Operator, Plugin};
pub use engine::plan::WorkflowPlan;
pub use engine::router::Router;
pub use engine::runtime::{Runtime, RuntimeBuilder, RuntimeOptions};
pub use engine::types::WorkflowSpec;
pub use ops::error::EngineError;
