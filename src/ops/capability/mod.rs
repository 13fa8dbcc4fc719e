// SPDX-License-Identifier: MIT

//! Capability interfaces consumed by the engine core
//!
//! Each external collaborator (graph store, result cache, HTTP transport,
//! clock) is reached through a narrow trait; in-process implementations
//! back tests and embedded runs.

pub mod cache;
pub mod clock;
pub mod graph;
pub mod http;

pub use cache::{Cache, FileCache, MemoryCache};
pub use clock::{Clock, TokioClock};
pub use graph::{GraphStore, MemoryGraphStore};
pub use http::{Http, HttpResponse, ReqwestHttp, DEFAULT_TIMEOUT};
