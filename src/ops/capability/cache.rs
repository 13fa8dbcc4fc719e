// SPDX-License-Identifier: MIT

//! Result cache capability
//!
//! The engine memoises job results under two key families:
//! `<runId>.<jobName>.res` for per-run results and
//! `<jobName>-<operatorCode>[_<opName>]` for router-level memoisation.
//! Keys are ASCII; values are opaque bytes (the engine stores canonical
//! JSON). Implementations must guarantee read-your-own-writes within a
//! single run.

use crate::ops::error::EngineError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, EngineError>;
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), EngineError>;
}

/// Process-local cache, used by tests and embedded runs
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, EngineError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), EngineError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

/// Durable cache storing one file per key under a root directory
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, EngineError> {
        // Keys are cache-internal, but refuse anything that would escape the root.
        if key.is_empty() || key.contains(std::path::MAIN_SEPARATOR) || key.contains("..") {
            return Err(EngineError::capability(format!("invalid cache key: {key}")));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl Cache for FileCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, EngineError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), EngineError> {
        let path = self.path_for(key)?;
        tokio::fs::write(&path, value).await?;
        Ok(())
    }
}
