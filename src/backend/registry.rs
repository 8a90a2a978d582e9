//! Backend registry and selection policy
//!
//! Process-wide mapping from backend name to backend handle. Registration
//! order is significant: "auto" selection returns the first healthy backend
//! in insertion order, so the list is kept ordered behind a reader-writer
//! lock rather than hashed.

use super::Backend;
use crate::constants::BACKEND_AUTO;
use crate::error::{DeclFlowError, Result};
use crate::model::Task;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::Arc;

static GLOBAL: Lazy<Arc<BackendRegistry>> = Lazy::new(|| Arc::new(BackendRegistry::new()));

/// Registry of execution backends
pub struct BackendRegistry {
    backends: RwLock<Vec<Arc<dyn Backend>>>,
}

impl BackendRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            backends: RwLock::new(Vec::new()),
        }
    }

    /// The process-wide registry shared by all pipelines
    pub fn global() -> Arc<BackendRegistry> {
        GLOBAL.clone()
    }

    /// Register a backend; re-registering a name replaces the prior entry
    pub fn register(&self, backend: Arc<dyn Backend>) {
        let mut backends = self.backends.write();
        match backends.iter().position(|b| b.name() == backend.name()) {
            Some(idx) => backends[idx] = backend,
            None => backends.push(backend),
        }
    }

    /// Remove a backend by name; returns true when one was removed
    pub fn unregister(&self, name: &str) -> bool {
        let mut backends = self.backends.write();
        let before = backends.len();
        backends.retain(|b| b.name() != name);
        backends.len() != before
    }

    /// Look up a backend by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Backend>> {
        self.backends
            .read()
            .iter()
            .find(|b| b.name() == name)
            .cloned()
    }

    /// All registered backends, in insertion order
    pub fn all(&self) -> Vec<Arc<dyn Backend>> {
        self.backends.read().clone()
    }

    /// Remove every backend
    pub fn clear(&self) {
        self.backends.write().clear();
    }

    /// Select a backend for a task
    ///
    /// A named hint must resolve to a registered, healthy backend. "auto"
    /// (or no hint) picks from the healthy set, preferring a backend with an
    /// available GPU when the task requires one. Selection is advisory: it
    /// reserves nothing.
    pub async fn select(&self, task: &Task) -> Result<Arc<dyn Backend>> {
        match task.backend.as_deref() {
            Some(name) if name != BACKEND_AUTO => {
                let backend = self
                    .get(name)
                    .ok_or_else(|| DeclFlowError::BackendNotRegistered(name.to_string()))?;
                match backend.is_healthy().await {
                    Ok(true) => Ok(backend),
                    _ => Err(DeclFlowError::BackendUnhealthy(name.to_string())),
                }
            }
            _ => self.select_auto(task).await,
        }
    }

    async fn select_auto(&self, task: &Task) -> Result<Arc<dyn Backend>> {
        // Snapshot outside the lock; health probes await.
        let candidates = self.all();

        let mut healthy = Vec::new();
        for backend in candidates {
            match backend.is_healthy().await {
                Ok(true) => healthy.push(backend),
                Ok(false) => {
                    tracing::debug!(backend = backend.name(), "skipping unhealthy backend");
                }
                Err(e) => {
                    tracing::debug!(
                        backend = backend.name(),
                        error = %e,
                        "health check failed, treating backend as unhealthy"
                    );
                }
            }
        }

        if healthy.is_empty() {
            return Err(DeclFlowError::NoHealthyBackend);
        }

        let wants_gpu = task
            .resources
            .as_ref()
            .is_some_and(|r| r.gpu.is_some());
        if wants_gpu {
            for backend in &healthy {
                if let Some(pool) = backend.get_resources().await
                    && pool.gpus.iter().any(|g| g.available)
                {
                    tracing::debug!(
                        backend = backend.name(),
                        task = %task.task_type,
                        "selected backend with available GPU"
                    );
                    return Ok(backend.clone());
                }
            }
        }

        Ok(healthy[0].clone())
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
