//! Execution backends
//!
//! Backends are named adapters capable of executing a task type
//! out-of-process. The engine consumes them through the [`Backend`] trait
//! and never talks to a concrete service directly; selection goes through
//! the process-wide [`BackendRegistry`].

pub mod registry;

use crate::Result;
use crate::model::Task;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use registry::BackendRegistry;

/// Status of a job previously handed to a backend
///
/// Consumed by the surrounding HTTP surface when polling, not by the
/// engine itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub id: String,

    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Progress percentage, when the backend reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

/// A GPU advertised by a backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuInfo {
    pub name: String,

    /// VRAM in megabytes
    pub vram: u64,

    /// True when the GPU is free to take work
    pub available: bool,
}

/// A memory figure advertised by a backend, in megabytes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemInfo {
    pub total: u64,
    pub available: u64,
}

/// Resources a backend currently advertises
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcePool {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub gpus: Vec<GpuInfo>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ram: Option<MemInfo>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vram: Option<MemInfo>,
}

/// A pluggable execution backend
///
/// Implementations are remote compute services; the engine wraps `execute`
/// with its own retry and timeout handling, so implementations should fail
/// fast rather than retry internally.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Registered backend name
    fn name(&self) -> &str;

    /// Execute a task and return its result
    async fn execute(&self, task: &Task) -> Result<Value>;

    /// Fetch the status of a previously submitted job
    async fn get_status(&self, job_id: &str) -> Result<JobStatus>;

    /// Health probe; an error counts as unhealthy during selection
    async fn is_healthy(&self) -> Result<bool>;

    /// Cancel a running job; backends without cancellation return false
    async fn cancel(&self, _job_id: &str) -> Result<bool> {
        Ok(false)
    }

    /// Advertise current resources, when the backend tracks them
    async fn get_resources(&self) -> Option<ResourcePool> {
        None
    }
}

impl std::fmt::Debug for dyn Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend").field("name", &self.name()).finish()
    }
}

#[cfg(test)]
mod registry_test;
