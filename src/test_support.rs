//! Shared test doubles for unit tests

use crate::Result;
use crate::backend::{Backend, JobStatus, ResourcePool};
use crate::error::DeclFlowError;
use crate::model::Task;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

type Handler = Arc<dyn Fn(&Task) -> Result<Value> + Send + Sync>;

/// Scriptable in-process backend
///
/// Defaults to echoing the sub-task payload back as
/// `{"echo": <payload>, "task": <type>}`. Behavior is adjusted through the
/// builder methods below.
pub struct MockBackend {
    name: String,
    healthy: bool,
    health_check_fails: bool,
    delay: Option<Duration>,
    fail_first: AtomicU32,
    executions: AtomicU32,
    resources: Option<ResourcePool>,
    handler: Option<Handler>,
}

impl MockBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            healthy: true,
            health_check_fails: false,
            delay: None,
            fail_first: AtomicU32::new(0),
            executions: AtomicU32::new(0),
            resources: None,
            handler: None,
        }
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    pub fn health_check_fails(mut self) -> Self {
        self.health_check_fails = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail the first `n` executions before succeeding
    pub fn failing_first(self, n: u32) -> Self {
        self.fail_first.store(n, Ordering::SeqCst);
        self
    }

    pub fn with_resources(mut self, resources: ResourcePool) -> Self {
        self.resources = Some(resources);
        self
    }

    pub fn with_handler(
        mut self,
        handler: impl Fn(&Task) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn executions(&self) -> u32 {
        self.executions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, task: &Task) -> Result<Value> {
        self.executions.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let remaining = self.fail_first.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_first.store(remaining - 1, Ordering::SeqCst);
            return Err(DeclFlowError::backend(format!(
                "{} transient failure",
                self.name
            )));
        }

        match &self.handler {
            Some(handler) => handler(task),
            None => Ok(json!({
                "echo": task.payload,
                "task": task.task_type,
            })),
        }
    }

    async fn get_status(&self, job_id: &str) -> Result<JobStatus> {
        Ok(JobStatus {
            id: job_id.to_string(),
            status: "completed".to_string(),
            result: None,
            error: None,
            progress: Some(100),
        })
    }

    async fn is_healthy(&self) -> Result<bool> {
        if self.health_check_fails {
            return Err(DeclFlowError::backend(format!(
                "{} health probe exploded",
                self.name
            )));
        }
        Ok(self.healthy)
    }

    async fn get_resources(&self) -> Option<ResourcePool> {
        self.resources.clone()
    }
}
