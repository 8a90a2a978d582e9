//! Execution engine for declarative tasks
//!
//! The engine routes a submitted [`Task`] to the right execution path:
//! single backend call, chunked execution, the legacy sequential runner, or
//! the DAG runner. It wires progress and event callbacks through whichever
//! path runs.

pub mod context;
pub mod dag;
pub mod retry;
pub mod sequential;
mod step;

use crate::backend::BackendRegistry;
use crate::error::Result;
use crate::model::{EngineConfig, EventKind, PipelineEvent, PipelineResult, Task};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

/// Progress callback: receives an integer percentage
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

/// Event callback: receives every event on the pipeline stream
pub type EventCallback = Arc<dyn Fn(PipelineEvent) + Send + Sync>;

/// Optional observation hooks wired through a task execution
#[derive(Clone, Default)]
pub struct ExecutionHooks {
    pub on_progress: Option<ProgressCallback>,
    pub on_event: Option<EventCallback>,
}

impl ExecutionHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(mut self, callback: impl Fn(u8) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub fn with_events(mut self, callback: impl Fn(PipelineEvent) + Send + Sync + 'static) -> Self {
        self.on_event = Some(Arc::new(callback));
        self
    }

    pub(crate) fn progress(&self, pct: u8) {
        if let Some(callback) = &self.on_progress {
            callback(pct);
        }
    }

    pub(crate) fn emit(
        &self,
        kind: EventKind,
        step_id: Option<&str>,
        task: Option<&str>,
        data: Value,
    ) {
        if let Some(callback) = &self.on_event {
            callback(PipelineEvent {
                kind,
                step_id: step_id.map(str::to_string),
                task: task.map(str::to_string),
                timestamp: Utc::now(),
                data,
            });
        }
    }
}

/// Strategy for splitting an oversized single task into sub-tasks
///
/// Chunking policy is an external concern; the engine only executes each
/// chunk as a plain task and re-assembles the parts.
pub trait ChunkPlanner: Send + Sync {
    /// Whether this task should be chunked at all
    fn should_chunk(&self, task: &Task) -> bool;

    /// Split the task into independently executable sub-tasks
    fn split(&self, task: &Task) -> Vec<Task>;

    /// Re-assemble chunk results, in split order, into one result
    fn assemble(&self, parts: Vec<Value>) -> Value;
}

/// What a task execution produced
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    /// Result of a single backend call (no steps)
    Single(Value),

    /// Structured result of a pipeline
    Pipeline(PipelineResult),
}

impl TaskOutcome {
    pub fn single(self) -> Option<Value> {
        match self {
            TaskOutcome::Single(value) => Some(value),
            TaskOutcome::Pipeline(_) => None,
        }
    }

    pub fn pipeline(self) -> Option<PipelineResult> {
        match self {
            TaskOutcome::Pipeline(result) => Some(result),
            TaskOutcome::Single(_) => None,
        }
    }
}

/// declflow execution engine
///
/// Cheap to construct; holds a handle to the backend registry and the
/// engine configuration. `Engine::new()` uses the process-wide registry;
/// tests inject an isolated one via [`Engine::with_registry`].
pub struct Engine {
    registry: Arc<BackendRegistry>,
    config: EngineConfig,
}

impl Engine {
    /// Engine over the process-wide backend registry
    pub fn new() -> Self {
        Self::with_registry(BackendRegistry::global())
    }

    /// Engine over an explicit registry instance
    pub fn with_registry(registry: Arc<BackendRegistry>) -> Self {
        Self {
            registry,
            config: EngineConfig::default(),
        }
    }

    /// Replace the engine configuration
    pub fn configured(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub(crate) fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    pub(crate) fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Process a declarative task
    ///
    /// Pipelines go to the DAG runner when any step declares an `id` or a
    /// dependency, and to the sequential runner otherwise. Tasks without
    /// steps are either chunked (when the planner says so) or executed as
    /// one retry-wrapped backend call.
    pub async fn process_task(
        &self,
        task: &Task,
        hooks: &ExecutionHooks,
        chunking: Option<&dyn ChunkPlanner>,
    ) -> Result<TaskOutcome> {
        if task.is_pipeline() {
            let use_dag = task
                .steps
                .iter()
                .any(|s| s.id.is_some() || !s.depends_on.is_empty());
            let result = if use_dag {
                dag::run_dag(self, task, hooks).await?
            } else {
                sequential::run_sequential(self, task, hooks).await?
            };
            return Ok(TaskOutcome::Pipeline(result));
        }

        if let Some(planner) = chunking
            && planner.should_chunk(task)
        {
            return Ok(TaskOutcome::Single(self.process_chunked(task, planner).await?));
        }

        let backend = self.registry.select(task).await?;
        let retry = task
            .retry
            .clone()
            .or_else(|| self.config.default_retry.clone())
            .unwrap_or_default();
        let timeout_ms = task
            .resources
            .as_ref()
            .and_then(|r| r.timeout)
            .map(step::secs_to_ms);

        let result = retry::with_timeout(
            &task.task_type,
            timeout_ms,
            retry::retry_with_backoff(&retry, |_| {}, || backend.execute(task)),
        )
        .await?;

        Ok(TaskOutcome::Single(result))
    }

    async fn process_chunked(&self, task: &Task, planner: &dyn ChunkPlanner) -> Result<Value> {
        let chunks = planner.split(task);
        tracing::debug!(chunks = chunks.len(), task = %task.task_type, "executing chunked task");

        let mut parts = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let backend = self.registry.select(chunk).await?;
            let retry = chunk
                .retry
                .clone()
                .or_else(|| task.retry.clone())
                .or_else(|| self.config.default_retry.clone())
                .unwrap_or_default();
            let part = retry::retry_with_backoff(&retry, |_| {}, || backend.execute(chunk)).await?;
            parts.push(part);
        }

        Ok(planner.assemble(parts))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
