//! Core data models for declflow
//!
//! This module contains the data structures that describe declarative tasks,
//! pipeline steps, retry policies, resource hints, and the structured results
//! the engine hands back to callers. Field names follow the wire spelling
//! used by task submissions (`dependsOn`, `forEach`, `runWhen`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A declarative unit of work
///
/// A task without `steps` is a single backend call; a task with `steps` is a
/// pipeline, executed by either the sequential or the DAG runner. Tasks are
/// ephemeral: the engine never mutates the submitted task in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Task {
    /// Task type identifier, routed by the backend (REQUIRED)
    #[serde(rename = "type")]
    pub task_type: String,

    /// Backend hint: a registered backend name, or "auto"/absent for any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,

    /// Queue hint, interpreted by the enclosing job queue
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,

    /// Priority hint, interpreted by the enclosing job queue
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,

    /// Input payload forwarded to the backend
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub payload: HashMap<String, Value>,

    /// Pipeline steps; presence converts the task into a pipeline
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Step>,

    /// Advisory resource requirements, forwarded to backends
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    /// Task-level retry policy, inherited by steps unless overridden
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetrySpec>,

    /// Deferred-submission delay in milliseconds; declarative only, the
    /// queue interprets it, never the engine
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,

    /// Cron expression for recurring submission; declarative only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,

    /// Effects fired by the enclosing task runner when the task is queued
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub on_pending: Vec<Effect>,

    /// Effects fired by the enclosing task runner on progress updates
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub on_progress: Vec<Effect>,

    /// Effects fired by the enclosing task runner on success
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub on_success: Vec<Effect>,

    /// Effects fired by the enclosing task runner on error
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub on_error: Vec<Effect>,
}

impl Task {
    /// Create a single-unit task of the given type
    pub fn new(task_type: impl Into<String>) -> Self {
        Self {
            task_type: task_type.into(),
            ..Default::default()
        }
    }

    /// True when this task is a pipeline
    pub fn is_pipeline(&self) -> bool {
        !self.steps.is_empty()
    }
}

/// A declarative unit inside a pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Step {
    /// Step identifier; defaults to `step_<index>` when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Task type executed by this step (REQUIRED)
    pub task: String,

    /// Input mapping; whole-string `{{path}}` values are resolved against
    /// the execution context, everything else passes through unchanged
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub input: HashMap<String, Value>,

    /// Ids of steps that must complete before this one starts
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    /// Template resolving to an array; fans the step out per item
    #[serde(skip_serializing_if = "Option::is_none")]
    pub for_each: Option<String>,

    /// Concurrency cap for forEach fan-out
    #[serde(skip_serializing_if = "Option::is_none")]
    pub for_each_concurrency: Option<usize>,

    /// Execution condition: "always", "on-demand", or a template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_when: Option<String>,

    /// Step timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,

    /// When true, a failure becomes a skip and dependents still run
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,

    /// Per-step resource override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    /// Per-step retry override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetrySpec>,
}

/// Retry policy for a task, step, or forEach item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrySpec {
    /// Total attempts including the first; 1 means no retry
    pub attempts: u32,

    /// Backoff strategy between attempts
    pub backoff: Backoff,

    /// Base delay between attempts in milliseconds
    pub delay: u64,
}

impl Default for RetrySpec {
    fn default() -> Self {
        Self {
            attempts: 1,
            backoff: Backoff::Fixed,
            delay: 0,
        }
    }
}

/// Backoff strategy for the retry loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// Constant delay between attempts
    #[default]
    Fixed,

    /// `delay * 2^(attempt-1)`
    Exponential,
}

/// Advisory resource requirements declared on a task or step
///
/// Consumed by the registry's selection policy and forwarded to backends;
/// the engine never reserves resources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceRequirements {
    /// Required GPU type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu: Option<String>,

    /// Required VRAM in megabytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vram: Option<u64>,

    /// Required RAM in megabytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ram: Option<u64>,

    /// Required CPU cores
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u32>,

    /// Timeout hint in seconds; step-level `timeout` wins over it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,
}

/// A declarative side effect attached to a task lifecycle list
///
/// The engine passes these through untouched; the enclosing task runner
/// fires them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Effect {
    /// Effect kind: "toast", "webhook", "notify", "enqueue", "invalidate",
    /// or "emit"
    #[serde(rename = "$event")]
    pub event: String,

    /// Effect-specific parameters
    #[serde(flatten)]
    pub params: HashMap<String, Value>,
}

/// Step lifecycle state
///
/// `pending -> running -> (completed | failed | skipped)`; terminal states
/// are final.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepState {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl StepState {
    /// True for completed, failed, and skipped
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepState::Completed | StepState::Failed | StepState::Skipped
        )
    }
}

/// Structured per-step status exposed through [`PipelineResult`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepStatus {
    /// Step id after defaulting
    pub id: String,

    /// Task type the step executes
    pub task: String,

    /// Current lifecycle state
    pub status: StepState,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Wall-clock duration in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,

    /// Error text for failed steps and absorbed optional failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Last attempt number reported by the retry loop
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_attempt: Option<u32>,
}

impl StepStatus {
    /// Initialise a pending status record for a step
    pub fn pending(id: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            task: task.into(),
            status: StepState::Pending,
            started_at: None,
            completed_at: None,
            duration: None,
            error: None,
            result: None,
            retry_attempt: None,
        }
    }
}

/// Structured result of a pipeline execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    /// Results by declared step index; skipped slots hold skip markers
    pub steps: Vec<Value>,

    /// Results by step id
    pub step_results: HashMap<String, Value>,

    /// Per-step status records, by declared step index
    pub step_status: Vec<StepStatus>,

    /// The final step's result
    pub final_result: Value,

    /// Total wall-clock duration in milliseconds
    pub total_duration: u64,

    /// Sets of step ids dispatched together in one scheduling tick
    /// (recorded when the set has more than one member)
    pub parallel_groups: Vec<Vec<String>>,
}

/// Event kinds carried on the pipeline event stream
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventKind {
    #[serde(rename = "step:start")]
    StepStart,

    #[serde(rename = "step:complete")]
    StepComplete,

    #[serde(rename = "step:error")]
    StepError,

    #[serde(rename = "pipeline:complete")]
    PipelineComplete,
}

/// A single event on the pipeline event stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineEvent {
    pub kind: EventKind,

    /// Step id, or None for pipeline-level events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,

    /// Task type of the step, or None for pipeline-level events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,

    pub timestamp: DateTime<Utc>,

    /// Opaque event payload
    pub data: Value,
}

/// Engine tuning knobs
///
/// The defaults reproduce the engine's documented behavior exactly; the
/// enclosing service deserializes this from its own configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Retry policy applied when neither the task nor the step declares one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_retry: Option<RetrySpec>,

    /// forEach concurrency cap applied when the step does not declare one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_for_each_concurrency: Option<usize>,
}

#[cfg(test)]
#[path = "model_test.rs"]
mod model_test;
