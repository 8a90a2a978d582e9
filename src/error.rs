//! Error types for declflow
//!
//! This module provides the error hierarchy for the pipeline engine using
//! thiserror. Message strings for backend selection, timeouts, deadlocks and
//! forEach type mismatches are stable and surfaced verbatim to callers.

use thiserror::Error;

/// Main error type for declflow operations
#[derive(Error, Debug)]
pub enum DeclFlowError {
    #[error("Backend \"{0}\" not registered")]
    BackendNotRegistered(String),

    #[error("Backend \"{0}\" is not healthy")]
    BackendUnhealthy(String),

    #[error("No healthy backend available")]
    NoHealthyBackend,

    #[error(
        "Pipeline deadlock: cannot run remaining steps [{}]. Check for circular dependencies or missing dependency IDs.",
        .0.join(", ")
    )]
    PipelineDeadlock(Vec<String>),

    #[error("\"{label}\" timed out after {timeout_ms}ms")]
    Timeout { label: String, timeout_ms: u64 },

    #[error("forEach template \"{template}\" did not resolve to array, got: {got}")]
    ForEachNotArray {
        template: String,
        got: &'static str,
    },

    #[error("Step execution failed: {step_id}: {message}")]
    StepExecution { step_id: String, message: String },

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Convenient result type for declflow operations
pub type Result<T> = std::result::Result<T, DeclFlowError>;

impl DeclFlowError {
    /// Create a backend error
    #[inline]
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        DeclFlowError::Backend(msg.into())
    }

    /// Create a timeout error
    #[inline]
    pub fn timeout<S: Into<String>>(label: S, timeout_ms: u64) -> Self {
        DeclFlowError::Timeout {
            label: label.into(),
            timeout_ms,
        }
    }

    /// Create a step execution error
    #[inline]
    pub fn step_execution<S: Into<String>>(step_id: S, message: S) -> Self {
        DeclFlowError::StepExecution {
            step_id: step_id.into(),
            message: message.into(),
        }
    }

    /// Create a deadlock error listing the task types of unresolved steps
    #[inline]
    pub fn deadlock(remaining_tasks: Vec<String>) -> Self {
        DeclFlowError::PipelineDeadlock(remaining_tasks)
    }
}
