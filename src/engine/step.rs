//! Shared per-step execution
//!
//! Both runners funnel every step through [`execute_step`]: runWhen
//! gating, forEach fan-out, template resolution, sub-task construction,
//! backend selection, retry, and timeout all live here. The runners differ
//! only in how they shape the context and when they consider a step
//! runnable.

use super::Engine;
use super::ExecutionHooks;
use super::context::{
    is_truthy, optional_failure_marker, skip_marker, value_type_name, with_iteration,
};
use super::retry::{retry_with_backoff, with_timeout};
use crate::constants::{
    RUN_WHEN_ALWAYS, RUN_WHEN_ON_DEMAND, SKIP_REASON_CONDITION, SKIP_REASON_ON_DEMAND,
    STEP_ID_PREFIX,
};
use crate::dsl::template::{resolve_inputs, resolve_str};
use crate::error::{DeclFlowError, Result};
use crate::model::{EventKind, Step, StepState, StepStatus, Task};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde_json::{Value, json};
use std::time::Instant;

/// How a step settled
pub(crate) enum Settled {
    Completed(Value),

    /// Pre-execution skip or absorbed optional failure; the marker is
    /// recorded as the step's result and dependents are unblocked
    Skipped {
        marker: Value,
        error: Option<String>,
    },

    /// Required-step failure; aborts the pipeline
    Failed(DeclFlowError),
}

/// Result of one step execution, timing included
pub(crate) struct StepOutcome {
    pub settled: Settled,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub retry_attempt: Option<u32>,
}

impl StepOutcome {
    fn pre_skip(marker: Value) -> Self {
        Self {
            settled: Settled::Skipped {
                marker,
                error: None,
            },
            started_at: None,
            completed_at: Utc::now(),
            duration_ms: 0,
            retry_attempt: None,
        }
    }
}

/// Default a step id to `step_<index>` when none was declared
pub(crate) fn default_step_id(step: &Step, index: usize) -> String {
    step.id
        .clone()
        .unwrap_or_else(|| format!("{STEP_ID_PREFIX}{index}"))
}

/// Integer progress percentage
pub(crate) fn progress_pct(settled: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (100.0 * settled as f64 / total as f64).round() as u8
}

pub(crate) fn secs_to_ms(secs: f64) -> u64 {
    (secs.max(0.0) * 1000.0).round() as u64
}

/// Effective timeout for a step: step-level wins over the task's resource hint
fn step_timeout_ms(step: &Step, parent: &Task) -> Option<u64> {
    step.timeout
        .or_else(|| parent.resources.as_ref().and_then(|r| r.timeout))
        .map(secs_to_ms)
}

/// Build the sub-task dispatched to a backend for one step (or one
/// forEach item); step-level resources and retry override task-level
fn build_sub_task(parent: &Task, step: &Step, payload: std::collections::HashMap<String, Value>) -> Task {
    Task {
        task_type: step.task.clone(),
        backend: parent.backend.clone(),
        payload,
        resources: step.resources.clone().or_else(|| parent.resources.clone()),
        retry: step.retry.clone().or_else(|| parent.retry.clone()),
        ..Default::default()
    }
}

/// Execute a single step against the given context
///
/// Never returns an error directly: failures are folded into the outcome
/// so callers get timing either way. Emits the step's share of the event
/// stream.
pub(crate) async fn execute_step(
    engine: &Engine,
    parent: &Task,
    step: &Step,
    step_id: &str,
    ctx: &Value,
    hooks: &ExecutionHooks,
) -> StepOutcome {
    match step.run_when.as_deref() {
        None | Some(RUN_WHEN_ALWAYS) => {}
        Some(RUN_WHEN_ON_DEMAND) => {
            tracing::debug!(step = step_id, "skipping on-demand step");
            let marker = skip_marker(SKIP_REASON_ON_DEMAND, None);
            hooks.emit(
                EventKind::StepComplete,
                Some(step_id),
                Some(step.task.as_str()),
                marker.clone(),
            );
            return StepOutcome::pre_skip(marker);
        }
        Some(condition) => {
            let resolved = resolve_str(condition, ctx);
            if !is_truthy(resolved.as_ref()) {
                tracing::debug!(step = step_id, condition, "skipping step, condition is falsy");
                let marker = skip_marker(SKIP_REASON_CONDITION, Some(condition));
                hooks.emit(
                    EventKind::StepComplete,
                    Some(step_id),
                    Some(step.task.as_str()),
                    marker.clone(),
                );
                return StepOutcome::pre_skip(marker);
            }
        }
    }

    let started_at = Utc::now();
    let clock = Instant::now();
    hooks.emit(EventKind::StepStart, Some(step_id), Some(step.task.as_str()), json!({}));
    tracing::debug!(step = step_id, task = %step.task, "step started");

    let mut last_attempt = None;
    let executed = match &step.for_each {
        Some(template) => execute_for_each(engine, parent, step, step_id, template, ctx).await,
        None => execute_leaf(engine, parent, step, step_id, ctx, &mut last_attempt).await,
    };

    let duration_ms = clock.elapsed().as_millis() as u64;
    let completed_at = Utc::now();

    match executed {
        Ok(result) => {
            hooks.emit(
                EventKind::StepComplete,
                Some(step_id),
                Some(step.task.as_str()),
                result.clone(),
            );
            tracing::debug!(step = step_id, duration_ms, "step completed");
            StepOutcome {
                settled: Settled::Completed(result),
                started_at: Some(started_at),
                completed_at,
                duration_ms,
                retry_attempt: last_attempt,
            }
        }
        Err(error) if step.optional => {
            let text = error.to_string();
            tracing::warn!(step = step_id, error = %text, "optional step failed, skipping");
            hooks.emit(
                EventKind::StepError,
                Some(step_id),
                Some(step.task.as_str()),
                json!({"error": text, "optional": true}),
            );
            StepOutcome {
                settled: Settled::Skipped {
                    marker: optional_failure_marker(&text),
                    error: Some(text),
                },
                started_at: Some(started_at),
                completed_at,
                duration_ms,
                retry_attempt: last_attempt,
            }
        }
        Err(error) => {
            hooks.emit(
                EventKind::StepError,
                Some(step_id),
                Some(step.task.as_str()),
                json!({"error": error.to_string(), "optional": false}),
            );
            StepOutcome {
                settled: Settled::Failed(error),
                started_at: Some(started_at),
                completed_at,
                duration_ms,
                retry_attempt: last_attempt,
            }
        }
    }
}

/// Execute a plain (non-forEach) step
async fn execute_leaf(
    engine: &Engine,
    parent: &Task,
    step: &Step,
    label: &str,
    ctx: &Value,
    last_attempt: &mut Option<u32>,
) -> Result<Value> {
    let payload = resolve_inputs(&step.input, ctx);
    let sub_task = build_sub_task(parent, step, payload);
    let backend = engine.registry().select(&sub_task).await?;
    let retry = sub_task
        .retry
        .clone()
        .or_else(|| engine.config().default_retry.clone())
        .unwrap_or_default();
    let timeout_ms = step_timeout_ms(step, parent);

    with_timeout(
        label,
        timeout_ms,
        retry_with_backoff(
            &retry,
            |attempt| *last_attempt = Some(attempt),
            || backend.execute(&sub_task),
        ),
    )
    .await
}

/// Fan a step out over the items of a resolved array
///
/// Items run concurrently in serial batches of `min(len, cap)`, each with
/// its own retry state and timeout; results keep input order.
async fn execute_for_each(
    engine: &Engine,
    parent: &Task,
    step: &Step,
    step_id: &str,
    template: &str,
    ctx: &Value,
) -> Result<Value> {
    let resolved = resolve_str(template, ctx);
    let items = match resolved {
        Some(Value::Array(items)) => items,
        other => {
            return Err(DeclFlowError::ForEachNotArray {
                template: template.to_string(),
                got: value_type_name(other.as_ref()),
            });
        }
    };

    if items.is_empty() {
        return Ok(Value::Array(Vec::new()));
    }

    let cap = step
        .for_each_concurrency
        .or(engine.config().default_for_each_concurrency)
        .unwrap_or(items.len())
        .clamp(1, items.len());

    tracing::debug!(step = step_id, items = items.len(), cap, "fanning out forEach");

    let mut results = Vec::with_capacity(items.len());
    for (batch_idx, batch) in items.chunks(cap).enumerate() {
        let futures = batch.iter().enumerate().map(|(offset, item)| {
            let index = batch_idx * cap + offset;
            let item_ctx = with_iteration(ctx, item, index);
            let label = format!("{step_id}[{index}]");
            async move {
                let payload = resolve_inputs(&step.input, &item_ctx);
                let sub_task = build_sub_task(parent, step, payload);
                let backend = engine.registry().select(&sub_task).await?;
                let retry = sub_task
                    .retry
                    .clone()
                    .or_else(|| engine.config().default_retry.clone())
                    .unwrap_or_default();
                let timeout_ms = step_timeout_ms(step, parent);

                with_timeout(
                    &label,
                    timeout_ms,
                    retry_with_backoff(&retry, |_| {}, || backend.execute(&sub_task)),
                )
                .await
            }
        });

        for result in join_all(futures).await {
            results.push(result?);
        }
    }

    Ok(Value::Array(results))
}

/// Copy an outcome onto the step's status record
pub(crate) fn apply_outcome(status: &mut StepStatus, outcome: &StepOutcome) {
    status.started_at = outcome.started_at;
    status.completed_at = Some(outcome.completed_at);
    status.duration = Some(outcome.duration_ms);
    status.retry_attempt = outcome.retry_attempt;

    match &outcome.settled {
        Settled::Completed(result) => {
            status.status = StepState::Completed;
            status.result = Some(result.clone());
        }
        Settled::Skipped { marker, error } => {
            status.status = StepState::Skipped;
            status.result = Some(marker.clone());
            status.error = error.clone();
        }
        Settled::Failed(error) => {
            status.status = StepState::Failed;
            status.error = Some(error.to_string());
        }
    }
}
