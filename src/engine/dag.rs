//! DAG pipeline runner
//!
//! Interprets the step dependency graph by topological readiness: every
//! scheduling tick dispatches the whole runnable set concurrently, awaits
//! the batch, and folds the outcomes back into the membership sets. New
//! runnable steps arrive as their dependencies settle. The scheduler's
//! bookkeeping (sets, results, statuses, groups) is only ever touched
//! between awaits, so one logical executor owns all of it.

use super::Engine;
use super::ExecutionHooks;
use super::context::dag_context;
use super::step::{Settled, apply_outcome, default_step_id, execute_step, progress_pct};
use crate::constants::SCHEDULER_TICK_MS;
use crate::error::{DeclFlowError, Result};
use crate::model::{EventKind, PipelineResult, Step, StepStatus, Task};
use futures::future::join_all;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use uuid::Uuid;

struct PreparedStep<'a> {
    id: String,
    index: usize,
    step: &'a Step,
}

/// A step is runnable iff it is not terminal or in flight and every
/// dependency is completed (optional-skips count as completed, so
/// dependents of a skipped optional step still run).
fn runnable<'a, 'b>(
    prepared: &'b [PreparedStep<'a>],
    running: &HashSet<String>,
    completed: &HashSet<String>,
    failed: &HashSet<String>,
) -> Vec<&'b PreparedStep<'a>> {
    prepared
        .iter()
        .filter(|p| {
            !running.contains(&p.id) && !completed.contains(&p.id) && !failed.contains(&p.id)
        })
        .filter(|p| p.step.depends_on.iter().all(|dep| completed.contains(dep)))
        .collect()
}

pub(crate) async fn run_dag(
    engine: &Engine,
    task: &Task,
    hooks: &ExecutionHooks,
) -> Result<PipelineResult> {
    let run_id = Uuid::new_v4();
    let clock = Instant::now();
    let total = task.steps.len();

    let prepared: Vec<PreparedStep> = task
        .steps
        .iter()
        .enumerate()
        .map(|(index, step)| PreparedStep {
            id: default_step_id(step, index),
            index,
            step,
        })
        .collect();

    let mut statuses: Vec<StepStatus> = prepared
        .iter()
        .map(|p| StepStatus::pending(p.id.clone(), p.step.task.clone()))
        .collect();

    let mut running: HashSet<String> = HashSet::new();
    let mut completed: HashSet<String> = HashSet::new();
    let mut failed: HashSet<String> = HashSet::new();
    let mut results: HashMap<String, Value> = HashMap::new();
    let mut parallel_groups: Vec<Vec<String>> = Vec::new();
    let mut settled_count = 0usize;

    tracing::debug!(%run_id, steps = total, task = %task.task_type, "starting DAG pipeline");

    while settled_count < total {
        let batch = runnable(&prepared, &running, &completed, &failed);

        if batch.is_empty() {
            if running.is_empty() {
                let remaining: Vec<String> = prepared
                    .iter()
                    .filter(|p| !completed.contains(&p.id) && !failed.contains(&p.id))
                    .map(|p| p.step.task.clone())
                    .collect();
                tracing::error!(%run_id, remaining = ?remaining, "pipeline deadlocked");
                return Err(DeclFlowError::deadlock(remaining));
            }
            // Everything runnable is blocked on in-flight work.
            tokio::time::sleep(Duration::from_millis(SCHEDULER_TICK_MS)).await;
            continue;
        }

        let group: Vec<String> = batch.iter().map(|p| p.id.clone()).collect();
        if group.len() > 1 {
            parallel_groups.push(group.clone());
        }
        for id in &group {
            running.insert(id.clone());
        }
        tracing::debug!(%run_id, group = ?group, "dispatching scheduling tick");

        let ctx = dag_context(&task.payload, &results);
        let dispatched = batch.iter().map(|p| {
            let ctx = &ctx;
            async move {
                (
                    p.index,
                    execute_step(engine, task, p.step, &p.id, ctx, hooks).await,
                )
            }
        });
        let outcomes = join_all(dispatched).await;

        let mut batch_error: Option<DeclFlowError> = None;
        for (index, outcome) in outcomes {
            let id = statuses[index].id.clone();
            running.remove(&id);
            apply_outcome(&mut statuses[index], &outcome);

            match outcome.settled {
                Settled::Completed(result) => {
                    results.insert(id.clone(), result);
                    completed.insert(id);
                    settled_count += 1;
                }
                Settled::Skipped { marker, .. } => {
                    results.insert(id.clone(), marker);
                    completed.insert(id);
                    settled_count += 1;
                }
                Settled::Failed(error) => {
                    tracing::error!(%run_id, step = %id, error = %error, "pipeline step failed");
                    failed.insert(id);
                    // Siblings in this batch already ran to completion;
                    // the first failure decides the pipeline's outcome.
                    if batch_error.is_none() {
                        batch_error = Some(error);
                    }
                }
            }
        }

        // The final 100 is never emitted; callers infer completion from
        // the returned result or the pipeline:complete event.
        if settled_count < total {
            hooks.progress(progress_pct(settled_count, total));
        }

        if let Some(error) = batch_error {
            return Err(error);
        }
    }

    let total_duration = clock.elapsed().as_millis() as u64;
    hooks.emit(
        EventKind::PipelineComplete,
        None,
        None,
        json!({"totalDuration": total_duration}),
    );
    tracing::info!(%run_id, duration_ms = total_duration, "DAG pipeline completed");

    let steps: Vec<Value> = prepared
        .iter()
        .map(|p| results.get(&p.id).cloned().unwrap_or(Value::Null))
        .collect();

    Ok(PipelineResult {
        final_result: steps.last().cloned().unwrap_or(Value::Null),
        steps,
        step_results: results,
        step_status: statuses,
        total_duration,
        parallel_groups,
    })
}
