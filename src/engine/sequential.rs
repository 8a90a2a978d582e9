//! Sequential pipeline runner (legacy mode)
//!
//! Executes steps one at a time in declaration order. The template context
//! exposes `steps` as the ordered array of results so far, so paths like
//! `{{steps.0.path}}` address earlier steps by index. Pipelines whose steps
//! declare ids or dependencies go to the DAG runner instead.

use super::Engine;
use super::ExecutionHooks;
use super::context::sequential_context;
use super::step::{Settled, apply_outcome, default_step_id, execute_step, progress_pct};
use crate::error::Result;
use crate::model::{EventKind, PipelineResult, StepStatus, Task};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Instant;

pub(crate) async fn run_sequential(
    engine: &Engine,
    task: &Task,
    hooks: &ExecutionHooks,
) -> Result<PipelineResult> {
    let clock = Instant::now();
    let total = task.steps.len();
    tracing::debug!(steps = total, task = %task.task_type, "starting sequential pipeline");

    let mut statuses: Vec<StepStatus> = task
        .steps
        .iter()
        .enumerate()
        .map(|(index, step)| StepStatus::pending(default_step_id(step, index), step.task.clone()))
        .collect();

    let mut ordered: Vec<Value> = Vec::with_capacity(total);
    let mut step_results: HashMap<String, Value> = HashMap::new();

    for (index, step) in task.steps.iter().enumerate() {
        let step_id = statuses[index].id.clone();
        let ctx = sequential_context(&task.payload, &ordered);

        let outcome = execute_step(engine, task, step, &step_id, &ctx, hooks).await;
        apply_outcome(&mut statuses[index], &outcome);

        match outcome.settled {
            Settled::Completed(result) => {
                ordered.push(result.clone());
                step_results.insert(step_id, result);
            }
            Settled::Skipped { marker, .. } => {
                ordered.push(marker.clone());
                step_results.insert(step_id, marker);
            }
            Settled::Failed(error) => {
                tracing::error!(step = %step_id, error = %error, "pipeline step failed");
                return Err(error);
            }
        }

        // The final 100 is never emitted; callers infer completion from
        // the returned result or the pipeline:complete event.
        if ordered.len() < total {
            hooks.progress(progress_pct(ordered.len(), total));
        }
    }

    let total_duration = clock.elapsed().as_millis() as u64;
    hooks.emit(
        EventKind::PipelineComplete,
        None,
        None,
        json!({"totalDuration": total_duration}),
    );
    tracing::info!(duration_ms = total_duration, "sequential pipeline completed");

    Ok(PipelineResult {
        final_result: ordered.last().cloned().unwrap_or(Value::Null),
        steps: ordered,
        step_results,
        step_status: statuses,
        total_duration,
        parallel_groups: Vec::new(),
    })
}
