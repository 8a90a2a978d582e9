use super::*;
use serde_json::json;

#[test]
fn test_task_wire_format() {
    let raw = json!({
        "type": "video.render",
        "backend": "auto",
        "payload": {"source": "clip.mp4"},
        "retry": {"attempts": 3, "backoff": "exponential", "delay": 250},
        "steps": [
            {
                "id": "probe",
                "task": "media.probe",
                "input": {"file": "{{payload.source}}"}
            },
            {
                "task": "media.encode",
                "dependsOn": ["probe"],
                "forEach": "{{steps.probe.tracks}}",
                "forEachConcurrency": 2,
                "runWhen": "{{steps.probe.ok}}",
                "timeout": 1.5,
                "optional": true
            }
        ],
        "onSuccess": [{"$event": "webhook", "url": "https://example.test/done"}]
    });

    let task: Task = serde_json::from_value(raw).expect("task deserializes");
    assert_eq!(task.task_type, "video.render");
    assert!(task.is_pipeline());

    let retry = task.retry.as_ref().expect("retry present");
    assert_eq!(retry.attempts, 3);
    assert_eq!(retry.backoff, Backoff::Exponential);
    assert_eq!(retry.delay, 250);

    assert_eq!(task.steps[0].id.as_deref(), Some("probe"));
    assert!(task.steps[1].id.is_none());
    assert_eq!(task.steps[1].depends_on, vec!["probe".to_string()]);
    assert_eq!(
        task.steps[1].for_each.as_deref(),
        Some("{{steps.probe.tracks}}")
    );
    assert_eq!(task.steps[1].for_each_concurrency, Some(2));
    assert_eq!(task.steps[1].timeout, Some(1.5));
    assert!(task.steps[1].optional);

    assert_eq!(task.on_success.len(), 1);
    assert_eq!(task.on_success[0].event, "webhook");
    assert_eq!(
        task.on_success[0].params.get("url"),
        Some(&json!("https://example.test/done"))
    );
}

#[test]
fn test_retry_spec_defaults() {
    let retry: RetrySpec = serde_json::from_value(json!({})).expect("empty retry");
    assert_eq!(retry.attempts, 1);
    assert_eq!(retry.backoff, Backoff::Fixed);
    assert_eq!(retry.delay, 0);
}

#[test]
fn test_event_kind_wire_names() {
    assert_eq!(
        serde_json::to_value(EventKind::StepStart).expect("serializes"),
        json!("step:start")
    );
    assert_eq!(
        serde_json::to_value(EventKind::PipelineComplete).expect("serializes"),
        json!("pipeline:complete")
    );
}

#[test]
fn test_step_state_terminality() {
    assert!(!StepState::Pending.is_terminal());
    assert!(!StepState::Running.is_terminal());
    assert!(StepState::Completed.is_terminal());
    assert!(StepState::Failed.is_terminal());
    assert!(StepState::Skipped.is_terminal());
}
