use super::template::{is_template, resolve_inputs, resolve_path, resolve_str};
use serde_json::{Value, json};
use std::collections::HashMap;

fn ctx() -> Value {
    json!({
        "payload": {"name": "render", "count": 3},
        "steps": {
            "probe": {"ok": true, "tracks": [{"path": "a.mp4"}, {"path": "b.mp4"}]},
        },
        "item": {"path": "a.mp4"},
        "index": 0
    })
}

#[test]
fn test_is_template() {
    assert!(is_template("{{payload.name}}"));
    assert!(is_template("{{ payload.name }}"));
    assert!(!is_template("payload.name"));
    assert!(!is_template("{{payload.name}} suffix"));
    assert!(!is_template("prefix {{payload.name}}"));
    assert!(!is_template("{}"));
}

#[test]
fn test_whole_string_template_keeps_type() {
    let ctx = ctx();
    assert_eq!(resolve_str("{{payload.count}}", &ctx), Some(json!(3)));
    assert_eq!(resolve_str("{{index}}", &ctx), Some(json!(0)));
    assert_eq!(
        resolve_str("{{steps.probe.tracks}}", &ctx),
        Some(json!([{"path": "a.mp4"}, {"path": "b.mp4"}]))
    );
}

#[test]
fn test_numeric_segments_index_arrays() {
    let ctx = ctx();
    assert_eq!(
        resolve_str("{{steps.probe.tracks.1.path}}", &ctx),
        Some(json!("b.mp4"))
    );
    assert_eq!(resolve_path(&ctx, "steps.probe.tracks.2.path"), None);
    assert_eq!(resolve_path(&ctx, "steps.probe.tracks.x"), None);
}

#[test]
fn test_missing_path_resolves_to_absent() {
    let ctx = ctx();
    assert_eq!(resolve_str("{{steps.nope.value}}", &ctx), None);
    // Traversal into a scalar misses rather than erroring.
    assert_eq!(resolve_str("{{payload.count.deeper}}", &ctx), None);
}

#[test]
fn test_non_template_passes_through() {
    let ctx = ctx();
    assert_eq!(
        resolve_str("plain string", &ctx),
        Some(json!("plain string"))
    );
}

#[test]
fn test_no_nested_expansion() {
    let ctx = json!({"a": "{{b}}", "b": "final"});
    // One-shot: the resolved value is returned verbatim, not re-resolved.
    assert_eq!(resolve_str("{{a}}", &ctx), Some(json!("{{b}}")));
}

#[test]
fn test_field_wise_resolution() {
    let ctx = ctx();
    let mut inputs = HashMap::new();
    inputs.insert("file".to_string(), json!("{{item.path}}"));
    inputs.insert("position".to_string(), json!("{{index}}"));
    inputs.insert("mode".to_string(), json!("fast"));
    inputs.insert("missing".to_string(), json!("{{payload.nope}}"));
    inputs.insert("flags".to_string(), json!(["-y"]));

    let resolved = resolve_inputs(&inputs, &ctx);
    assert_eq!(resolved.get("file"), Some(&json!("a.mp4")));
    assert_eq!(resolved.get("position"), Some(&json!(0)));
    assert_eq!(resolved.get("mode"), Some(&json!("fast")));
    assert_eq!(resolved.get("missing"), Some(&Value::Null));
    assert_eq!(resolved.get("flags"), Some(&json!(["-y"])));
}

#[test]
fn test_resolution_is_pure() {
    let ctx = ctx();
    let first = resolve_str("{{steps.probe.tracks}}", &ctx);
    let second = resolve_str("{{steps.probe.tracks}}", &ctx);
    assert_eq!(first, second);
}
