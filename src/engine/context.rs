//! Template-context assembly and condition evaluation
//!
//! The execution context is a read-only JSON mapping with `payload` and
//! `steps` keys. The DAG runner exposes `steps` as a map by id; the legacy
//! sequential runner exposes it as the ordered results array so templates
//! like `{{steps.0.path}}` keep working. forEach iterations extend the
//! context with `item` and `index`.

use crate::constants::{CTX_INDEX, CTX_ITEM, CTX_PAYLOAD, CTX_STEPS};
use serde_json::{Map, Value, json};
use std::collections::HashMap;

fn object_of<'a>(entries: impl Iterator<Item = (&'a String, &'a Value)>) -> Value {
    Value::Object(entries.map(|(k, v)| (k.clone(), v.clone())).collect())
}

/// Context for the DAG runner: `steps` maps step id to result
pub fn dag_context(payload: &HashMap<String, Value>, steps: &HashMap<String, Value>) -> Value {
    let mut root = Map::new();
    root.insert(CTX_PAYLOAD.to_string(), object_of(payload.iter()));
    root.insert(CTX_STEPS.to_string(), object_of(steps.iter()));
    Value::Object(root)
}

/// Context for the sequential runner: `steps` is the ordered results array
pub fn sequential_context(payload: &HashMap<String, Value>, steps: &[Value]) -> Value {
    let mut root = Map::new();
    root.insert(CTX_PAYLOAD.to_string(), object_of(payload.iter()));
    root.insert(CTX_STEPS.to_string(), Value::Array(steps.to_vec()));
    Value::Object(root)
}

/// Extend a context with the current forEach item and index
pub fn with_iteration(ctx: &Value, item: &Value, index: usize) -> Value {
    let mut map = match ctx {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    map.insert(CTX_ITEM.to_string(), item.clone());
    map.insert(CTX_INDEX.to_string(), Value::from(index));
    Value::Object(map)
}

/// runWhen truthiness
///
/// Falsy iff the value is absent, `false`, `0`, the empty string, or null.
/// Everything else, including empty arrays and objects, is truthy.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_none_or(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// JSON type name used in template type-mismatch messages
pub fn value_type_name(value: Option<&Value>) -> &'static str {
    match value {
        None => "undefined",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

/// Skip marker recorded as a skipped step's result
pub fn skip_marker(reason: &str, condition: Option<&str>) -> Value {
    match condition {
        Some(condition) => json!({
            "skipped": true,
            "reason": reason,
            "condition": condition,
        }),
        None => json!({
            "skipped": true,
            "reason": reason,
        }),
    }
}

/// Marker recorded when an optional step's failure is absorbed
pub fn optional_failure_marker(error: &str) -> Value {
    json!({
        "error": error,
        "skipped": true,
    })
}
