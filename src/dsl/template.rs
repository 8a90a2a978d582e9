//! Template resolution for step inputs
//!
//! A string value is a template iff it starts with `{{` and ends with `}}`.
//! The contents between the braces are a dot-separated path evaluated
//! against the execution context; the resolved value keeps its type, so
//! `{{index}}` stays a number and arrays stay arrays. Resolution is
//! one-shot: no nested braces, no expressions, no filters, no defaults.
//!
//! Numeric path segments index arrays, so `{{steps.0.path}}` reads the
//! first entry of the sequential runner's ordered results.

use serde_json::Value;
use std::collections::HashMap;

/// True iff the string is a whole-string template
pub fn is_template(input: &str) -> bool {
    input.len() >= 4 && input.starts_with("{{") && input.ends_with("}}")
}

/// Walk a dotted path through the context
///
/// Returns `None` at the first missing or non-container segment. Arrays are
/// treated as mappings from stringified indices to elements.
pub fn resolve_path<'a>(ctx: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = ctx;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Resolve a single string against the context
///
/// A whole-string template becomes the value at its path (`None` when the
/// path misses); any other string passes through unchanged.
pub fn resolve_str(input: &str, ctx: &Value) -> Option<Value> {
    if !is_template(input) {
        return Some(Value::String(input.to_string()));
    }
    let path = input[2..input.len() - 2].trim();
    resolve_path(ctx, path).cloned()
}

/// Field-wise resolution over an input mapping
///
/// Entries whose value is a whole-string template are replaced by the
/// resolved value; everything else passes through unchanged. A path that
/// misses resolves to null, which is forwarded to the backend as-is.
pub fn resolve_inputs(inputs: &HashMap<String, Value>, ctx: &Value) -> HashMap<String, Value> {
    inputs
        .iter()
        .map(|(key, value)| {
            let resolved = match value {
                Value::String(s) if is_template(s) => {
                    resolve_str(s, ctx).unwrap_or(Value::Null)
                }
                other => other.clone(),
            };
            (key.clone(), resolved)
        })
        .collect()
}
