//! `${name}` placeholder substitution
//!
//! Substitution is a single textual pass: a replacement value is never
//! rescanned, so a value containing `${other}` ends up in the output as-is.
//! Placeholders that do not match the `${word}` pattern (`$name`, `${}`,
//! `${a-b}`) are left untouched.

use bosun_core::{Variables, to_display_string};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;

use crate::error::{EngineError, Result};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z0-9_]+)\}").expect("valid regex"));

/// Replace every `${name}` in `text` with its binding in `vars`
///
/// Every unbound name is reported at once, in order of first appearance.
pub fn interpolate(text: &str, vars: &Variables) -> Result<String> {
    let mut missing = Vec::new();
    let output = substitute(text, vars, &mut missing);

    if missing.is_empty() {
        Ok(output)
    } else {
        Err(EngineError::MissingVariables { names: missing })
    }
}

/// Interpolate every string leaf of a tree
///
/// Mapping keys are left alone. Missing names are gathered across the whole
/// tree before failing.
pub fn interpolate_tree(value: &JsonValue, vars: &Variables) -> Result<JsonValue> {
    let mut missing = Vec::new();
    let output = substitute_tree(value, vars, &mut missing);

    if missing.is_empty() {
        Ok(output)
    } else {
        Err(EngineError::MissingVariables { names: missing })
    }
}

/// Names referenced by `${...}` placeholders, deduplicated, in order
pub fn placeholders(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(text) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

fn substitute(text: &str, vars: &Variables, missing: &mut Vec<String>) -> String {
    let mut output = String::with_capacity(text.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let name = &caps[1];

        output.push_str(&text[last..whole.start()]);
        match vars.get(name) {
            Some(value) => output.push_str(&to_display_string(value)),
            None => {
                if !missing.iter().any(|m| m == name) {
                    missing.push(name.to_string());
                }
                output.push_str(whole.as_str());
            }
        }
        last = whole.end();
    }

    output.push_str(&text[last..]);
    output
}

fn substitute_tree(value: &JsonValue, vars: &Variables, missing: &mut Vec<String>) -> JsonValue {
    match value {
        JsonValue::String(s) => JsonValue::String(substitute(s, vars, missing)),
        JsonValue::Array(items) => JsonValue::Array(
            items
                .iter()
                .map(|item| substitute_tree(item, vars, missing))
                .collect(),
        ),
        JsonValue::Object(map) => JsonValue::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute_tree(v, vars, missing)))
                .collect(),
        ),
        other => other.clone(),
    }
}
