//! Document trees and variable bindings

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;

use crate::error::{CoreError, Result};

/// Variable binding set used for `${name}` interpolation
pub type Variables = serde_json::Map<String, JsonValue>;

/// A schema-free document tree (provision target, manifest config, render output)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(pub JsonValue);

impl Values {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self(JsonValue::Object(Variables::new()))
    }

    /// Read and parse a YAML document from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::read(path, e))?;
        Self::from_yaml(&content)
    }

    /// An empty document parses to an empty mapping.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: JsonValue = serde_yaml::from_str(yaml)?;
        match value {
            JsonValue::Null => Ok(Self::new()),
            other => Ok(Self(other)),
        }
    }

    /// Assign `value` at a dotted path such as `labels.team`, creating
    /// intermediate mappings and replacing scalars in the way
    pub fn set(&mut self, path: &str, value: JsonValue) -> Result<()> {
        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(CoreError::InvalidValue {
                message: format!("Invalid key path: '{}'", path),
            });
        }
        set_nested(&mut self.0, &segments, value);
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        let segments: Vec<&str> = path.split('.').collect();
        get_nested(&self.0, &segments)
    }

    pub fn inner(&self) -> &JsonValue {
        &self.0
    }

    pub fn into_inner(self) -> JsonValue {
        self.0
    }

    /// Top-level mapping, if the document is one
    pub fn as_map(&self) -> Option<&Variables> {
        self.0.as_object()
    }

    /// Consume into a variable binding set
    ///
    /// Non-mapping documents produce an error since bindings are always keyed.
    pub fn into_variables(self) -> Result<Variables> {
        match self.0 {
            JsonValue::Object(map) => Ok(map),
            JsonValue::Null => Ok(Variables::new()),
            other => Err(CoreError::InvalidValue {
                message: format!("expected a mapping, found {}", type_name(&other)),
            }),
        }
    }

    /// True for `null` and for an empty mapping
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            JsonValue::Null => true,
            JsonValue::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    /// Serialize back to YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.0)?)
    }
}

impl From<Variables> for Values {
    fn from(map: Variables) -> Self {
        Self(JsonValue::Object(map))
    }
}

/// Canonical string form of a value
///
/// Strings render verbatim, numbers and booleans as their literal text,
/// `null` as `null`, and mappings/sequences as compact JSON.
pub fn to_display_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Human name of a value's type, for diagnostics
pub fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "sequence",
        JsonValue::Object(_) => "mapping",
    }
}

fn set_nested(value: &mut JsonValue, path: &[&str], new_value: JsonValue) {
    let Some((key, remaining)) = path.split_first() else {
        *value = new_value;
        return;
    };

    if !value.is_object() {
        *value = JsonValue::Object(Variables::new());
    }

    if let JsonValue::Object(map) = value {
        if remaining.is_empty() {
            map.insert((*key).to_string(), new_value);
        } else {
            let child = map
                .entry((*key).to_string())
                .or_insert_with(|| JsonValue::Object(Variables::new()));
            set_nested(child, remaining, new_value);
        }
    }
}

fn get_nested<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    let Some((key, remaining)) = path.split_first() else {
        return Some(value);
    };

    match value {
        JsonValue::Object(map) => map.get(*key).and_then(|v| get_nested(v, remaining)),
        _ => None,
    }
}

/// Build a config overlay from `--set key=value` arguments
///
/// Later arguments win when they assign the same path.
pub fn parse_set_values(assignments: &[String]) -> Result<Values> {
    let mut overlay = Values::new();

    for assignment in assignments {
        let Some((path, raw)) = assignment.split_once('=') else {
            return Err(CoreError::InvalidValue {
                message: format!("--set '{assignment}' must have the form key=value"),
            });
        };
        overlay.set(path, scalar(raw))?;
    }

    Ok(overlay)
}

fn scalar(raw: &str) -> JsonValue {
    match raw {
        "true" => return JsonValue::Bool(true),
        "false" => return JsonValue::Bool(false),
        "null" => return JsonValue::Null,
        _ => {}
    }

    if let Ok(int) = raw.parse::<i64>() {
        return JsonValue::from(int);
    }
    if let Some(float) = raw.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
        return JsonValue::Number(float);
    }
    if raw.starts_with(['[', '{']) {
        if let Ok(parsed) = serde_json::from_str(raw) {
            return parsed;
        }
    }
    JsonValue::String(raw.to_string())
}
