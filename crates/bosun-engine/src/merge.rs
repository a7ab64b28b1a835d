//! Deep merge of document trees
//!
//! Mappings merge recursively with the overlay winning on conflicts. Sequences
//! are replaced, except under a handful of compose keys where they are
//! unioned (`networks`, `depends_on`) or concatenated (`endpoints`).
//! `environment` and `labels` accept both `KEY=value` lists and mappings and
//! are normalized to mappings before merging.
//!
//! Inputs are never modified; the result shares no structure with them.

use bosun_core::{Variables, to_display_string};
use serde_json::Value as JsonValue;
use std::collections::HashSet;

use crate::error::{EngineError, Result};

/// Maximum nesting depth for merging and copying
pub const MAX_MERGE_DEPTH: usize = 100;

/// Sequences unioned instead of replaced
pub const UNION_KEYS: &[&str] = &["networks", "depends_on"];

/// Sequences concatenated instead of replaced
pub const EXTEND_KEYS: &[&str] = &["endpoints"];

/// Keys whose `KEY=value` lists are normalized to mappings
pub const NORMALIZE_KEYS: &[&str] = &["environment", "labels"];

/// How two trees are combined
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePolicy {
    union_keys: Vec<String>,
    extend_keys: Vec<String>,
    normalize_keys: Vec<String>,
    max_depth: usize,
}

impl Default for MergePolicy {
    fn default() -> Self {
        let owned = |keys: &[&str]| keys.iter().map(|k| k.to_string()).collect();
        Self {
            union_keys: owned(UNION_KEYS),
            extend_keys: owned(EXTEND_KEYS),
            normalize_keys: owned(NORMALIZE_KEYS),
            max_depth: MAX_MERGE_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListStrategy {
    Replace,
    Union,
    Extend,
}

impl MergePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union sequences found under `key`
    pub fn with_union_key(mut self, key: impl Into<String>) -> Self {
        self.union_keys.push(key.into());
        self
    }

    /// Concatenate sequences found under `key`
    pub fn with_extend_key(mut self, key: impl Into<String>) -> Self {
        self.extend_keys.push(key.into());
        self
    }

    /// Normalize `KEY=value` lists found under `key`
    pub fn with_normalize_key(mut self, key: impl Into<String>) -> Self {
        self.normalize_keys.push(key.into());
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn list_strategy(&self, key: &str) -> ListStrategy {
        if self.union_keys.iter().any(|k| k == key) {
            ListStrategy::Union
        } else if self.extend_keys.iter().any(|k| k == key) {
            ListStrategy::Extend
        } else {
            ListStrategy::Replace
        }
    }

    fn normalizes(&self, key: &str) -> bool {
        self.normalize_keys.iter().any(|k| k == key)
    }

    /// Merge `overlay` into a copy of `base`
    ///
    /// Two mappings merge key by key. Anything else resolves to a copy of
    /// `overlay`, except a `null` overlay, which leaves a copy of `base`.
    pub fn merge(&self, base: &JsonValue, overlay: &JsonValue) -> Result<JsonValue> {
        match (base, overlay) {
            (JsonValue::Object(b), JsonValue::Object(o)) => {
                Ok(JsonValue::Object(self.merge_maps(b, o, "", 0)?))
            }
            (_, JsonValue::Null) => self.copy(base, "", 0),
            _ => self.copy(overlay, "", 0),
        }
    }

    /// Merge two mappings
    pub fn merge_variables(&self, base: &Variables, overlay: &Variables) -> Result<Variables> {
        self.merge_maps(base, overlay, "", 0)
    }

    /// Depth-bounded deep copy
    pub fn copy(&self, value: &JsonValue, path: &str, depth: usize) -> Result<JsonValue> {
        if depth > self.max_depth {
            return Err(self.depth_exceeded(path));
        }
        match value {
            JsonValue::Object(map) => {
                let mut out = Variables::new();
                for (key, child) in map {
                    let child_path = join_path(path, key);
                    out.insert(key.clone(), self.copy(child, &child_path, depth + 1)?);
                }
                Ok(JsonValue::Object(out))
            }
            JsonValue::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let child_path = format!("{path}[{i}]");
                    out.push(self.copy(item, &child_path, depth + 1)?);
                }
                Ok(JsonValue::Array(out))
            }
            scalar => Ok(scalar.clone()),
        }
    }

    fn merge_maps(
        &self,
        base: &Variables,
        overlay: &Variables,
        path: &str,
        depth: usize,
    ) -> Result<Variables> {
        if depth > self.max_depth {
            return Err(self.depth_exceeded(path));
        }

        let mut result = Variables::new();

        for (key, value) in base {
            if !overlay.contains_key(key) {
                let child_path = join_path(path, key);
                result.insert(key.clone(), self.copy(value, &child_path, depth + 1)?);
            }
        }

        for (key, overlay_value) in overlay {
            let child_path = join_path(path, key);
            let merged = match base.get(key) {
                Some(base_value) => {
                    self.merge_entry(key, base_value, overlay_value, &child_path, depth + 1)?
                }
                None => self.copy(overlay_value, &child_path, depth + 1)?,
            };
            result.insert(key.clone(), merged);
        }

        Ok(result)
    }

    fn merge_entry(
        &self,
        key: &str,
        base: &JsonValue,
        overlay: &JsonValue,
        path: &str,
        depth: usize,
    ) -> Result<JsonValue> {
        if self.normalizes(key) {
            if let (Some(b), Some(o)) = (normalize(base), normalize(overlay)) {
                return Ok(JsonValue::Object(self.merge_maps(&b, &o, path, depth)?));
            }
        }

        match (base, overlay) {
            (JsonValue::Object(b), JsonValue::Object(o)) => {
                Ok(JsonValue::Object(self.merge_maps(b, o, path, depth)?))
            }
            (JsonValue::Array(b), JsonValue::Array(o)) => match self.list_strategy(key) {
                ListStrategy::Union => self.union(b, o, path, depth),
                ListStrategy::Extend => {
                    let mut out = Vec::with_capacity(b.len() + o.len());
                    for (i, item) in b.iter().chain(o).enumerate() {
                        out.push(self.copy(item, &format!("{path}[{i}]"), depth + 1)?);
                    }
                    Ok(JsonValue::Array(out))
                }
                ListStrategy::Replace => self.copy(overlay, path, depth),
            },
            _ => self.copy(overlay, path, depth),
        }
    }

    /// Base elements first, then overlay elements not yet seen
    ///
    /// Elements are compared by their string form.
    fn union(
        &self,
        base: &[JsonValue],
        overlay: &[JsonValue],
        path: &str,
        depth: usize,
    ) -> Result<JsonValue> {
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(base.len() + overlay.len());
        for item in base.iter().chain(overlay) {
            if seen.insert(to_display_string(item)) {
                let child_path = format!("{path}[{}]", out.len());
                out.push(self.copy(item, &child_path, depth + 1)?);
            }
        }
        Ok(JsonValue::Array(out))
    }

    fn depth_exceeded(&self, path: &str) -> EngineError {
        EngineError::DepthExceeded {
            path: path.to_string(),
            max_depth: self.max_depth,
        }
    }
}

/// Merge with the default policy
pub fn deep_merge(base: &JsonValue, overlay: &JsonValue) -> Result<JsonValue> {
    MergePolicy::default().merge(base, overlay)
}

/// Convert a `KEY=value` list or a mapping into a string mapping
///
/// List entries without `=` (or with an empty key) are dropped. Mapping
/// values are stringified, `null` included. Returns `None` for anything
/// that is neither.
pub fn normalize(value: &JsonValue) -> Option<Variables> {
    match value {
        JsonValue::Array(items) => {
            let mut out = Variables::new();
            for item in items {
                let entry = to_display_string(item);
                if let Some((key, val)) = entry.split_once('=') {
                    if !key.is_empty() {
                        out.insert(key.to_string(), JsonValue::String(val.to_string()));
                    }
                }
            }
            Some(out)
        }
        JsonValue::Object(map) => Some(
            map.iter()
                .map(|(k, v)| (k.clone(), JsonValue::String(to_display_string(v))))
                .collect(),
        ),
        _ => None,
    }
}

fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nested(depth: usize) -> JsonValue {
        let mut value = json!("leaf");
        for _ in 0..depth {
            value = json!({ "a": value });
        }
        value
    }

    #[test]
    fn test_overlay_wins() {
        let base = json!({"a": 1, "b": {"c": 2, "d": 3}});
        let overlay = json!({"b": {"c": 20}, "e": 5});
        let merged = deep_merge(&base, &overlay).unwrap();
        assert_eq!(merged, json!({"a": 1, "b": {"c": 20, "d": 3}, "e": 5}));
    }

    #[test]
    fn test_inputs_untouched() {
        let base = json!({"services": {"web": {"ports": ["80:80"]}}});
        let overlay = json!({"services": {"web": {"ports": ["443:443"]}}});
        let (b, o) = (base.clone(), overlay.clone());
        let _ = deep_merge(&base, &overlay).unwrap();
        assert_eq!(base, b);
        assert_eq!(overlay, o);
    }

    #[test]
    fn test_merge_with_empty() {
        let tree = json!({"a": {"b": [1, 2]}});
        assert_eq!(deep_merge(&tree, &json!({})).unwrap(), tree);
        assert_eq!(deep_merge(&json!({}), &tree).unwrap(), tree);
    }

    #[test]
    fn test_sequences_replace_by_default() {
        let base = json!({"ports": ["80:80", "443:443"]});
        let overlay = json!({"ports": ["8080:80"]});
        assert_eq!(
            deep_merge(&base, &overlay).unwrap(),
            json!({"ports": ["8080:80"]})
        );
    }

    #[test]
    fn test_union_keys() {
        let base = json!({"networks": ["a", "b"], "depends_on": ["db"]});
        let overlay = json!({"networks": ["b", "c"], "depends_on": ["db", "cache"]});
        let merged = deep_merge(&base, &overlay).unwrap();
        assert_eq!(merged["networks"], json!(["a", "b", "c"]));
        assert_eq!(merged["depends_on"], json!(["db", "cache"]));
    }

    #[test]
    fn test_extend_keys_keep_duplicates() {
        let base = json!({"endpoints": [{"name": "a"}, {"name": "b"}]});
        let overlay = json!({"endpoints": [{"name": "a"}]});
        let merged = deep_merge(&base, &overlay).unwrap();
        assert_eq!(
            merged["endpoints"],
            json!([{"name": "a"}, {"name": "b"}, {"name": "a"}])
        );
    }

    #[test]
    fn test_environment_lists_become_map() {
        let base = json!({"environment": ["FOO=bar"]});
        let overlay = json!({"environment": ["BAZ=qux"]});
        let merged = deep_merge(&base, &overlay).unwrap();
        assert_eq!(merged["environment"], json!({"FOO": "bar", "BAZ": "qux"}));
    }

    #[test]
    fn test_environment_list_over_map() {
        let base = json!({"environment": {"FOO": "bar", "PORT": 80}});
        let overlay = json!({"environment": ["FOO=override", "URL=a=b"]});
        let merged = deep_merge(&base, &overlay).unwrap();
        assert_eq!(
            merged["environment"],
            json!({"FOO": "override", "PORT": "80", "URL": "a=b"})
        );
    }

    #[test]
    fn test_normalize_drops_bad_entries() {
        let list = json!(["KEY=value", "NOEQUALS", "=empty", "A="]);
        let map = normalize(&list).unwrap();
        assert_eq!(JsonValue::Object(map), json!({"KEY": "value", "A": ""}));
        assert!(normalize(&json!("scalar")).is_none());
    }

    #[test]
    fn test_normalize_stringifies_null() {
        let map = normalize(&json!({"DEBUG": null, "PORT": 80})).unwrap();
        assert_eq!(JsonValue::Object(map), json!({"DEBUG": "null", "PORT": "80"}));
    }

    #[test]
    fn test_sequential_overlays_associate() {
        let a = json!({
            "image": "nginx",
            "ports": ["80:80"],
            "environment": ["A=1", "B=2"],
            "deploy": {"replicas": 1, "resources": {"cpus": "0.5"}},
        });
        let b = json!({
            "ports": ["8080:80"],
            "environment": {"B": "20", "C": 3},
            "deploy": {"resources": {"memory": "256M"}},
            "restart": "always",
        });
        let c = json!({
            "image": "nginx:1.27",
            "environment": ["C=30"],
            "deploy": {"replicas": 2, "resources": {"cpus": "1"}},
            "restart": null,
        });

        let left = deep_merge(&deep_merge(&a, &b).unwrap(), &c).unwrap();
        let right = deep_merge(&a, &deep_merge(&b, &c).unwrap()).unwrap();

        assert_eq!(left, right);
        assert_eq!(left["image"], "nginx:1.27");
        assert_eq!(left["ports"], json!(["8080:80"]));
        assert_eq!(left["environment"], json!({"A": "1", "B": "20", "C": "30"}));
        assert_eq!(left["deploy"], json!({"replicas": 2, "resources": {"cpus": "1", "memory": "256M"}}));
        assert_eq!(left["restart"], "always");
    }

    #[test]
    fn test_union_merge_is_idempotent() {
        let tree = json!({
            "services": {
                "web": {
                    "image": "nginx",
                    "networks": ["proxy", "default"],
                    "depends_on": ["db", "cache"],
                    "environment": {"TZ": "UTC"},
                },
            },
            "networks": ["proxy"],
        });

        assert_eq!(deep_merge(&tree, &tree).unwrap(), tree);
    }

    #[test]
    fn test_labels_scalar_overlay_replaces() {
        let base = json!({"labels": ["a=b"]});
        let overlay = json!({"labels": "none"});
        assert_eq!(deep_merge(&base, &overlay).unwrap()["labels"], json!("none"));
    }

    #[test]
    fn test_custom_policy() {
        let policy = MergePolicy::new().with_union_key("volumes");
        let base = json!({"volumes": ["a:/a"]});
        let overlay = json!({"volumes": ["b:/b", "a:/a"]});
        assert_eq!(
            policy.merge(&base, &overlay).unwrap()["volumes"],
            json!(["a:/a", "b:/b"])
        );
    }

    #[test]
    fn test_moderate_depth_succeeds() {
        let deep = nested(50);
        assert_eq!(deep_merge(&deep, &deep).unwrap(), deep);
    }

    #[test]
    fn test_depth_exceeded_on_merge() {
        let deep = nested(150);
        let err = deep_merge(&deep, &deep).unwrap_err();
        assert!(matches!(
            err,
            EngineError::DepthExceeded {
                max_depth: MAX_MERGE_DEPTH,
                ..
            }
        ));
    }

    #[test]
    fn test_depth_exceeded_on_copy() {
        let err = deep_merge(&json!({}), &nested(150)).unwrap_err();
        assert!(matches!(err, EngineError::DepthExceeded { .. }));
        assert!(err.to_string().contains("a.a.a"));
    }

    #[test]
    fn test_custom_depth() {
        let policy = MergePolicy::new().with_max_depth(3);
        assert!(policy.merge(&json!({}), &nested(2)).is_ok());
        assert!(policy.merge(&json!({}), &nested(5)).is_err());
    }
}
