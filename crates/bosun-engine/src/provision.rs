//! Provision loading and include resolution
//!
//! A provision file is interpolated as raw text before it is parsed, so
//! placeholders may appear anywhere, including in keys and in `includes`.

use bosun_core::migrate::manifest_files;
use bosun_core::{Kind, ManifestMeta, Variables, to_display_string};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{EngineError, Result};
use crate::interpolate::interpolate;
use crate::merge::MergePolicy;

const INCLUDES_KEY: &str = "includes";

/// Output sections a provision can contribute to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Compose,
    Routing,
    Monitoring,
}

impl Target {
    pub const ALL: [Target; 3] = [Target::Compose, Target::Routing, Target::Monitoring];

    /// Canonical document key
    pub fn key(&self) -> &'static str {
        match self {
            Target::Compose => "compose",
            Target::Routing => "routing",
            Target::Monitoring => "monitoring",
        }
    }

    /// Legacy key naming the tool that consumes the section
    pub fn alias(&self) -> Option<&'static str> {
        match self {
            Target::Compose => None,
            Target::Routing => Some("traefik"),
            Target::Monitoring => Some("gatus"),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A resolved provision
///
/// `None` means the provision (and everything it includes) never mentioned
/// the target, which is distinct from contributing an empty mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Provision {
    pub compose: Option<JsonValue>,
    pub routing: Option<JsonValue>,
    pub monitoring: Option<JsonValue>,
}

impl Provision {
    pub fn get(&self, target: Target) -> Option<&JsonValue> {
        match target {
            Target::Compose => self.compose.as_ref(),
            Target::Routing => self.routing.as_ref(),
            Target::Monitoring => self.monitoring.as_ref(),
        }
    }

    fn slot(&mut self, target: Target) -> &mut Option<JsonValue> {
        match target {
            Target::Compose => &mut self.compose,
            Target::Routing => &mut self.routing,
            Target::Monitoring => &mut self.monitoring,
        }
    }

    pub fn is_empty(&self) -> bool {
        Target::ALL.iter().all(|t| self.get(*t).is_none())
    }

    /// Extract the targets of a parsed provision document
    ///
    /// When a target appears under both its alias and its canonical key, the
    /// canonical content is merged over the alias.
    pub fn from_document(doc: &Variables, name: &str, policy: &MergePolicy) -> Result<Self> {
        let mut provision = Self::default();

        for target in Target::ALL {
            let keys = target.alias().into_iter().chain([target.key()]);
            for key in keys {
                let Some(value) = doc.get(key) else {
                    continue;
                };
                match value {
                    JsonValue::Null => {}
                    JsonValue::Object(_) => provision.fold_target(target, value, policy)?,
                    other => {
                        return Err(EngineError::parse(
                            name,
                            format!(
                                "`{key}` must be a mapping, found {}",
                                bosun_core::values::type_name(other)
                            ),
                        ));
                    }
                }
            }
        }

        Ok(provision)
    }

    /// Merge `other` over this provision, target by target
    pub fn fold(&mut self, other: &Provision, policy: &MergePolicy) -> Result<()> {
        for target in Target::ALL {
            if let Some(value) = other.get(target) {
                self.fold_target(target, value, policy)?;
            }
        }
        Ok(())
    }

    fn fold_target(&mut self, target: Target, value: &JsonValue, policy: &MergePolicy) -> Result<()> {
        let slot = self.slot(target);
        let base = slot.take().unwrap_or_else(|| JsonValue::Object(Variables::new()));
        *slot = Some(policy.merge(&base, value)?);
        Ok(())
    }
}

/// Loads provisions from a directory of `<name>.yml` files
#[derive(Debug, Clone)]
pub struct ProvisionLoader {
    dir: PathBuf,
    policy: MergePolicy,
}

impl ProvisionLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            policy: MergePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn policy(&self) -> &MergePolicy {
        &self.policy
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.yml"))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    /// Names of every provision in the directory, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.dir.is_dir() {
            return Err(EngineError::NotFound {
                what: "provisions directory",
                path: self.dir.clone(),
            });
        }

        let mut names: Vec<String> = manifest_files(std::slice::from_ref(&self.dir))?
            .iter()
            .filter_map(|path| path.file_stem())
            .map(|stem| stem.to_string_lossy().into_owned())
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Load and fully resolve a provision
    pub fn load(&self, name: &str, vars: &Variables) -> Result<Provision> {
        let mut visited = HashSet::new();
        self.load_with_visited(name, vars, &mut visited)
    }

    /// Load a provision, skipping anything already in `visited`
    ///
    /// The set is shared across sibling includes, so a provision reachable
    /// along two include paths contributes once, at its first occurrence.
    pub fn load_with_visited(
        &self,
        name: &str,
        vars: &Variables,
        visited: &mut HashSet<String>,
    ) -> Result<Provision> {
        self.resolve(name, vars, visited, 0)
    }

    fn resolve(
        &self,
        name: &str,
        vars: &Variables,
        visited: &mut HashSet<String>,
        depth: usize,
    ) -> Result<Provision> {
        if depth > self.policy.max_depth() {
            return Err(EngineError::DepthExceeded {
                path: name.to_string(),
                max_depth: self.policy.max_depth(),
            });
        }
        if !visited.insert(name.to_string()) {
            tracing::debug!(provision = name, "already visited, skipping");
            return Ok(Provision::default());
        }

        let path = self.path_for(name);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EngineError::NotFound {
                    what: "provision",
                    path,
                });
            }
            Err(source) => return Err(EngineError::Read { path, source }),
        };

        let text = interpolate(&raw, vars)?;
        let mut doc = parse_document(&text, name)?;

        ManifestMeta::from_document(&JsonValue::Object(doc.clone()))
            .validate(Some(Kind::Provision))
            .map_err(|source| EngineError::Version {
                name: name.to_string(),
                source,
            })?;

        let includes = take_includes(&mut doc, name)?;
        let own = Provision::from_document(&doc, name, &self.policy)?;
        if includes.is_empty() {
            tracing::debug!(provision = name, "loaded");
            return Ok(own);
        }

        let mut resolved = Provision::default();
        for include in &includes {
            let included = self
                .resolve(include, vars, visited, depth + 1)
                .map_err(|e| EngineError::Include {
                    name: include.clone(),
                    parent: name.to_string(),
                    inner: Box::new(e),
                })?;
            resolved.fold(&included, &self.policy)?;
        }
        resolved.fold(&own, &self.policy)?;

        tracing::debug!(provision = name, includes = ?includes, "loaded");
        Ok(resolved)
    }
}

/// Parse an interpolated document; an empty document is an empty mapping
pub(crate) fn parse_document(text: &str, name: &str) -> Result<Variables> {
    if text.trim().is_empty() {
        return Ok(Variables::new());
    }
    let doc: JsonValue =
        serde_yaml::from_str(text).map_err(|e| EngineError::parse(name, e))?;
    match doc {
        JsonValue::Null => Ok(Variables::new()),
        JsonValue::Object(map) => Ok(map),
        other => Err(EngineError::parse(
            name,
            format!(
                "expected a mapping, found {}",
                bosun_core::values::type_name(&other)
            ),
        )),
    }
}

fn take_includes(doc: &mut Variables, name: &str) -> Result<Vec<String>> {
    match doc.remove(INCLUDES_KEY) {
        None | Some(JsonValue::Null) => Ok(Vec::new()),
        Some(JsonValue::String(s)) if s.trim().is_empty() => Ok(Vec::new()),
        Some(JsonValue::String(s)) => Ok(vec![s.trim().to_string()]),
        Some(JsonValue::Array(items)) => Ok(items
            .iter()
            .map(to_display_string)
            .filter(|s| !s.is_empty())
            .collect()),
        Some(other) => Err(EngineError::parse(
            name,
            format!(
                "`includes` must be a name or a list of names, found {}",
                bosun_core::values::type_name(&other)
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(format!("{name}.yml")), content).unwrap();
    }

    fn vars(value: JsonValue) -> Variables {
        match value {
            JsonValue::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_load_simple() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "container",
            "compose:\n  services:\n    ${name}:\n      image: ${image}\n",
        );

        let loader = ProvisionLoader::new(dir.path());
        let provision = loader
            .load("container", &vars(json!({"name": "web", "image": "nginx"})))
            .unwrap();

        assert_eq!(
            provision.compose,
            Some(json!({"services": {"web": {"image": "nginx"}}}))
        );
        assert!(provision.routing.is_none());
        assert!(provision.monitoring.is_none());
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = ProvisionLoader::new(dir.path())
            .load("nope", &Variables::new())
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { what: "provision", .. }));
    }

    #[test]
    fn test_missing_variables_listed() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "p", "compose:\n  a: ${one}\n  b: ${two}\n");

        let err = ProvisionLoader::new(dir.path())
            .load("p", &Variables::new())
            .unwrap_err();
        assert_eq!(err.missing_variables().unwrap(), ["one", "two"]);
    }

    #[test]
    fn test_includes_fold_in_order_and_own_wins() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a", "compose:\n  x: a\n  y: a\n  z: a\n");
        write(dir.path(), "b", "compose:\n  y: b\n  z: b\nrouting:\n  r: b\n");
        write(
            dir.path(),
            "top",
            "includes:\n  - a\n  - b\ncompose:\n  z: top\n",
        );

        let provision = ProvisionLoader::new(dir.path())
            .load("top", &Variables::new())
            .unwrap();

        assert_eq!(provision.compose, Some(json!({"x": "a", "y": "b", "z": "top"})));
        assert_eq!(provision.routing, Some(json!({"r": "b"})));
        assert!(provision.monitoring.is_none());
    }

    #[test]
    fn test_single_string_include() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "base", "compose:\n  from: base\n");
        write(dir.path(), "child", "includes: base\n");

        let provision = ProvisionLoader::new(dir.path())
            .load("child", &Variables::new())
            .unwrap();
        assert_eq!(provision.compose, Some(json!({"from": "base"})));
    }

    #[test]
    fn test_self_cycle_terminates() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "circular", "includes:\n  - circular\ncompose:\n  ok: true\n");

        let provision = ProvisionLoader::new(dir.path())
            .load("circular", &Variables::new())
            .unwrap();
        assert_eq!(provision.compose, Some(json!({"ok": true})));
    }

    #[test]
    fn test_mutual_cycle_terminates() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a", "includes: [b]\ncompose:\n  a: 1\n");
        write(dir.path(), "b", "includes: [a]\ncompose:\n  b: 1\n");

        let provision = ProvisionLoader::new(dir.path())
            .load("a", &Variables::new())
            .unwrap();
        assert_eq!(provision.compose, Some(json!({"a": 1, "b": 1})));
    }

    #[test]
    fn test_diamond_include_contributes_once() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "shared", "compose:\n  depends_on: [shared]\n");
        write(dir.path(), "left", "includes: [shared]\ncompose:\n  left: true\n");
        write(dir.path(), "right", "includes: [shared]\ncompose:\n  right: true\n");
        write(dir.path(), "top", "includes: [left, right]\n");

        let provision = ProvisionLoader::new(dir.path())
            .load("top", &Variables::new())
            .unwrap();
        assert_eq!(
            provision.compose,
            Some(json!({"depends_on": ["shared"], "left": true, "right": true}))
        );
    }

    #[test]
    fn test_include_error_is_wrapped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "top", "includes: [ghost]\n");

        let err = ProvisionLoader::new(dir.path())
            .load("top", &Variables::new())
            .unwrap_err();
        assert_eq!(err.provision_chain(), vec!["ghost"]);
        assert!(err.to_string().starts_with("include ghost in top: provision not found"));
    }

    #[test]
    fn test_aliases_merge_under_canonical_key() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "legacy",
            "traefik:\n  a: alias\n  b: alias\nrouting:\n  b: canonical\ngatus:\n  endpoints: []\n",
        );

        let provision = ProvisionLoader::new(dir.path())
            .load("legacy", &Variables::new())
            .unwrap();
        assert_eq!(provision.routing, Some(json!({"a": "alias", "b": "canonical"})));
        assert_eq!(provision.monitoring, Some(json!({"endpoints": []})));
    }

    #[test]
    fn test_non_mapping_target_rejected() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "bad", "compose: [1, 2]\n");

        let err = ProvisionLoader::new(dir.path())
            .load("bad", &Variables::new())
            .unwrap_err();
        assert!(matches!(err, EngineError::Parse { .. }));
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "svc", "apiVersion: bosun.io/v1\nkind: Service\ncompose: {}\n");

        let err = ProvisionLoader::new(dir.path())
            .load("svc", &Variables::new())
            .unwrap_err();
        assert!(matches!(err, EngineError::Version { .. }));
    }

    #[test]
    fn test_empty_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "empty", "");

        let provision = ProvisionLoader::new(dir.path())
            .load("empty", &Variables::new())
            .unwrap();
        assert!(provision.is_empty());
    }

    #[test]
    fn test_list_and_exists() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "redis", "");
        write(dir.path(), "container", "");
        std::fs::write(dir.path().join("postgres.yaml"), "").unwrap();
        std::fs::write(dir.path().join("README.md"), "").unwrap();

        let loader = ProvisionLoader::new(dir.path());
        assert_eq!(loader.list().unwrap(), vec!["container", "postgres", "redis"]);
        assert!(loader.exists("redis"));
        assert!(!loader.exists("postgres"));
        assert!(!loader.exists("ghost"));
    }

    #[test]
    fn test_list_missing_dir() {
        let dir = TempDir::new().unwrap();
        let err = ProvisionLoader::new(dir.path().join("nope")).list().unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[test]
    fn test_include_depth_bounded() {
        let dir = TempDir::new().unwrap();
        for i in 0..10 {
            write(dir.path(), &format!("p{i}"), &format!("includes: [p{}]\n", i + 1));
        }
        write(dir.path(), "p10", "compose:\n  deep: true\n");

        let loader = ProvisionLoader::new(dir.path());
        assert_eq!(
            loader.load("p0", &Variables::new()).unwrap().compose,
            Some(json!({"deep": true}))
        );

        let shallow = ProvisionLoader::new(dir.path())
            .with_policy(MergePolicy::new().with_max_depth(5));
        let err = shallow.load("p0", &Variables::new()).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            EngineError::DepthExceeded { max_depth: 5, .. }
        ));
    }
}
