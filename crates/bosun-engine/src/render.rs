//! Service and stack rendering

use bosun_core::{Kind, ManifestMeta, ServiceManifest, Stack, Values, Variables};
use phf::phf_map;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};

use crate::error::{EngineError, Result};
use crate::interpolate::interpolate;
use crate::merge::MergePolicy;
use crate::provision::{Provision, ProvisionLoader, Target};

/// Built-in variables for the `needs` shorthand
///
/// Values are interpolated against the service's own variables before use.
static SIDECAR_DEFAULTS: phf::Map<&'static str, &'static [(&'static str, &'static str)]> = phf_map! {
    "postgres" => POSTGRES,
    "redis" => REDIS,
    "mysql" => MYSQL,
    "mongodb" => MONGODB,
};

const POSTGRES: &[(&str, &str)] = &[
    ("version", "17"),
    ("db", "${name}"),
    ("db_password", "${db_password}"),
];
const REDIS: &[(&str, &str)] = &[("version", "7")];
const MYSQL: &[(&str, &str)] = &[
    ("version", "8"),
    ("db", "${name}"),
    ("db_password", "${db_password}"),
];
const MONGODB: &[(&str, &str)] = &[("version", "7"), ("db", "${name}")];

/// Default variables for a `needs` entry, if it has any
pub fn sidecar_defaults(name: &str) -> Option<Variables> {
    SIDECAR_DEFAULTS.get(name).map(|defaults| {
        defaults
            .iter()
            .map(|(k, v)| (k.to_string(), JsonValue::String(v.to_string())))
            .collect()
    })
}

/// Dependency names usable in `needs`, sorted
pub fn known_sidecars() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = SIDECAR_DEFAULTS.keys().copied().collect();
    names.sort_unstable();
    names
}

/// The combined result of a render
///
/// All three targets are always present; an empty mapping means nothing
/// was contributed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderOutput {
    pub compose: Variables,
    pub routing: Variables,
    pub monitoring: Variables,
}

impl RenderOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, target: Target) -> &Variables {
        match target {
            Target::Compose => &self.compose,
            Target::Routing => &self.routing,
            Target::Monitoring => &self.monitoring,
        }
    }

    fn get_mut(&mut self, target: Target) -> &mut Variables {
        match target {
            Target::Compose => &mut self.compose,
            Target::Routing => &mut self.routing,
            Target::Monitoring => &mut self.monitoring,
        }
    }

    pub fn is_empty(&self) -> bool {
        Target::ALL.iter().all(|t| self.get(*t).is_empty())
    }

    /// Merge the targets a provision contributed
    pub fn apply(&mut self, provision: &Provision, policy: &MergePolicy) -> Result<()> {
        for target in Target::ALL {
            let Some(value) = provision.get(target) else {
                continue;
            };
            let slot = self.get_mut(target);
            let merged = policy.merge(&JsonValue::Object(std::mem::take(slot)), value)?;
            if let JsonValue::Object(map) = merged {
                *slot = map;
            }
        }
        Ok(())
    }

    /// Merge another output over this one
    pub fn absorb(&mut self, other: &RenderOutput, policy: &MergePolicy) -> Result<()> {
        for target in Target::ALL {
            let slot = self.get_mut(target);
            *slot = policy.merge_variables(slot, other.get(target))?;
        }
        Ok(())
    }
}

/// Renders services and stacks against a provisions directory
#[derive(Debug, Clone)]
pub struct Renderer {
    loader: ProvisionLoader,
}

impl Renderer {
    pub fn new(provisions_dir: impl Into<PathBuf>) -> Self {
        Self {
            loader: ProvisionLoader::new(provisions_dir),
        }
    }

    pub fn with_loader(loader: ProvisionLoader) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &ProvisionLoader {
        &self.loader
    }

    fn policy(&self) -> &MergePolicy {
        self.loader.policy()
    }

    /// Render one service manifest
    pub fn render_service(&self, manifest: &ServiceManifest) -> Result<RenderOutput> {
        let mut output = RenderOutput::new();

        let mut vars = manifest.config.clone();
        vars.insert("name".to_string(), JsonValue::String(manifest.name.clone()));

        if manifest.is_raw() {
            if let Some(compose) = manifest.compose.as_ref().filter(|c| !c.is_null()) {
                output.compose.insert("services".to_string(), compose.clone());
            }
            tracing::debug!(service = %manifest.name, "rendered raw service");
            return Ok(output);
        }

        for name in &manifest.provisions {
            let provision = self
                .loader
                .load(name, &vars)
                .map_err(|e| EngineError::Provision {
                    name: name.clone(),
                    inner: Box::new(e),
                })?;
            output.apply(&provision, self.policy())?;
        }

        for need in &manifest.needs {
            let Some(defaults) = sidecar_defaults(need) else {
                tracing::debug!(service = %manifest.name, need = %need, "no defaults, skipping");
                continue;
            };
            if !self.loader.exists(need) {
                tracing::debug!(service = %manifest.name, need = %need, "no provision, skipping");
                continue;
            }

            let mut sidecar_vars = sidecar_seed(manifest, need);
            for (key, value) in defaults {
                let value = match value {
                    JsonValue::String(s) => JsonValue::String(interpolate(&s, &vars).unwrap_or(s)),
                    other => other,
                };
                sidecar_vars.insert(key, value);
            }
            extend(&mut sidecar_vars, &manifest.config);

            let provision = self
                .loader
                .load(need, &sidecar_vars)
                .map_err(|e| EngineError::Need {
                    name: need.clone(),
                    inner: Box::new(e),
                })?;
            output.apply(&provision, self.policy())?;
        }

        for (sidecar, overrides) in &manifest.services {
            let mut sidecar_vars = sidecar_seed(manifest, sidecar);
            if let Some(overrides) = overrides {
                extend(&mut sidecar_vars, overrides);
            }
            extend(&mut sidecar_vars, &manifest.config);

            let provision = self
                .loader
                .load(sidecar, &sidecar_vars)
                .map_err(|e| EngineError::Sidecar {
                    name: sidecar.clone(),
                    inner: Box::new(e),
                })?;
            output.apply(&provision, self.policy())?;
        }

        tracing::debug!(service = %manifest.name, "rendered service");
        Ok(output)
    }

    /// Render every service a stack includes, with `overlay` merged into
    /// each service's config
    pub fn render_stack(
        &self,
        stack_path: &Path,
        services_dir: &Path,
        overlay: &Variables,
    ) -> Result<RenderOutput> {
        let stack = load_stack(stack_path)?;
        let mut output = RenderOutput::new();

        for include in &stack.include {
            let mut manifest = load_service_manifest(&services_dir.join(include))?;
            if !overlay.is_empty() {
                manifest.config = self.policy().merge_variables(&manifest.config, overlay)?;
            }

            let rendered =
                self.render_service(&manifest)
                    .map_err(|e| EngineError::Service {
                        name: manifest.name.clone(),
                        inner: Box::new(e),
                    })?;
            output.absorb(&rendered, self.policy())?;
        }

        if let Some(networks) = stack.networks {
            output.compose.insert("networks".to_string(), networks);
        }

        tracing::debug!(stack = %stack_path.display(), services = stack.include.len(), "rendered stack");
        Ok(output)
    }
}

fn sidecar_seed(manifest: &ServiceManifest, sidecar: &str) -> Variables {
    let mut vars = Variables::new();
    vars.insert("name".to_string(), JsonValue::String(manifest.name.clone()));
    vars.insert("sidecar".to_string(), JsonValue::String(sidecar.to_string()));
    vars
}

fn extend(vars: &mut Variables, from: &Variables) {
    for (k, v) in from {
        vars.insert(k.clone(), v.clone());
    }
}

/// Render one service manifest against `provisions_dir`
pub fn render_service(manifest: &ServiceManifest, provisions_dir: &Path) -> Result<RenderOutput> {
    Renderer::new(provisions_dir).render_service(manifest)
}

/// Render a stack file against `provisions_dir` and `services_dir`
pub fn render_stack(
    stack_path: &Path,
    provisions_dir: &Path,
    services_dir: &Path,
    overlay: &Variables,
) -> Result<RenderOutput> {
    Renderer::new(provisions_dir).render_stack(stack_path, services_dir, overlay)
}

fn read_manifest(path: &Path, what: &'static str, kind: Kind) -> Result<String> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(EngineError::NotFound {
                what,
                path: path.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(EngineError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    ManifestMeta::from_slice(content.as_bytes())
        .and_then(|meta| meta.validate(Some(kind)))
        .map_err(|source| EngineError::Version {
            name: path.display().to_string(),
            source,
        })?;

    Ok(content)
}

/// Read and validate a service manifest
pub fn load_service_manifest(path: &Path) -> Result<ServiceManifest> {
    let content = read_manifest(path, "service manifest", Kind::Service)?;
    ServiceManifest::from_yaml(&content)
        .map_err(|e| EngineError::parse(path.display().to_string(), e))
}

/// Read and validate a stack file
pub fn load_stack(path: &Path) -> Result<Stack> {
    let content = read_manifest(path, "stack", Kind::Stack)?;
    Stack::from_yaml(&content).map_err(|e| EngineError::parse(path.display().to_string(), e))
}

/// Read a values file to overlay onto service config
pub fn load_values_overlay(path: &Path) -> Result<Variables> {
    if !path.is_file() {
        return Err(EngineError::NotFound {
            what: "values file",
            path: path.to_path_buf(),
        });
    }
    Ok(Values::from_file(path)?.into_variables()?)
}
