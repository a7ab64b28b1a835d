//! Service and stack manifest definitions

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::values::Variables;

/// `type` value that disables provisioning
pub const SERVICE_TYPE_RAW: &str = "raw";

/// A deployable service
///
/// ```yaml
/// name: myapp
/// provisions: [container, reverse-proxy]
/// needs: [postgres]
/// config:
///   image: ghcr.io/example/myapp:latest
///   db_password: secret
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceManifest {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    /// Service name, bound as `${name}` during interpolation
    pub name: String,

    /// `raw` passes `compose` through verbatim
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,

    /// Provisions to apply, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provisions: Vec<String>,

    /// Interpolation variables
    #[serde(default, skip_serializing_if = "Variables::is_empty")]
    pub config: Variables,

    /// Sidecars with explicit configuration, keyed by provision name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub services: BTreeMap<String, Option<Variables>>,

    /// Sidecar shorthand using built-in defaults
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub needs: Vec<String>,

    /// Raw-mode compose services
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compose: Option<JsonValue>,
}

impl ServiceManifest {
    /// Parse a manifest from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let manifest: Self = serde_yaml::from_str(yaml)?;
        if manifest.name.is_empty() {
            return Err(CoreError::MissingField {
                field: "name".to_string(),
            });
        }
        Ok(manifest)
    }

    /// Load a manifest from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::read(path, e))?;
        Self::from_yaml(&content)
    }

    pub fn is_raw(&self) -> bool {
        self.service_type.as_deref() == Some(SERVICE_TYPE_RAW)
    }
}

/// A collection of services rendered together
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stack {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    /// Service manifest files, relative to the services directory
    #[serde(default)]
    pub include: Vec<String>,

    /// Compose network definitions, installed verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub networks: Option<JsonValue>,
}

impl Stack {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::read(path, e))?;
        Self::from_yaml(&content)
    }
}
