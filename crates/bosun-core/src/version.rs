//! Manifest schema versioning
//!
//! Every manifest document may carry `apiVersion` and `kind`. Documents
//! written before versioning existed carry neither, and are still accepted
//! by the lenient checks. Strict checks require both.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Current manifest API version
pub const API_VERSION_V1: &str = "bosun.io/v1";

/// All API versions that can be loaded
pub const SUPPORTED_API_VERSIONS: &[&str] = &[API_VERSION_V1];

/// Versioning and migration errors
#[derive(Error, Debug)]
pub enum VersionError {
    #[error("unsupported API version: {version} (supported: {})", SUPPORTED_API_VERSIONS.join(", "))]
    UnsupportedApiVersion { version: String },

    #[error("invalid manifest kind: {kind} (supported: {})", Kind::ALL.map(|k| k.as_str()).join(", "))]
    InvalidKind { kind: String },

    #[error("kind mismatch: got {got}, expected {expected}")]
    KindMismatch { got: String, expected: Kind },

    #[error("missing apiVersion field")]
    MissingApiVersion,

    #[error("missing kind field")]
    MissingKind,

    #[error("parse manifest metadata: {0}")]
    Parse(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, VersionError>;

/// Manifest kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Provision,
    Service,
    Stack,
}

impl Kind {
    pub const ALL: [Kind; 3] = [Kind::Provision, Kind::Service, Kind::Stack];

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Provision => "Provision",
            Kind::Service => "Service",
            Kind::Stack => "Stack",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self> {
        Kind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| VersionError::InvalidKind {
                kind: s.to_string(),
            })
    }
}

/// The `apiVersion`/`kind` header of a manifest
///
/// Absent fields deserialize as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManifestMeta {
    pub api_version: String,
    pub kind: String,
}

impl ManifestMeta {
    /// Extract the metadata fields from raw YAML
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let doc: serde_yaml::Value = serde_yaml::from_slice(data)?;
        if doc.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_value(doc)?)
    }

    /// Extract the metadata fields from an already parsed document
    pub fn from_document(doc: &JsonValue) -> Self {
        let field = |key: &str| {
            doc.get(key)
                .and_then(JsonValue::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Self {
            api_version: field("apiVersion"),
            kind: field("kind"),
        }
    }

    /// Both `apiVersion` and `kind` are present
    pub fn is_versioned(&self) -> bool {
        !self.api_version.is_empty() && !self.kind.is_empty()
    }

    /// Lenient check: empty fields pass, present fields must be supported
    ///
    /// When `expected` is given, a present `kind` must also match it.
    pub fn validate(&self, expected: Option<Kind>) -> Result<()> {
        validate_api_version(&self.api_version)?;
        if self.kind.is_empty() {
            return Ok(());
        }
        match expected {
            Some(expected) => validate_kind(&self.kind, expected),
            None => self.kind.parse::<Kind>().map(|_| ()),
        }
    }

    /// Strict check: both fields required, supported, and matching `expected`
    pub fn validate_strict(&self, expected: Kind) -> Result<()> {
        if self.api_version.is_empty() {
            return Err(VersionError::MissingApiVersion);
        }
        if self.kind.is_empty() {
            return Err(VersionError::MissingKind);
        }
        validate_api_version(&self.api_version)?;
        validate_kind(&self.kind, expected)
    }
}

/// Check that `version` is supported; empty passes for backwards compatibility
pub fn validate_api_version(version: &str) -> Result<()> {
    if version.is_empty() || SUPPORTED_API_VERSIONS.contains(&version) {
        return Ok(());
    }
    Err(VersionError::UnsupportedApiVersion {
        version: version.to_string(),
    })
}

/// Check that `kind` is known and equals `expected`; empty passes
pub fn validate_kind(kind: &str, expected: Kind) -> Result<()> {
    if kind.is_empty() {
        return Ok(());
    }
    let parsed: Kind = kind.parse()?;
    if parsed != expected {
        return Err(VersionError::KindMismatch {
            got: kind.to_string(),
            expected,
        });
    }
    Ok(())
}

/// Lenient validation of raw YAML
pub fn validate_manifest(data: &[u8]) -> Result<ManifestMeta> {
    let meta = ManifestMeta::from_slice(data)?;
    meta.validate(None)?;
    Ok(meta)
}

/// Strict validation of raw YAML against an expected kind
pub fn validate_manifest_strict(data: &[u8], expected: Kind) -> Result<ManifestMeta> {
    let meta = ManifestMeta::from_slice(data)?;
    meta.validate_strict(expected)?;
    Ok(meta)
}

/// Whether raw YAML carries both `apiVersion` and `kind`
pub fn is_versioned(data: &[u8]) -> Result<bool> {
    Ok(ManifestMeta::from_slice(data)?.is_versioned())
}

/// The raw `kind` field, empty when absent
pub fn manifest_kind(data: &[u8]) -> Result<String> {
    Ok(ManifestMeta::from_slice(data)?.kind)
}

const SERVICE_MARKERS: &[&str] = &["provisions", "needs", "services", "type"];

/// Infer the kind of an unversioned document from its structure
///
/// `include` always means a Stack. A `name` plus any service marker is a
/// Service, which keeps raw services carrying `compose` out of the
/// Provision bucket. Everything else, including an empty document, is a
/// Provision.
pub fn detect_kind(data: &[u8]) -> Result<Kind> {
    let doc: serde_yaml::Value = serde_yaml::from_slice(data)?;
    let Some(map) = doc.as_mapping() else {
        return Ok(Kind::Provision);
    };
    let has = |key: &str| map.contains_key(key);

    if has("include") {
        return Ok(Kind::Stack);
    }
    if has("name") && SERVICE_MARKERS.iter().any(|k| has(k)) {
        return Ok(Kind::Service);
    }
    Ok(Kind::Provision)
}
