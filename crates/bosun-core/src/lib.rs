//! Bosun Core - Core types for the homelab manifest compiler
//!
//! This crate provides the foundational types used throughout bosun:
//! - `Values` / `Variables`: schema-free document trees and binding sets
//! - `ServiceManifest` / `Stack`: operator-authored manifests
//! - `version`: `apiVersion`/`kind` validation and kind detection
//! - `migrate`: header insertion for unversioned manifests
//! - `ProjectConfig`: project directory discovery

pub mod config;
pub mod error;
pub mod manifest;
pub mod migrate;
pub mod values;
pub mod version;

pub use config::{ProjectConfig, ProjectFile};
pub use error::{CoreError, Result};
pub use manifest::{SERVICE_TYPE_RAW, ServiceManifest, Stack};
pub use migrate::{Migration, MigrateOptions, MigrationResult, migrate_to_v1};
pub use values::{Values, Variables, parse_set_values, to_display_string};
pub use version::{API_VERSION_V1, Kind, ManifestMeta, VersionError};
