//! Core error types

use std::path::PathBuf;
use thiserror::Error;

use crate::version::VersionError;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Project root not found (no manifest/ directory above {start})")]
    RootNotFound { start: PathBuf },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid value: {message}")]
    InvalidValue { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error(transparent)]
    Version(#[from] VersionError),
}

impl CoreError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
