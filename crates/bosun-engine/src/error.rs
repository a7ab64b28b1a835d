//! Engine error types

use bosun_core::{CoreError, VersionError};
use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Main engine error type
///
/// Wrapping variants (`Include`, `Provision`, `Need`, `Sidecar`, `Service`)
/// embed the inner error in their message so the full path to a failure is
/// visible from a single `to_string()`.
#[derive(Error, Debug, Diagnostic)]
pub enum EngineError {
    #[error("missing variables: ${{{}}}", names.join("}, ${"))]
    #[diagnostic(
        code(bosun::engine::missing_variables),
        help("define them under `config:` in the service manifest, or pass them with --set")
    )]
    MissingVariables { names: Vec<String> },

    #[error("{what} not found: {}", path.display())]
    #[diagnostic(code(bosun::engine::not_found))]
    NotFound { what: &'static str, path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    #[diagnostic(code(bosun::engine::io))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    #[diagnostic(code(bosun::engine::io))]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse {name}: {message}")]
    #[diagnostic(code(bosun::engine::parse))]
    Parse { name: String, message: String },

    #[error("include {name} in {parent}: {inner}")]
    #[diagnostic(code(bosun::engine::include))]
    Include {
        name: String,
        parent: String,
        inner: Box<EngineError>,
    },

    #[error("load provision {name}: {inner}")]
    #[diagnostic(code(bosun::engine::provision))]
    Provision { name: String, inner: Box<EngineError> },

    #[error("load need {name}: {inner}")]
    #[diagnostic(code(bosun::engine::need))]
    Need { name: String, inner: Box<EngineError> },

    #[error("load sidecar {name}: {inner}")]
    #[diagnostic(code(bosun::engine::sidecar))]
    Sidecar { name: String, inner: Box<EngineError> },

    #[error("render service {name}: {inner}")]
    #[diagnostic(code(bosun::engine::service))]
    Service { name: String, inner: Box<EngineError> },

    #[error("merge depth exceeded maximum of {max_depth} at path {path:?}")]
    #[diagnostic(
        code(bosun::engine::depth_exceeded),
        help("the document is cyclic or nested deeper than any real manifest should be")
    )]
    DepthExceeded { path: String, max_depth: usize },

    #[error("invalid manifest {name}: {source}")]
    #[diagnostic(code(bosun::engine::version))]
    Version {
        name: String,
        #[source]
        source: VersionError,
    },

    #[error(transparent)]
    #[diagnostic(code(bosun::engine::core))]
    Core(#[from] CoreError),

    #[error("YAML error: {0}")]
    #[diagnostic(code(bosun::engine::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl EngineError {
    pub(crate) fn parse(name: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            name: name.into(),
            message: message.to_string(),
        }
    }

    fn inner(&self) -> Option<(&str, &EngineError)> {
        match self {
            Self::Include { name, inner, .. }
            | Self::Provision { name, inner }
            | Self::Need { name, inner }
            | Self::Sidecar { name, inner }
            | Self::Service { name, inner } => Some((name.as_str(), inner.as_ref())),
            _ => None,
        }
    }

    /// Names of the services, provisions and includes leading to the failure,
    /// outermost first
    pub fn provision_chain(&self) -> Vec<&str> {
        let mut chain = Vec::new();
        let mut current = self;
        while let Some((name, inner)) = current.inner() {
            chain.push(name);
            current = inner;
        }
        chain
    }

    /// The innermost error, past every wrapping layer
    pub fn root_cause(&self) -> &EngineError {
        let mut current = self;
        while let Some((_, inner)) = current.inner() {
            current = inner;
        }
        current
    }

    /// Missing variable names, if the root cause is an interpolation failure
    pub fn missing_variables(&self) -> Option<&[String]> {
        match self.root_cause() {
            Self::MissingVariables { names } => Some(names),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
