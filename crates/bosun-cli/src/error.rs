//! CLI error types with exit code handling
//!
//! Every command returns [`CliError`], which keeps the diagnostic of the
//! underlying engine or lock error and maps it to a process exit code.

use bosun_core::CoreError;
use bosun_engine::EngineError;
use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use crate::exit_codes;
use crate::lock::LockError;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Render(#[from] EngineError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    #[diagnostic(code(bosun::cli::core))]
    Core(#[from] CoreError),

    #[error("{what} not found: {name}")]
    #[diagnostic(code(bosun::cli::not_found))]
    NotFound {
        what: &'static str,
        name: String,
        #[help]
        help: Option<String>,
    },

    #[error("{message}")]
    #[diagnostic(code(bosun::cli::usage))]
    Usage {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Check failed with {errors} invalid manifest(s)")]
    #[diagnostic(code(bosun::cli::check))]
    CheckFailed { errors: usize },

    #[error("Failed to write {}: {source}", path.display())]
    #[diagnostic(code(bosun::cli::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Render(EngineError::NotFound { .. }) => exit_codes::IO_ERROR,
            CliError::Render(_) => exit_codes::RENDER_ERROR,
            CliError::Lock(LockError::AlreadyRunning { .. }) => exit_codes::LOCKED,
            CliError::Lock(_) => exit_codes::IO_ERROR,
            CliError::Core(_) => exit_codes::ERROR,
            CliError::NotFound { .. } => exit_codes::IO_ERROR,
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::CheckFailed { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
        }
    }

    pub fn usage(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
