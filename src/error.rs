//! Error types for shellcred operations

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use shellcred_core::ParseError;

/// The main error type for shellcred operations
///
/// Discovery never returns these directly: errors found while probing sources are
/// collected on the [`ImportAttempt`](crate::import::ImportAttempt) instead.
/// Provisioning returns them synchronously, before any child process is spawned.
///
/// Messages never include credential values, only field names and paths.
#[derive(Error, Debug)]
pub enum ShellCredError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid credential schema: {0}")]
    Schema(#[from] ParseError),
    #[error("Value for field '{0}' does not match its expected composition")]
    CompositionMismatch(String),
    #[error("Malformed source {}: {reason}", path.display())]
    MalformedSource { path: PathBuf, reason: String },
    #[error("Provisioning failed: {0}")]
    ProvisionFailed(String),
    #[error("Field '{0}' is required but not set")]
    MissingField(String),
    #[error("No command specified")]
    EmptyCommand,
}

impl ShellCredError {
    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::MalformedSource {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn provision_failed(path: &std::path::Path, err: io::Error) -> Self {
        Self::ProvisionFailed(format!("{}: {}", path.display(), err))
    }
}

/// A type alias for `Result<T, ShellCredError>`
pub type Result<T> = std::result::Result<T, ShellCredError>;
