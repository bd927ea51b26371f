//! Error types for the hook installer.

use std::path::PathBuf;
use thiserror::Error;

/// Failures that stop an install run.
///
/// A declined confirmation is not an error; see
/// [`InstallOutcome::Rejected`](crate::install::InstallOutcome::Rejected).
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("settings file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("invalid settings file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The diff or a status message could not be delivered to the operator.
    #[error("failed to write to terminal: {0}")]
    Output(#[source] std::io::Error),

    /// The write failed after the operator confirmed; the original file is untouched.
    #[error("aborted, {0}")]
    Aborted(#[source] Box<InstallError>),
}

impl InstallError {
    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, InstallError>;
