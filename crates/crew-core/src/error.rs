//! Error taxonomy for crew coordination operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during team, task, inbox, or store operations
#[derive(Error, Debug)]
pub enum CrewError {
    /// Team, task, or agent does not exist
    #[error("{kind} {name:?} not found")]
    NotFound { kind: &'static str, name: String },

    /// Duplicate team or member name
    #[error("{kind} {name:?} already exists")]
    Conflict { kind: &'static str, name: String },

    /// Malformed name, reserved name, or empty required field
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Illegal task status change
    #[error("cannot transition task from {from:?} to {to:?}")]
    InvalidTransition { from: String, to: String },

    /// Operation precondition not satisfied (e.g. delete team with teammates)
    #[error("precondition failed: {message}")]
    PreconditionFailed { message: String },

    /// Failed to acquire file lock after multiple retries
    #[error("failed to acquire lock on {path} after {retries} retries")]
    LockTimeout { path: PathBuf, retries: u32 },

    /// External probe or binary unavailable
    #[error("unavailable: {message}")]
    Unavailable { message: String },

    /// File I/O error
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse or serialize JSON
    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl CrewError {
    pub(crate) fn team_not_found(name: &str) -> Self {
        CrewError::NotFound {
            kind: "team",
            name: name.to_string(),
        }
    }

    pub(crate) fn task_not_found(id: &str) -> Self {
        CrewError::NotFound {
            kind: "task",
            name: id.to_string(),
        }
    }

    pub(crate) fn agent_not_found(name: &str) -> Self {
        CrewError::NotFound {
            kind: "agent",
            name: name.to_string(),
        }
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        CrewError::InvalidArgument {
            message: message.into(),
        }
    }

    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        CrewError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn json(path: &std::path::Path, source: serde_json::Error) -> Self {
        CrewError::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, CrewError>;
