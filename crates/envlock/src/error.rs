//! Error types for the envlock API.

use std::path::PathBuf;

use envlock_core::{CoreError, ErrorKind, RequestId};
use envlock_store::StoreError;
use thiserror::Error;

use crate::approval::ApprovalStep;

/// Errors that can occur during envlock operations.
#[derive(Debug, Error)]
pub enum EnvlockError {
    /// A domain rule was violated.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An approval stopped part-way through its writes.
    #[error(
        "approval of request {request_id} interrupted at {failed} (completed: {}): {source}",
        describe_steps(.completed)
    )]
    ApprovalInterrupted {
        request_id: RequestId,
        failed: ApprovalStep,
        completed: Vec<ApprovalStep>,
        source: StoreError,
    },

    /// No project config at the given root.
    #[error("no envlock project found at {} (run `envlock project init`)", .0.display())]
    ProjectNotFound(PathBuf),

    /// Refused to overwrite an existing project config.
    #[error("project config already exists at {} (use --force to overwrite)", .0.display())]
    ProjectExists(PathBuf),

    /// The project config could not be parsed.
    #[error("invalid project config {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// The project config could not be encoded.
    #[error("could not encode project config: {0}")]
    ConfigEncode(#[from] toml::ser::Error),

    /// The project config parsed but is unusable.
    #[error("invalid project config: {0}")]
    InvalidConfig(String),

    /// I/O error on a project file.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl EnvlockError {
    /// Classify this error within the envlock taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EnvlockError::Core(e) => e.kind(),
            EnvlockError::Store(e) => e.kind(),
            EnvlockError::ApprovalInterrupted { .. } | EnvlockError::Io { .. } => ErrorKind::Store,
            EnvlockError::ProjectNotFound(_) => ErrorKind::NotFound,
            EnvlockError::ProjectExists(_) => ErrorKind::StateConflict,
            EnvlockError::ConfigParse { .. }
            | EnvlockError::ConfigEncode(_)
            | EnvlockError::InvalidConfig(_) => ErrorKind::Validation,
        }
    }
}

fn describe_steps(steps: &[ApprovalStep]) -> String {
    if steps.is_empty() {
        return "none".to_string();
    }
    steps
        .iter()
        .map(ApprovalStep::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for envlock operations.
pub type Result<T> = std::result::Result<T, EnvlockError>;
