//! Error types for envlock Core.

use std::fmt;

use thiserror::Error;

use crate::invite::InviteStatus;
use crate::request::RequestStatus;
use crate::types::{InviteId, RequestId};

/// The closed set of failure kinds surfaced to callers.
///
/// Every error type in the workspace maps onto one of these so that
/// orchestration code can branch on the kind without matching concrete
/// variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad caller input (empty required field, non-positive TTL).
    Validation,
    /// Recipient collision on name, public key or fingerprint.
    Duplicate,
    /// Recipient, invite or request lookup miss.
    NotFound,
    /// Malformed or mismatched invite token.
    InvalidToken,
    /// Invite used past its expiry.
    InviteExpired,
    /// Invite already consumed by an approval.
    InviteUsed,
    /// Entity not in the status the transition requires.
    StateConflict,
    /// Opaque storage failure.
    Store,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Duplicate => "duplicate",
            ErrorKind::NotFound => "not found",
            ErrorKind::InvalidToken => "invalid token",
            ErrorKind::InviteExpired => "invite expired",
            ErrorKind::InviteUsed => "invite used",
            ErrorKind::StateConflict => "state conflict",
            ErrorKind::Store => "store",
        };
        f.write_str(name)
    }
}

/// Errors produced by the pure enrollment state machines.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0}")]
    Validation(String),

    #[error("duplicate recipient: name {0:?} already exists")]
    DuplicateName(String),

    #[error("duplicate recipient: recipient {0:?} already exists")]
    DuplicateKey(String),

    #[error("recipient not found: {0}")]
    RecipientNotFound(String),

    #[error("invalid invite token")]
    InvalidToken,

    #[error("invite expired")]
    InviteExpired,

    #[error("invite already used")]
    InviteUsed,

    #[error("invite status is {0}")]
    InviteStatus(InviteStatus),

    #[error("request {id} is {status} (expected pending)")]
    RequestNotPending { id: RequestId, status: RequestStatus },

    #[error("pending request already exists for invite {0}")]
    InvitePending(InviteId),

    #[error("device {0} already has a pending request")]
    DevicePending(String),
}

impl CoreError {
    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::DuplicateName(_) | CoreError::DuplicateKey(_) => ErrorKind::Duplicate,
            CoreError::RecipientNotFound(_) => ErrorKind::NotFound,
            CoreError::InvalidToken => ErrorKind::InvalidToken,
            CoreError::InviteExpired => ErrorKind::InviteExpired,
            CoreError::InviteUsed => ErrorKind::InviteUsed,
            CoreError::InviteStatus(_)
            | CoreError::RequestNotPending { .. }
            | CoreError::InvitePending(_)
            | CoreError::DevicePending(_) => ErrorKind::StateConflict,
        }
    }

    /// Whether this is a recipient collision.
    pub fn is_duplicate(&self) -> bool {
        self.kind() == ErrorKind::Duplicate
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
