//! # envlock Core
//!
//! Pure primitives for envlock device enrollment: the recipient registry,
//! invites and enrollment requests.
//!
//! This crate contains no I/O, no storage, no networking. Every operation
//! works on in-memory values; persistence belongs to `envlock-store` and
//! sequencing of writes to the `envlock` facade.
//!
//! ## Key Types
//!
//! - [`RecipientRegistry`] - The versioned set of encryption targets
//! - [`Invite`] / [`InviteToken`] - Single-use, short-lived join credentials
//! - [`EnrollmentRequest`] - A pending ask to add a device as a recipient
//! - [`ApprovalPlan`] - The three updates an approval produces
//!
//! ## Lifecycle
//!
//! ```text
//! Invite::issue ──token──▶ EnrollmentRequest::join ──▶ pending
//!                                                      │
//!                          approve (ApprovalPlan) ◀────┤────▶ reject
//!                                  │
//!               registry.add + request approved + invite used
//! ```

pub mod crypto;
pub mod error;
pub mod invite;
pub mod recipient;
pub mod request;
pub mod types;

pub use crypto::{fingerprint, secret_hash};
pub use error::{CoreError, ErrorKind, Result};
pub use invite::{extract_token, Invite, InviteStatus, InviteToken, TOKEN_PREFIX};
pub use recipient::{
    NewRecipient, Recipient, RecipientRegistry, RecipientStatus, SOURCE_ENROLL_APPROVE,
    SOURCE_LOCAL_INIT, SOURCE_MANUAL,
};
pub use request::{ApprovalPlan, DeviceIdentity, EnrollmentRequest, RequestStatus};
pub use types::{InviteId, RequestId, RECORD_VERSION};
