//! # envlock
//!
//! Device enrollment and recipient management for envlock projects.
//!
//! ## Overview
//!
//! A project keeps a registry of recipients: the public keys that shared
//! `.env` ciphertext is encrypted to. New machines join through a
//! single-use invite:
//!
//! - **Invite**: a trusted machine issues a short-lived token
//! - **Join**: the new machine submits a request carrying its public key
//! - **Approve / reject**: a trusted machine decides; approval adds the
//!   device to the registry and consumes the invite
//!
//! Recipients can also be added by hand, soft-revoked or deleted.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use envlock::{Envlock, EnvlockConfig, DeviceIdentity};
//! use envlock::store::{MemoryObjectStore, ProjectStore};
//!
//! async fn example() {
//!     let store = ProjectStore::new(MemoryObjectStore::new(), "envlock/demo");
//!     let envlock = Envlock::new(store, EnvlockConfig::default());
//!
//!     let (_invite, token) = envlock.create_invite("alice-laptop", None).await.unwrap();
//!
//!     let device = DeviceIdentity::from_public_key("bobs-pc", "age1...");
//!     let request = envlock.join(&token.to_string(), &device).await.unwrap();
//!
//!     let outcome = envlock.approve(&request.id, "").await.unwrap();
//!     assert!(outcome.recipient_added());
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `envlock::core` - Domain types and state machines
//! - `envlock::store` - Store port and backends

pub mod approval;
pub mod config;
pub mod error;
pub mod service;

pub use envlock_core as core;
pub use envlock_store as store;

pub use approval::{ApprovalOutcome, ApprovalStep, RecipientChange};
pub use config::{BackendConfig, EnrollmentSettings, ProjectConfig};
pub use error::{EnvlockError, Result};
pub use service::{Envlock, EnvlockConfig};

pub use envlock_core::{
    DeviceIdentity, EnrollmentRequest, ErrorKind, Invite, InviteId, InviteStatus, InviteToken,
    NewRecipient, Recipient, RecipientRegistry, RecipientStatus, RequestId, RequestStatus,
};
