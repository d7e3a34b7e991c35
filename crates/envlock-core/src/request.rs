//! Enrollment requests and the approval plan.
//!
//! A request is created `pending` by the joining machine and decided
//! exactly once by an operator:
//!
//! ```text
//! pending ──approve──▶ approved
//!    └────reject────▶ rejected
//! ```
//!
//! Approval touches three records (registry, request, invite). The pure
//! part of that work lives in [`ApprovalPlan`]; writing the records in
//! order is the caller's job.

use std::fmt;

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::crypto;
use crate::error::{CoreError, Result};
use crate::invite::Invite;
use crate::recipient::{NewRecipient, Recipient, RecipientRegistry, SOURCE_ENROLL_APPROVE};
use crate::types::{opt_time, version, InviteId, RequestId, RECORD_VERSION};

/// Lifecycle state of an enrollment request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identity a joining device proposes for itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub name: String,
    pub public_key: String,
    pub fingerprint: String,
}

impl DeviceIdentity {
    pub fn new(
        name: impl Into<String>,
        public_key: impl Into<String>,
        fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            public_key: public_key.into(),
            fingerprint: fingerprint.into(),
        }
    }

    /// Build an identity whose fingerprint is derived from the public key.
    pub fn from_public_key(name: impl Into<String>, public_key: impl Into<String>) -> Self {
        let public_key = public_key.into();
        let fingerprint = crypto::fingerprint(&public_key);
        Self::new(name, public_key, fingerprint)
    }
}

/// A persisted enrollment request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRequest {
    #[serde(default = "version::current", with = "version")]
    pub version: u32,
    pub id: RequestId,
    pub invite_id: InviteId,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_time")]
    pub decision_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub decision_note: String,
    pub device_name: String,
    pub public_key: String,
    pub fingerprint: String,
}

impl EnrollmentRequest {
    /// Create a pending request against `invite`.
    ///
    /// The invite is re-validated at `now`, then `existing` is scanned for
    /// an outstanding request on the same invite or from the same device.
    pub fn join<R: RngCore + CryptoRng>(
        existing: &[EnrollmentRequest],
        invite: &Invite,
        device: &DeviceIdentity,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Self> {
        if invite.id.as_str().trim().is_empty() {
            return Err(CoreError::Validation("invite id is required".into()));
        }
        if invite.is_expired(now) {
            return Err(CoreError::InviteExpired);
        }
        invite.validate_for_approval()?;

        let fingerprint = device.fingerprint.trim();
        for request in existing.iter().filter(|r| r.is_pending()) {
            if request.invite_id == invite.id {
                return Err(CoreError::InvitePending(invite.id.clone()));
            }
            if request.fingerprint == fingerprint {
                return Err(CoreError::DevicePending(request.device_name.clone()));
            }
        }

        Ok(Self {
            version: RECORD_VERSION,
            id: RequestId::generate(rng),
            invite_id: invite.id.clone(),
            status: RequestStatus::Pending,
            created_at: now,
            decision_at: None,
            decision_note: String::new(),
            device_name: device.name.trim().to_string(),
            public_key: device.public_key.trim().to_string(),
            fingerprint: fingerprint.to_string(),
        })
    }

    /// Create a pending request using the system clock and OS randomness.
    pub fn new_join(
        existing: &[EnrollmentRequest],
        invite: &Invite,
        device: &DeviceIdentity,
    ) -> Result<Self> {
        Self::join(existing, invite, device, Utc::now(), &mut OsRng)
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    /// Fail unless the request is still awaiting a decision.
    pub fn ensure_pending(&self) -> Result<()> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(CoreError::RequestNotPending {
                id: self.id.clone(),
                status: self.status,
            })
        }
    }

    /// Reject the request. No registry or invite change follows.
    pub fn reject(&mut self, reason: &str, now: DateTime<Utc>) -> Result<()> {
        self.decide(RequestStatus::Rejected, reason, now)
    }

    /// The recipient entry an approval adds for this device.
    pub fn to_new_recipient(&self, now: DateTime<Utc>) -> NewRecipient {
        NewRecipient::new(&self.device_name, &self.public_key, &self.fingerprint)
            .created_at(now)
            .source(SOURCE_ENROLL_APPROVE)
            .note(format!("Added via enrollment request {}", self.id))
    }

    /// Sort requests newest first.
    pub fn sort_newest_first(requests: &mut [EnrollmentRequest]) {
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }

    fn decide(&mut self, status: RequestStatus, note: &str, now: DateTime<Utc>) -> Result<()> {
        self.ensure_pending()?;
        self.status = status;
        self.decision_at = Some(now);
        self.decision_note = note.trim().to_string();
        Ok(())
    }
}

/// Everything an approval changes, computed up front.
///
/// Persist `registry`, then `request`, then `invite`. The plan itself
/// performs no I/O.
#[derive(Debug, Clone)]
pub struct ApprovalPlan {
    pub request: EnrollmentRequest,
    pub invite: Invite,
    pub registry: RecipientRegistry,
    /// The new registry entry, or `None` when the device was already a recipient.
    pub added: Option<Recipient>,
}

impl ApprovalPlan {
    /// Plan the approval of `request`.
    ///
    /// A duplicate recipient is tolerated (the device is already trusted);
    /// any other registry error aborts the plan.
    pub fn new(
        mut request: EnrollmentRequest,
        mut invite: Invite,
        mut registry: RecipientRegistry,
        note: &str,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        request.ensure_pending()?;
        if invite.id.as_str() != request.invite_id.as_str() {
            return Err(CoreError::Validation(format!(
                "invite {} does not belong to request {}",
                invite.id, request.id
            )));
        }
        invite.validate_for_approval()?;

        let added = match registry.add(request.to_new_recipient(now)) {
            Ok(recipient) => Some(recipient.clone()),
            Err(err) if err.is_duplicate() => None,
            Err(err) => return Err(err),
        };

        request.decide(RequestStatus::Approved, note, now)?;
        invite.mark_used(&request.id, now);

        Ok(Self {
            request,
            invite,
            registry,
            added,
        })
    }
}
