//! The envlock API: enrollment and recipient management over a store.
//!
//! Every operation is a load, a pure state transition from `envlock-core`,
//! and one or more whole-record writes. Nothing is cached between calls.

use chrono::{Duration, Utc};
use envlock_core::{
    extract_token, ApprovalPlan, CoreError, DeviceIdentity, EnrollmentRequest, Invite, InviteId,
    InviteToken, NewRecipient, Recipient, RecipientRegistry, RequestId, SOURCE_LOCAL_INIT,
    SOURCE_MANUAL,
};
use envlock_store::MetadataStore;
use tracing::{debug, info, warn};

use crate::approval::{self, ApprovalOutcome, RecipientChange};
use crate::error::Result;

/// Note attached to the recipient added by project bootstrap.
pub const BOOTSTRAP_NOTE: &str = "Added during project init";

/// Configuration for [`Envlock`].
#[derive(Debug, Clone)]
pub struct EnvlockConfig {
    /// Lifetime of invites created without an explicit TTL.
    pub invite_ttl: Duration,
}

impl Default for EnvlockConfig {
    fn default() -> Self {
        Self {
            invite_ttl: Duration::minutes(15),
        }
    }
}

/// The envlock API over a metadata store.
pub struct Envlock<S> {
    store: S,
    config: EnvlockConfig,
}

impl<S: MetadataStore> Envlock<S> {
    pub fn new(store: S, config: EnvlockConfig) -> Self {
        Self { store, config }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EnvlockConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Recipients
    // ─────────────────────────────────────────────────────────────────────────

    /// The full registry, revoked entries included.
    pub async fn recipients(&self) -> Result<RecipientRegistry> {
        Ok(self.store.load_recipients().await?)
    }

    /// Recipients sorted by name.
    pub async fn list_recipients(&self, include_revoked: bool) -> Result<Vec<Recipient>> {
        let registry = self.store.load_recipients().await?;
        Ok(registry
            .listing(include_revoked)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Add a recipient by hand. The source defaults to `manual`.
    pub async fn add_recipient(&self, mut new: NewRecipient) -> Result<Recipient> {
        if new.source.trim().is_empty() {
            new.source = SOURCE_MANUAL.to_string();
        }
        let mut registry = self.store.load_recipients().await?;
        let added = registry.add(new)?.clone();
        self.store.write_recipients(&registry).await?;

        info!(name = %added.name, fingerprint = %added.fingerprint, source = %added.source, "recipient added");
        Ok(added)
    }

    /// Register the local device while setting up a project.
    ///
    /// The registry is written even when the device is already present, so
    /// the registry object exists afterwards.
    pub async fn bootstrap_recipient(&self, device: &DeviceIdentity) -> Result<RecipientChange> {
        let mut registry = self.store.load_recipients().await?;
        let new = NewRecipient::new(&device.name, &device.public_key, &device.fingerprint)
            .source(SOURCE_LOCAL_INIT)
            .note(BOOTSTRAP_NOTE);

        let change = match registry.add(new) {
            Ok(recipient) => RecipientChange::Added(recipient.clone()),
            Err(err) if err.is_duplicate() => {
                debug!(device = %device.name, error = %err, "local device already a recipient");
                RecipientChange::AlreadyPresent
            }
            Err(err) => return Err(err.into()),
        };
        self.store.write_recipients(&registry).await?;

        info!(device = %device.name, fingerprint = %device.fingerprint, "registry initialized");
        Ok(change)
    }

    /// Soft-revoke a recipient by name or fingerprint.
    ///
    /// Data already encrypted to the recipient stays decryptable by it.
    pub async fn revoke_recipient(&self, query: &str) -> Result<Recipient> {
        let mut registry = self.store.load_recipients().await?;
        let revoked = registry.revoke(query)?;
        self.store.write_recipients(&registry).await?;

        info!(name = %revoked.name, fingerprint = %revoked.fingerprint, "recipient revoked");
        Ok(revoked)
    }

    /// Remove a recipient from the registry entirely.
    pub async fn delete_recipient(&self, query: &str) -> Result<Recipient> {
        let mut registry = self.store.load_recipients().await?;
        let removed = registry.delete(query)?;
        self.store.write_recipients(&registry).await?;

        info!(name = %removed.name, fingerprint = %removed.fingerprint, "recipient deleted");
        Ok(removed)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Invites
    // ─────────────────────────────────────────────────────────────────────────

    /// Issue and persist an invite.
    ///
    /// `ttl` falls back to [`EnvlockConfig::invite_ttl`]. The returned token
    /// is the only copy of the secret.
    pub async fn create_invite(
        &self,
        created_by: &str,
        ttl: Option<Duration>,
    ) -> Result<(Invite, InviteToken)> {
        let ttl = ttl.unwrap_or(self.config.invite_ttl);
        let (invite, token) = Invite::new(ttl, created_by)?;
        self.store.save_invite(&invite).await?;

        info!(invite_id = %invite.id, expires_at = %invite.expires_at, "invite created");
        Ok((invite, token))
    }

    /// All invites, newest first.
    pub async fn list_invites(&self) -> Result<Vec<Invite>> {
        Ok(self.store.list_invites().await?)
    }

    /// Revoke an unused invite.
    pub async fn revoke_invite(&self, id: &InviteId) -> Result<Invite> {
        let mut invite = self.store.load_invite(id).await?;
        invite.revoke()?;
        self.store.save_invite(&invite).await?;

        info!(invite_id = %invite.id, "invite revoked");
        Ok(invite)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Enrollment requests
    // ─────────────────────────────────────────────────────────────────────────

    /// Submit a join request for `device` using an invite token or a URL
    /// carrying one.
    pub async fn join(&self, token_or_url: &str, device: &DeviceIdentity) -> Result<EnrollmentRequest> {
        let raw = extract_token(token_or_url);
        if raw.is_empty() {
            return Err(CoreError::Validation("invite token is required".into()).into());
        }
        let token = InviteToken::parse(raw)?;

        let invite = self.store.load_invite(token.invite_id()).await?;
        invite.verify_token(raw)?;

        let existing = self.store.list_requests().await?;
        let request = EnrollmentRequest::new_join(&existing, &invite, device)?;
        self.store.save_request(&request).await?;

        info!(
            request_id = %request.id,
            invite_id = %request.invite_id,
            device = %request.device_name,
            fingerprint = %request.fingerprint,
            "enrollment request created"
        );
        Ok(request)
    }

    /// Requests newest first; decided ones only when `include_decided`.
    pub async fn list_requests(&self, include_decided: bool) -> Result<Vec<EnrollmentRequest>> {
        let mut requests = self.store.list_requests().await?;
        if !include_decided {
            requests.retain(|r| r.is_pending());
        }
        Ok(requests)
    }

    /// Approve a pending request.
    ///
    /// Adds the device to the registry (a device that is already a
    /// recipient is accepted), marks the request approved and the invite
    /// used, in that order. Invite expiry is not re-checked.
    pub async fn approve(&self, id: &RequestId, note: &str) -> Result<ApprovalOutcome> {
        let request = self.store.load_request(id).await?;
        request.ensure_pending()?;

        let invite = self.store.load_invite(&request.invite_id).await?;
        invite.validate_for_approval()?;

        let registry = self.store.load_recipients().await?;
        let plan = ApprovalPlan::new(request, invite, registry, note, Utc::now())?;
        if plan.added.is_none() {
            warn!(
                request_id = %plan.request.id,
                fingerprint = %plan.request.fingerprint,
                "device is already a recipient; approving without registry change"
            );
        }

        let outcome = approval::execute(&self.store, plan).await?;
        info!(
            request_id = %outcome.request.id,
            device = %outcome.request.device_name,
            added = outcome.recipient_added(),
            "enrollment request approved"
        );
        Ok(outcome)
    }

    /// Reject a pending request. Registry and invite are untouched.
    pub async fn reject(&self, id: &RequestId, reason: &str) -> Result<EnrollmentRequest> {
        let mut request = self.store.load_request(id).await?;
        request.reject(reason, Utc::now())?;
        self.store.save_request(&request).await?;

        info!(request_id = %request.id, device = %request.device_name, "enrollment request rejected");
        Ok(request)
    }
}
