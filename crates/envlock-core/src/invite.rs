//! Invites and invite tokens.
//!
//! An invite authorizes exactly one enrollment. Only the hash of its
//! secret is ever persisted; the plaintext secret travels out-of-band
//! inside the token, so a reader of the metadata store cannot forge a join.
//!
//! Token grammar: `envlock-invite-<invite_id>.<secret>`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::crypto;
use crate::error::{CoreError, Result};
use crate::types::{opt_time, version, InviteId, RequestId, RECORD_VERSION};

/// Literal every token starts with.
pub const TOKEN_PREFIX: &str = "envlock-invite-";

/// Separates the invite id from the secret inside a token.
pub const TOKEN_SEPARATOR: char = '.';

/// Query parameter carrying a token inside a join URL.
const TOKEN_QUERY_PARAM: &str = "token";

/// Lifecycle state of an invite.
///
/// `Legacy` is the empty status written by early clients; it is treated
/// as active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    Active,
    Used,
    Revoked,
    #[default]
    #[serde(rename = "")]
    Legacy,
}

impl InviteStatus {
    /// Whether an invite in this status may still be joined or approved.
    pub fn is_usable(&self) -> bool {
        matches!(self, InviteStatus::Active | InviteStatus::Legacy)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InviteStatus::Active => "active",
            InviteStatus::Used => "used",
            InviteStatus::Revoked => "revoked",
            InviteStatus::Legacy => "",
        }
    }
}

impl fmt::Display for InviteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InviteStatus::Legacy => f.write_str("active (legacy)"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// A persisted invite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    #[serde(default = "version::current", with = "version")]
    pub version: u32,
    pub id: InviteId,
    pub secret_hash: String,
    #[serde(default)]
    pub status: InviteStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_by_request_id: Option<RequestId>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_time")]
    pub used_at: Option<DateTime<Utc>>,
}

impl Invite {
    /// Issue a new invite valid for `ttl` starting at `now`.
    ///
    /// Returns the invite to persist and the token to hand to the joining
    /// machine. Fails with a validation error unless `ttl` is positive.
    pub fn issue<R: RngCore + CryptoRng>(
        ttl: Duration,
        created_by: &str,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<(Invite, InviteToken)> {
        if ttl <= Duration::zero() {
            return Err(CoreError::Validation("ttl must be greater than zero".into()));
        }
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| CoreError::Validation("ttl is out of range".into()))?;

        let id = InviteId::generate(rng);
        let secret = crypto::random_secret(rng);

        let invite = Invite {
            version: RECORD_VERSION,
            id: id.clone(),
            secret_hash: crypto::secret_hash(&secret),
            status: InviteStatus::Active,
            created_at: now,
            expires_at,
            created_by: created_by.trim().to_string(),
            used_by_request_id: None,
            used_at: None,
        };

        Ok((invite, InviteToken { invite_id: id, secret }))
    }

    /// Issue a new invite using the system clock and OS randomness.
    pub fn new(ttl: Duration, created_by: &str) -> Result<(Invite, InviteToken)> {
        Self::issue(ttl, created_by, Utc::now(), &mut OsRng)
    }

    /// Check that `token` was minted for this invite.
    ///
    /// Only hashes are compared; the plaintext secret is never needed on
    /// the stored side.
    pub fn verify_token(&self, token: &str) -> Result<()> {
        let parsed = InviteToken::parse(token)?;
        if parsed.invite_id.as_str() != self.id.as_str().trim() {
            return Err(CoreError::InvalidToken);
        }
        if !crypto::digests_match(&self.secret_hash, &crypto::secret_hash(&parsed.secret)) {
            return Err(CoreError::InvalidToken);
        }
        Ok(())
    }

    /// Expired means strictly after `expires_at`; the boundary instant is still valid.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whether a machine may create an enrollment request against this invite.
    pub fn validate_for_join(&self, now: DateTime<Utc>) -> Result<()> {
        self.validate_for_approval()?;
        if self.is_expired(now) {
            return Err(CoreError::InviteExpired);
        }
        Ok(())
    }

    /// Whether a request tied to this invite may be approved.
    ///
    /// Expiry is not checked here: a request created before expiry can
    /// still be approved afterwards.
    pub fn validate_for_approval(&self) -> Result<()> {
        match self.status {
            InviteStatus::Used => Err(CoreError::InviteUsed),
            status if !status.is_usable() => Err(CoreError::InviteStatus(status)),
            _ => Ok(()),
        }
    }

    /// Record that `request_id` consumed this invite.
    pub fn mark_used(&mut self, request_id: &RequestId, now: DateTime<Utc>) {
        self.status = InviteStatus::Used;
        self.used_by_request_id = Some(request_id.clone());
        self.used_at = Some(now);
    }

    /// Withdraw an invite that has not been used yet.
    pub fn revoke(&mut self) -> Result<()> {
        self.validate_for_approval()?;
        self.status = InviteStatus::Revoked;
        Ok(())
    }

    /// Sort invites newest first.
    pub fn sort_newest_first(invites: &mut [Invite]) {
        invites.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }
}

/// The out-of-band credential: invite id plus plaintext secret.
///
/// `Display` renders the full token text; `Debug` redacts the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct InviteToken {
    invite_id: InviteId,
    secret: String,
}

impl InviteToken {
    /// Parse a token, failing with [`CoreError::InvalidToken`] on any
    /// deviation from the prefix + separator grammar.
    pub fn parse(token: &str) -> Result<Self> {
        let body = token
            .trim()
            .strip_prefix(TOKEN_PREFIX)
            .ok_or(CoreError::InvalidToken)?;

        let mut parts = body.split(TOKEN_SEPARATOR);
        let (Some(id), Some(secret), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(CoreError::InvalidToken);
        };
        if id.trim().is_empty() || secret.trim().is_empty() {
            return Err(CoreError::InvalidToken);
        }

        Ok(Self {
            invite_id: InviteId::new(id),
            secret: secret.to_string(),
        })
    }

    pub fn invite_id(&self) -> &InviteId {
        &self.invite_id
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl FromStr for InviteToken {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for InviteToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}",
            TOKEN_PREFIX, self.invite_id, TOKEN_SEPARATOR, self.secret
        )
    }
}

impl fmt::Debug for InviteToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InviteToken")
            .field("invite_id", &self.invite_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Pull a token out of user input that is either the token itself or a
/// URL carrying it in the `token` query parameter.
///
/// Input that is neither is returned trimmed, so parsing reports it.
pub fn extract_token(input: &str) -> &str {
    let input = input.trim();
    if input.starts_with(TOKEN_PREFIX) {
        return input;
    }
    let query = match input.split_once('?') {
        Some((_, rest)) => rest.split('#').next().unwrap_or_default(),
        None => return input,
    };
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == TOKEN_QUERY_PARAM)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
        .unwrap_or(input)
}
