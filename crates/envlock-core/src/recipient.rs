//! The recipient registry.
//!
//! The registry is the authoritative list of public keys that future
//! ciphertext is encrypted to. Entries are added explicitly, soft-revoked
//! or hard-deleted; nothing else mutates them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::{version, RECORD_VERSION};

/// Source label for recipients added by hand.
pub const SOURCE_MANUAL: &str = "manual";

/// Source label for the local device added during project bootstrap.
pub const SOURCE_LOCAL_INIT: &str = "local-init";

/// Source label for recipients added by approving an enrollment request.
pub const SOURCE_ENROLL_APPROVE: &str = "enroll-approve";

/// Lifecycle state of a recipient. There is no way back from `Revoked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientStatus {
    #[default]
    Active,
    Revoked,
}

impl RecipientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipientStatus::Active => "active",
            RecipientStatus::Revoked => "revoked",
        }
    }
}

impl fmt::Display for RecipientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered device public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub public_key: String,
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: RecipientStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
}

impl Recipient {
    /// Whether this recipient is a current encryption target.
    pub fn is_active(&self) -> bool {
        self.status == RecipientStatus::Active
    }

    /// Case-insensitive match on name or fingerprint.
    fn matches(&self, query: &str) -> bool {
        fold_eq(&self.name, query) || fold_eq(&self.fingerprint, query)
    }
}

/// Input to [`RecipientRegistry::add`].
///
/// `created_at` and `status` are filled in by the registry when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewRecipient {
    pub name: String,
    pub public_key: String,
    pub fingerprint: String,
    pub created_at: Option<DateTime<Utc>>,
    pub status: Option<RecipientStatus>,
    pub source: String,
    pub note: String,
}

impl NewRecipient {
    /// Describe a recipient by its identity triple.
    pub fn new(
        name: impl Into<String>,
        public_key: impl Into<String>,
        fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            public_key: public_key.into(),
            fingerprint: fingerprint.into(),
            ..Self::default()
        }
    }

    /// Set where this recipient came from.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Attach a free-form note.
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// Pin the creation time instead of using the current time.
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }
}

/// The versioned collection of recipients.
///
/// Append order carries no meaning; listings sort by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientRegistry {
    #[serde(default = "version::current", with = "version")]
    pub version: u32,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
}

impl Default for RecipientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RecipientRegistry {
    /// An empty, version-1 registry.
    pub fn new() -> Self {
        Self {
            version: RECORD_VERSION,
            recipients: Vec::new(),
        }
    }

    /// Add a recipient.
    ///
    /// Name, public key and fingerprint are trimmed. Fails with a validation
    /// error if name or public key is empty, and with a duplicate error if
    /// any entry shares the name (case-insensitively), the public key or the
    /// fingerprint. The registry is untouched on failure.
    pub fn add(&mut self, new: NewRecipient) -> Result<&Recipient> {
        let recipient = Recipient {
            name: new.name.trim().to_string(),
            public_key: new.public_key.trim().to_string(),
            fingerprint: new.fingerprint.trim().to_string(),
            created_at: new.created_at.unwrap_or_else(Utc::now),
            status: new.status.unwrap_or_default(),
            source: new.source,
            note: new.note,
        };

        if recipient.name.is_empty() {
            return Err(CoreError::Validation("recipient name is required".into()));
        }
        if recipient.public_key.is_empty() {
            return Err(CoreError::Validation(
                "recipient public key is required".into(),
            ));
        }

        for existing in &self.recipients {
            if fold_eq(&existing.name, &recipient.name) {
                return Err(CoreError::DuplicateName(recipient.name));
            }
            if existing.public_key == recipient.public_key
                || existing.fingerprint == recipient.fingerprint
            {
                return Err(CoreError::DuplicateKey(recipient.fingerprint));
            }
        }

        self.recipients.push(recipient);
        let idx = self.recipients.len() - 1;
        Ok(&self.recipients[idx])
    }

    /// Soft-revoke the first recipient whose name or fingerprint matches.
    ///
    /// Revoking an already revoked recipient succeeds and changes nothing.
    pub fn revoke(&mut self, query: &str) -> Result<Recipient> {
        let idx = self.position(query)?;
        self.recipients[idx].status = RecipientStatus::Revoked;
        Ok(self.recipients[idx].clone())
    }

    /// Remove the first recipient whose name or fingerprint matches.
    pub fn delete(&mut self, query: &str) -> Result<Recipient> {
        let idx = self.position(query)?;
        Ok(self.recipients.remove(idx))
    }

    /// Look up a recipient by name or fingerprint.
    pub fn find(&self, query: &str) -> Option<&Recipient> {
        let query = query.trim();
        self.recipients.iter().find(|r| r.matches(query))
    }

    /// Number of active recipients.
    pub fn active_count(&self) -> usize {
        self.recipients.iter().filter(|r| r.is_active()).count()
    }

    /// Total number of entries, revoked ones included.
    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }

    /// Recipients sorted by name; revoked entries only when asked for.
    pub fn listing(&self, include_revoked: bool) -> Vec<&Recipient> {
        let mut items: Vec<&Recipient> = self
            .recipients
            .iter()
            .filter(|r| include_revoked || r.is_active())
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        items
    }

    fn position(&self, query: &str) -> Result<usize> {
        let query = query.trim();
        self.recipients
            .iter()
            .position(|r| r.matches(query))
            .ok_or_else(|| CoreError::RecipientNotFound(query.to_string()))
    }
}

fn fold_eq(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
