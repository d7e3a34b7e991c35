//! Store traits: the object contract and the typed metadata port.
//!
//! [`ObjectStore`] is the narrow blob interface every backend implements.
//! [`MetadataStore`] is the port the enrollment logic consumes; it knows
//! about recipients, invites and requests but nothing about keys or bytes.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use envlock_core::{EnrollmentRequest, Invite, InviteId, RecipientRegistry, RequestId};

use crate::error::{Result, StoreError};

/// Opaque version of a stored object.
///
/// Backends choose the scheme; callers only compare revisions for equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Revision(pub u64);

/// An object body together with its current revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Bytes,
    pub revision: Revision,
}

/// Precondition attached to a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PutCondition {
    /// Last writer wins.
    #[default]
    Overwrite,
    /// Only create; fail if the key exists.
    IfAbsent,
    /// Only replace the given revision.
    IfRevision(Revision),
}

impl PutCondition {
    /// Check this condition against the key's current revision.
    pub fn check(&self, key: &str, current: Option<Revision>) -> Result<()> {
        let holds = match (self, current) {
            (PutCondition::Overwrite, _) => true,
            (PutCondition::IfAbsent, current) => current.is_none(),
            (PutCondition::IfRevision(expected), Some(actual)) => *expected == actual,
            (PutCondition::IfRevision(_), None) => false,
        };
        if holds {
            Ok(())
        } else {
            Err(StoreError::ConditionFailed {
                key: key.to_string(),
            })
        }
    }
}

/// Keyed blob storage.
///
/// Keys are `/`-separated paths. A missing key is `Ok(None)`, never an error.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object and its revision.
    async fn get(&self, key: &str) -> Result<Option<StoredObject>>;

    /// Write an object if `condition` holds, returning the new revision.
    async fn put(&self, key: &str, body: Bytes, condition: PutCondition) -> Result<Revision>;

    /// All keys starting with `prefix`, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// The persistence port for enrollment metadata.
///
/// Every entity is stored as a whole record. Writes replace the previous
/// record without any version check.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Recipients
    // ─────────────────────────────────────────────────────────────────────────

    /// Load the registry. A registry that was never written is empty.
    async fn load_recipients(&self) -> Result<RecipientRegistry>;

    /// Replace the registry.
    async fn write_recipients(&self, registry: &RecipientRegistry) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Invites
    // ─────────────────────────────────────────────────────────────────────────

    async fn save_invite(&self, invite: &Invite) -> Result<()>;

    /// Load an invite, failing with `NotFound` if absent.
    async fn load_invite(&self, id: &InviteId) -> Result<Invite>;

    /// All invites, newest first.
    async fn list_invites(&self) -> Result<Vec<Invite>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Enrollment requests
    // ─────────────────────────────────────────────────────────────────────────

    async fn save_request(&self, request: &EnrollmentRequest) -> Result<()>;

    /// Load a request, failing with `NotFound` if absent.
    async fn load_request(&self, id: &RequestId) -> Result<EnrollmentRequest>;

    /// All requests, newest first.
    async fn list_requests(&self) -> Result<Vec<EnrollmentRequest>>;
}

#[async_trait]
impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, body: Bytes, condition: PutCondition) -> Result<Revision> {
        (**self).put(key, body, condition).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        (**self).list(prefix).await
    }
}

#[async_trait]
impl<T: MetadataStore + ?Sized> MetadataStore for Arc<T> {
    async fn load_recipients(&self) -> Result<RecipientRegistry> {
        (**self).load_recipients().await
    }

    async fn write_recipients(&self, registry: &RecipientRegistry) -> Result<()> {
        (**self).write_recipients(registry).await
    }

    async fn save_invite(&self, invite: &Invite) -> Result<()> {
        (**self).save_invite(invite).await
    }

    async fn load_invite(&self, id: &InviteId) -> Result<Invite> {
        (**self).load_invite(id).await
    }

    async fn list_invites(&self) -> Result<Vec<Invite>> {
        (**self).list_invites().await
    }

    async fn save_request(&self, request: &EnrollmentRequest) -> Result<()> {
        (**self).save_request(request).await
    }

    async fn load_request(&self, id: &RequestId) -> Result<EnrollmentRequest> {
        (**self).load_request(id).await
    }

    async fn list_requests(&self) -> Result<Vec<EnrollmentRequest>> {
        (**self).list_requests().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_conditions() {
        let rev = Revision(3);

        assert!(PutCondition::Overwrite.check("k", None).is_ok());
        assert!(PutCondition::Overwrite.check("k", Some(rev)).is_ok());

        assert!(PutCondition::IfAbsent.check("k", None).is_ok());
        assert!(matches!(
            PutCondition::IfAbsent.check("k", Some(rev)),
            Err(StoreError::ConditionFailed { ref key }) if key == "k"
        ));

        assert!(PutCondition::IfRevision(rev).check("k", Some(rev)).is_ok());
        assert!(PutCondition::IfRevision(rev).check("k", Some(Revision(4))).is_err());
        assert!(PutCondition::IfRevision(rev).check("k", None).is_err());
    }
}
