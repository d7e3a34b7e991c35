//! Typed enrollment metadata on top of an [`ObjectStore`].
//!
//! Key layout under the project prefix:
//!
//! ```text
//! <prefix>/_envlock/recipients.json
//! <prefix>/_envlock/enroll/invites/<id>.json
//! <prefix>/_envlock/enroll/requests/<id>.json
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use envlock_core::{EnrollmentRequest, Invite, InviteId, RecipientRegistry, RequestId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::traits::{MetadataStore, ObjectStore, PutCondition};

const META_DIR: &str = "_envlock";
const RECIPIENTS_FILE: &str = "recipients.json";
const INVITES_DIR: &str = "enroll/invites";
const REQUESTS_DIR: &str = "enroll/requests";
const RECORD_EXT: &str = ".json";

/// The [`MetadataStore`] for one project, backed by any object store.
///
/// All writes use [`PutCondition::Overwrite`].
#[derive(Debug, Clone)]
pub struct ProjectStore<O> {
    objects: O,
    prefix: String,
}

impl<O: ObjectStore> ProjectStore<O> {
    /// Wrap `objects`, namespacing every key under `prefix`.
    pub fn new(objects: O, prefix: impl AsRef<str>) -> Self {
        Self {
            objects,
            prefix: prefix.as_ref().trim().trim_matches('/').to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn objects(&self) -> &O {
        &self.objects
    }

    /// Key of the recipient registry.
    pub fn recipients_key(&self) -> String {
        self.meta_key(RECIPIENTS_FILE)
    }

    /// Key of an invite record.
    pub fn invite_key(&self, id: &InviteId) -> Result<String> {
        self.record_key(INVITES_DIR, id.as_str())
    }

    /// Key of an enrollment request record.
    pub fn request_key(&self, id: &RequestId) -> Result<String> {
        self.record_key(REQUESTS_DIR, id.as_str())
    }

    fn meta_key(&self, rest: &str) -> String {
        if self.prefix.is_empty() {
            format!("{META_DIR}/{rest}")
        } else {
            format!("{}/{META_DIR}/{rest}", self.prefix)
        }
    }

    fn record_key(&self, dir: &str, id: &str) -> Result<String> {
        let id = id.trim();
        if id.is_empty() || id.contains('/') || id.contains('\\') || id.starts_with('.') {
            return Err(StoreError::InvalidKey(id.to_string()));
        }
        Ok(self.meta_key(&format!("{dir}/{id}{RECORD_EXT}")))
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.objects.get(key).await? {
            Some(object) => Ok(Some(serde_json::from_slice(&object.body)?)),
            None => Ok(None),
        }
    }

    async fn write<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()> {
        let mut body = serde_json::to_vec_pretty(value)?;
        body.push(b'\n');
        self.objects
            .put(key, Bytes::from(body), PutCondition::Overwrite)
            .await?;
        debug!(key, "saved record");
        Ok(())
    }

    async fn read_all<T: DeserializeOwned>(&self, dir: &str) -> Result<Vec<T>> {
        let prefix = self.meta_key(&format!("{dir}/"));
        let mut records = Vec::new();
        for key in self.objects.list(&prefix).await? {
            if !key.ends_with(RECORD_EXT) {
                continue;
            }
            // Listed keys can disappear before they are read.
            if let Some(record) = self.read(&key).await? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl<O: ObjectStore> MetadataStore for ProjectStore<O> {
    async fn load_recipients(&self) -> Result<RecipientRegistry> {
        Ok(self
            .read(&self.recipients_key())
            .await?
            .unwrap_or_default())
    }

    async fn write_recipients(&self, registry: &RecipientRegistry) -> Result<()> {
        self.write(&self.recipients_key(), registry).await
    }

    async fn save_invite(&self, invite: &Invite) -> Result<()> {
        self.write(&self.invite_key(&invite.id)?, invite).await
    }

    async fn load_invite(&self, id: &InviteId) -> Result<Invite> {
        self.read(&self.invite_key(id)?)
            .await?
            .ok_or_else(|| StoreError::not_found("invite", id.as_str()))
    }

    async fn list_invites(&self) -> Result<Vec<Invite>> {
        let mut invites = self.read_all(INVITES_DIR).await?;
        Invite::sort_newest_first(&mut invites);
        Ok(invites)
    }

    async fn save_request(&self, request: &EnrollmentRequest) -> Result<()> {
        self.write(&self.request_key(&request.id)?, request).await
    }

    async fn load_request(&self, id: &RequestId) -> Result<EnrollmentRequest> {
        self.read(&self.request_key(id)?)
            .await?
            .ok_or_else(|| StoreError::not_found("request", id.as_str()))
    }

    async fn list_requests(&self) -> Result<Vec<EnrollmentRequest>> {
        let mut requests = self.read_all(REQUESTS_DIR).await?;
        EnrollmentRequest::sort_newest_first(&mut requests);
        Ok(requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryObjectStore;
    use chrono::{Duration, TimeZone, Utc};
    use envlock_core::{DeviceIdentity, ErrorKind, InviteStatus, NewRecipient};
    use rand::rngs::OsRng;

    fn project() -> ProjectStore<MemoryObjectStore> {
        ProjectStore::new(MemoryObjectStore::new(), "/envlock/demo/")
    }

    fn invite_at(minute: u32) -> Invite {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap();
        Invite::issue(Duration::minutes(15), "alice", now, &mut OsRng)
            .unwrap()
            .0
    }

    #[test]
    fn test_key_layout() {
        let store = project();
        assert_eq!(store.prefix(), "envlock/demo");
        assert_eq!(store.recipients_key(), "envlock/demo/_envlock/recipients.json");
        assert_eq!(
            store.invite_key(&InviteId::new("ab12")).unwrap(),
            "envlock/demo/_envlock/enroll/invites/ab12.json"
        );
        assert_eq!(
            store.request_key(&RequestId::new("cd34")).unwrap(),
            "envlock/demo/_envlock/enroll/requests/cd34.json"
        );

        let bare = ProjectStore::new(MemoryObjectStore::new(), "");
        assert_eq!(bare.recipients_key(), "_envlock/recipients.json");
    }

    #[test]
    fn test_rejects_unsafe_ids() {
        let store = project();
        for id in ["", "a/b", "..", ".hidden"] {
            assert!(matches!(
                store.invite_key(&InviteId::new(id)),
                Err(StoreError::InvalidKey(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_missing_registry_is_empty() {
        let store = project();
        let registry = store.load_recipients().await.unwrap();
        assert!(registry.is_empty());
        assert_eq!(registry.version, 1);
    }

    #[tokio::test]
    async fn test_registry_roundtrip_as_pretty_json() {
        let store = project();
        let mut registry = RecipientRegistry::new();
        registry.add(NewRecipient::new("laptop", "age1xyz", "fp")).unwrap();
        store.write_recipients(&registry).await.unwrap();

        assert_eq!(store.load_recipients().await.unwrap(), registry);

        let raw = store.objects().get(&store.recipients_key()).await.unwrap().unwrap();
        let text = std::str::from_utf8(&raw.body).unwrap();
        assert!(text.starts_with("{\n  \"version\": 1,"));
        assert!(text.ends_with("}\n"));
    }

    #[tokio::test]
    async fn test_load_missing_is_not_found() {
        let store = project();

        let err = store.load_invite(&InviteId::new("nope")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "invite nope not found");

        let err = store.load_request(&RequestId::new("nope")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_lists_newest_first() {
        let store = project();
        let (older, newer) = (invite_at(0), invite_at(30));
        store.save_invite(&older).await.unwrap();
        store.save_invite(&newer).await.unwrap();

        let listed = store.list_invites().await.unwrap();
        assert_eq!(listed, vec![newer.clone(), older.clone()]);

        let device = DeviceIdentity::from_public_key("bob", "age1bob");
        let first = EnrollmentRequest::join(&[], &older, &device, older.created_at, &mut OsRng).unwrap();
        let other = DeviceIdentity::from_public_key("carol", "age1carol");
        let second = EnrollmentRequest::join(&[], &newer, &other, newer.created_at, &mut OsRng).unwrap();
        store.save_request(&first).await.unwrap();
        store.save_request(&second).await.unwrap();

        let listed = store.list_requests().await.unwrap();
        assert_eq!(listed, vec![second, first]);
    }

    #[tokio::test]
    async fn test_list_ignores_non_record_keys() {
        let store = project();
        store.save_invite(&invite_at(0)).await.unwrap();
        store
            .objects()
            .put(
                "envlock/demo/_envlock/enroll/invites/README",
                Bytes::from_static(b"not json"),
                PutCondition::Overwrite,
            )
            .await
            .unwrap();

        assert_eq!(store.list_invites().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reads_legacy_invite() {
        let store = project();
        let json = r#"{
            "version": 0,
            "id": "0011223344556677",
            "secret_hash": "abc",
            "status": "",
            "created_at": "2024-05-01T12:00:00Z",
            "expires_at": "2024-05-01T12:15:00Z",
            "used_at": "0001-01-01T00:00:00Z"
        }"#;
        store
            .objects()
            .put(
                "envlock/demo/_envlock/enroll/invites/0011223344556677.json",
                Bytes::from(json),
                PutCondition::Overwrite,
            )
            .await
            .unwrap();

        let invite = store.load_invite(&InviteId::new("0011223344556677")).await.unwrap();
        assert_eq!(invite.version, 1);
        assert_eq!(invite.status, InviteStatus::Legacy);
        assert!(invite.used_at.is_none());
    }

    #[tokio::test]
    async fn test_unknown_status_is_a_store_error() {
        let store = project();
        let json = r#"{"id":"aa","secret_hash":"x","status":"paused","created_at":"2024-05-01T12:00:00Z","expires_at":"2024-05-01T12:15:00Z"}"#;
        store
            .objects()
            .put(
                "envlock/demo/_envlock/enroll/invites/aa.json",
                Bytes::from(json),
                PutCondition::Overwrite,
            )
            .await
            .unwrap();

        let err = store.load_invite(&InviteId::new("aa")).await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
        assert_eq!(err.kind(), ErrorKind::Store);
    }
}
