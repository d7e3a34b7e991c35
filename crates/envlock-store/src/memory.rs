//! In-memory object store.
//!
//! Same semantics as the persistent backends, nothing survives a drop.
//! Revisions count writes per key, starting at 1.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Result, StoreError};
use crate::traits::{ObjectStore, PutCondition, Revision, StoredObject};

/// In-memory store implementation. Thread-safe via RwLock.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, StoredObject>>> {
        self.objects
            .read()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, StoredObject>>> {
        self.objects
            .write()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>> {
        Ok(self.read()?.get(key).cloned())
    }

    async fn put(&self, key: &str, body: Bytes, condition: PutCondition) -> Result<Revision> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        let mut objects = self.write()?;
        let current = objects.get(key).map(|o| o.revision);
        condition.check(key, current)?;

        let revision = Revision(current.map_or(1, |r| r.0 + 1));
        objects.insert(key.to_string(), StoredObject { body, revision });
        Ok(revision)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .read()?
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = MemoryObjectStore::new();
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_bumps_revision() {
        let store = MemoryObjectStore::new();

        let r1 = store.put("a", Bytes::from_static(b"1"), PutCondition::Overwrite).await.unwrap();
        let r2 = store.put("a", Bytes::from_static(b"2"), PutCondition::Overwrite).await.unwrap();
        assert_eq!(r1, Revision(1));
        assert_eq!(r2, Revision(2));

        let obj = store.get("a").await.unwrap().unwrap();
        assert_eq!(obj.body, Bytes::from_static(b"2"));
        assert_eq!(obj.revision, r2);
    }

    #[tokio::test]
    async fn test_conditional_put() {
        let store = MemoryObjectStore::new();
        let rev = store.put("a", Bytes::from_static(b"1"), PutCondition::IfAbsent).await.unwrap();

        let err = store
            .put("a", Bytes::from_static(b"x"), PutCondition::IfAbsent)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConditionFailed { .. }));

        let stale = Revision(rev.0 + 7);
        assert!(store
            .put("a", Bytes::from_static(b"x"), PutCondition::IfRevision(stale))
            .await
            .is_err());
        store
            .put("a", Bytes::from_static(b"2"), PutCondition::IfRevision(rev))
            .await
            .unwrap();

        let obj = store.get("a").await.unwrap().unwrap();
        assert_eq!(obj.body, Bytes::from_static(b"2"));
    }

    #[tokio::test]
    async fn test_list_by_prefix() {
        let store = MemoryObjectStore::new();
        for key in ["p/x/2.json", "p/x/1.json", "p/y/1.json", "q/x/1.json"] {
            store.put(key, Bytes::new(), PutCondition::Overwrite).await.unwrap();
        }

        let keys = store.list("p/x/").await.unwrap();
        assert_eq!(keys, vec!["p/x/1.json", "p/x/2.json"]);
        assert_eq!(store.list("").await.unwrap().len(), 4);
        assert_eq!(store.len().unwrap(), 4);
    }
}
