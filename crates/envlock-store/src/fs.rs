//! Filesystem object store.
//!
//! One file per key under a root directory. Writes go to a temporary file
//! in the target directory and are renamed into place, so a reader sees
//! either the old or the new body. The revision of an object is derived
//! from a SHA-256 digest of its contents.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::traits::{ObjectStore, PutCondition, Revision, StoredObject};

const TEMP_MARKER: &str = ".tmp-";

/// Filesystem-backed store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Use `root` as the store directory. It is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && !key.contains('\\')
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }

    async fn read_existing(path: &Path) -> Result<Option<Bytes>> {
        match fs::read(path).await {
            Ok(body) => Ok(Some(Bytes::from(body))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn content_revision(body: &[u8]) -> Revision {
    let digest = Sha256::digest(body);
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    Revision(u64::from_be_bytes(head))
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>> {
        let path = self.path_for(key)?;
        Ok(Self::read_existing(&path).await?.map(|body| StoredObject {
            revision: content_revision(&body),
            body,
        }))
    }

    async fn put(&self, key: &str, body: Bytes, condition: PutCondition) -> Result<Revision> {
        let path = self.path_for(key)?;

        // The check and the rename below are not atomic across processes.
        if condition != PutCondition::Overwrite {
            let current = Self::read_existing(&path)
                .await?
                .map(|existing| content_revision(&existing));
            condition.check(key, current)?;
        }

        let parent = path
            .parent()
            .ok_or_else(|| StoreError::InvalidKey(key.to_string()))?;
        fs::create_dir_all(parent).await?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StoreError::InvalidKey(key.to_string()))?;
        let temp = parent.join(format!(
            ".{file_name}{TEMP_MARKER}{:016x}",
            rand::random::<u64>()
        ));

        fs::write(&temp, &body).await?;
        if let Err(e) = fs::rename(&temp, &path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }

        debug!(key, bytes = body.len(), "wrote object");
        Ok(content_revision(&body))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut pending = vec![(self.root.clone(), String::new())];

        while let Some((dir, key_prefix)) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                    continue;
                };
                let key = format!("{key_prefix}{name}");
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push((entry.path(), format!("{key}/")));
                } else if file_type.is_file()
                    && !name.contains(TEMP_MARKER)
                    && key.starts_with(prefix)
                {
                    keys.push(key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, FsObjectStore) {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(dir.path().join("store"));
        (dir, store)
    }

    #[tokio::test]
    async fn test_roundtrip_and_missing() {
        let (_dir, store) = store();
        assert!(store.get("a/b.json").await.unwrap().is_none());

        let rev = store
            .put("a/b.json", Bytes::from_static(b"{}"), PutCondition::Overwrite)
            .await
            .unwrap();
        let obj = store.get("a/b.json").await.unwrap().unwrap();
        assert_eq!(obj.body, Bytes::from_static(b"{}"));
        assert_eq!(obj.revision, rev);
        assert!(store.root().join("a/b.json").is_file());
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let (_dir, store) = store();
        for key in ["", "../x", "a/../../x", "/etc/passwd", "a\\b", "./a"] {
            let err = store.get(key).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidKey(_)), "{key}");
        }
    }

    #[tokio::test]
    async fn test_conditional_put_uses_content_revision() {
        let (_dir, store) = store();
        let rev = store
            .put("k.json", Bytes::from_static(b"one"), PutCondition::IfAbsent)
            .await
            .unwrap();

        assert!(store
            .put("k.json", Bytes::from_static(b"two"), PutCondition::IfAbsent)
            .await
            .is_err());

        let rev2 = store
            .put("k.json", Bytes::from_static(b"two"), PutCondition::IfRevision(rev))
            .await
            .unwrap();
        assert_ne!(rev, rev2);

        let err = store
            .put("k.json", Bytes::from_static(b"three"), PutCondition::IfRevision(rev))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConditionFailed { .. }));
    }

    #[tokio::test]
    async fn test_list_walks_subdirectories() {
        let (_dir, store) = store();
        assert!(store.list("").await.unwrap().is_empty());

        for key in ["p/_envlock/enroll/invites/b.json", "p/_envlock/enroll/invites/a.json", "p/_envlock/recipients.json"] {
            store.put(key, Bytes::new(), PutCondition::Overwrite).await.unwrap();
        }
        std::fs::write(
            store.root().join("p/_envlock/enroll/invites/.c.json.tmp-0000000000000000"),
            b"partial",
        )
        .unwrap();

        let keys = store.list("p/_envlock/enroll/invites/").await.unwrap();
        assert_eq!(
            keys,
            vec![
                "p/_envlock/enroll/invites/a.json",
                "p/_envlock/enroll/invites/b.json"
            ]
        );
        assert_eq!(store.list("p/").await.unwrap().len(), 3);
    }
}
