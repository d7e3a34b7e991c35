//! SQLite object store.
//!
//! Objects live in a single key/value table with an integer revision.
//! rusqlite is synchronous, so every call runs on the blocking pool via
//! `tokio::task::spawn_blocking`.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{ObjectStore, PutCondition, Revision, StoredObject};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex.
#[derive(Clone)]
pub struct SqliteObjectStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteObjectStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = lock(&conn)?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("blocking task failed: {e}")))?
    }
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| StoreError::Backend(format!("mutex poisoned: {e}")))
}

fn current_revision(conn: &Connection, key: &str) -> Result<Option<Revision>> {
    let revision: Option<i64> = conn
        .query_row(
            "SELECT revision FROM objects WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(revision.map(|r| Revision(r as u64)))
}

#[async_trait]
impl ObjectStore for SqliteObjectStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>> {
        let key = key.to_string();
        self.blocking(move |conn| {
            let row: Option<(Vec<u8>, i64)> = conn
                .query_row(
                    "SELECT body, revision FROM objects WHERE key = ?1",
                    params![key],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            Ok(row.map(|(body, revision)| StoredObject {
                body: Bytes::from(body),
                revision: Revision(revision as u64),
            }))
        })
        .await
    }

    async fn put(&self, key: &str, body: Bytes, condition: PutCondition) -> Result<Revision> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey(String::new()));
        }
        let key = key.to_string();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let current = current_revision(&tx, &key)?;
            condition.check(&key, current)?;

            let revision = Revision(current.map_or(1, |r| r.0 + 1));
            tx.execute(
                "INSERT INTO objects (key, body, revision, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(key) DO UPDATE SET
                    body = excluded.body,
                    revision = excluded.revision,
                    updated_at = excluded.updated_at",
                params![
                    key,
                    body.as_ref(),
                    revision.0 as i64,
                    Utc::now().timestamp_millis()
                ],
            )?;
            tx.commit()?;

            debug!(key = %key, revision = revision.0, "wrote object");
            Ok(revision)
        })
        .await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = prefix.to_string();
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT key FROM objects WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
            )?;
            let keys = stmt
                .query_map(params![prefix], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(keys)
        })
        .await
    }
}
