//! # envlock Store
//!
//! Persistence for envlock enrollment metadata.
//!
//! ## Overview
//!
//! The enrollment logic talks to a [`MetadataStore`]: eight whole-record
//! operations over the recipient registry, invites and enrollment requests.
//! [`ProjectStore`] implements it on top of any [`ObjectStore`], a keyed
//! blob contract with an optional write precondition.
//!
//! ## Key Types
//!
//! - [`MetadataStore`] - The async port consumed by the `envlock` facade
//! - [`ObjectStore`] - Keyed blob storage with [`PutCondition`]s
//! - [`ProjectStore`] - JSON records under a project prefix
//! - [`MemoryObjectStore`] - In-memory blobs for tests
//! - [`FsObjectStore`] - One file per key under a directory
//! - [`SqliteObjectStore`] - A SQLite key/value table
//!
//! ## Usage
//!
//! ```rust,no_run
//! use envlock_store::{MetadataStore, ProjectStore, SqliteObjectStore};
//!
//! async fn example() {
//!     let objects = SqliteObjectStore::open(".envlock/metadata.db").unwrap();
//!     let store = ProjectStore::new(objects, "envlock/myapp");
//!     let registry = store.load_recipients().await.unwrap();
//!     println!("{} active recipients", registry.active_count());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Last writer wins**: [`ProjectStore`] writes with [`PutCondition::Overwrite`].
//!   Backends already honor `IfAbsent` / `IfRevision`.
//! - **Absent registry**: loading a never-written registry yields an empty one.
//! - **Ordering**: invite and request listings are newest first.

pub mod error;
pub mod fs;
pub mod memory;
pub mod migration;
pub mod project;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use fs::FsObjectStore;
pub use memory::MemoryObjectStore;
pub use project::ProjectStore;
pub use sqlite::SqliteObjectStore;
pub use traits::{MetadataStore, ObjectStore, PutCondition, Revision, StoredObject};
