//! # envlock Testkit
//!
//! Testing utilities for envlock.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: in-memory project stores, deterministic devices and a fixed clock
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fault injection**: [`FaultyStore`], a store wrapper that fails chosen operations
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use envlock_testkit::generators::RecipientParams;
//!
//! proptest! {
//!     #[test]
//!     fn add_then_find(params: RecipientParams) {
//!         let mut registry = envlock_core::RecipientRegistry::new();
//!         registry.add(params.to_new_recipient()).unwrap();
//!         prop_assert!(registry.find(params.name.trim()).is_some());
//!     }
//! }
//! ```
//!
//! ## Interrupting Writes
//!
//! ```rust
//! use envlock_testkit::{memory_project, FaultyStore, StoreOp};
//!
//! let store = FaultyStore::new(memory_project());
//! store.fail_on(StoreOp::SaveInvite);
//! ```

pub mod faulty;
pub mod fixtures;
pub mod generators;

pub use faulty::{FaultyStore, StoreOp};
pub use fixtures::{device, devices, memory_project, MemoryProject, TestFixture, TEST_PREFIX};
pub use generators::RecipientParams;
