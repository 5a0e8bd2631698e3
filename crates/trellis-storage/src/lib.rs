//! Trellis Storage Library
//!
//! This crate provides the persistence media and the namespaced state database used by
//! Trellis. It includes the StateMedium trait with in-memory and local filesystem
//! implementations, and [`StateDb`], the JSON key-value store built on top of them.
//!
//! # Storage key format
//!
//! Keys are namespace-scoped. All media see the same layout:
//!
//! - `{namespace}:{key}` with the namespace percent-encoded
//!
//! Namespacing is centralized in the `keys` module so that every medium stays consistent
//! and no namespace can observe another one's keys.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-memory")]
pub mod memory;
pub mod state_db;
pub mod traits;

// Re-export commonly used types
pub use factory::{create_medium, open_state_db};
#[cfg(feature = "storage-local")]
pub use local::LocalMedium;
#[cfg(feature = "storage-memory")]
pub use memory::MemoryMedium;
pub use state_db::{StateDb, StateEntry};
pub use traits::{StateMedium, StorageError, StorageResult};
pub use trellis_core::StorageBackend;
