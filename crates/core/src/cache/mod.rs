//! Named, versioned cache stores.
//!
//! This module provides the storage seam used by the orchestrator:
//!
//! - [`CacheStorage`], the async trait over a set of named stores
//! - [`CacheDb`], a persistent SQLite backend (tokio-rusqlite, WAL mode,
//!   schema migrations, cascading store deletion)
//! - [`MemoryStorage`], an in-process backend for tests and ephemeral hosts
//! - request-key normalization and entry size accounting

pub mod connection;
pub mod entries;
pub mod entry;
pub mod key;
pub mod memory;
pub mod migrations;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use entry::{CacheEntry, EntryMeta};
pub use key::{compute_request_key, normalize_url};
pub use memory::MemoryStorage;
pub use storage::CacheStorage;
