//! Storage abstraction over named cache stores.

use super::entry::{CacheEntry, EntryMeta};
use crate::Error;

/// A set of named cache stores, each mapping request keys to entries.
///
/// Implementations must allow concurrent reads and independent per-key writes;
/// a `put` to an existing key replaces the previous entry. Writing into a store
/// that does not exist creates it.
#[async_trait::async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the named store if it does not exist yet.
    async fn open(&self, name: &str) -> Result<(), Error>;

    /// Names of every existing store, in creation order.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a store and all its entries. Returns false if it did not exist.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    async fn get(&self, name: &str, key: &str) -> Result<Option<CacheEntry>, Error>;

    async fn put(&self, name: &str, entry: &CacheEntry) -> Result<(), Error>;

    /// Remove one entry. Returns false if it was not present.
    async fn remove(&self, name: &str, key: &str) -> Result<bool, Error>;

    /// Metadata for every entry in a store; empty if the store does not exist.
    async fn list(&self, name: &str) -> Result<Vec<EntryMeta>, Error>;
}
