//! In-process cache storage.
//!
//! Holds every store in a `Vec` guarded by a tokio `RwLock` so store
//! enumeration keeps creation order. Nothing survives the process.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use super::entry::{CacheEntry, EntryMeta};
use super::storage::CacheStorage;
use crate::Error;

type Store = HashMap<String, CacheEntry>;

#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    stores: Arc<RwLock<Vec<(String, Store)>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in a store, zero if it does not exist.
    pub async fn len(&self, name: &str) -> usize {
        let stores = self.stores.read().await;
        stores
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s.len())
            .unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> Result<(), Error> {
        let mut stores = self.stores.write().await;
        if !stores.iter().any(|(n, _)| n == name) {
            tracing::debug!(cache = name, created_at = %Utc::now(), "created cache store");
            stores.push((name.to_string(), Store::new()));
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        let stores = self.stores.read().await;
        Ok(stores.iter().map(|(n, _)| n.clone()).collect())
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let mut stores = self.stores.write().await;
        let before = stores.len();
        stores.retain(|(n, _)| n != name);
        Ok(stores.len() != before)
    }

    async fn get(&self, name: &str, key: &str) -> Result<Option<CacheEntry>, Error> {
        let stores = self.stores.read().await;
        Ok(stores
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, s)| s.get(key).cloned()))
    }

    async fn put(&self, name: &str, entry: &CacheEntry) -> Result<(), Error> {
        let mut stores = self.stores.write().await;
        match stores.iter_mut().find(|(n, _)| n == name) {
            Some((_, store)) => {
                store.insert(entry.key.clone(), entry.clone());
            }
            None => {
                let mut store = Store::new();
                store.insert(entry.key.clone(), entry.clone());
                stores.push((name.to_string(), store));
            }
        }
        Ok(())
    }

    async fn remove(&self, name: &str, key: &str) -> Result<bool, Error> {
        let mut stores = self.stores.write().await;
        Ok(stores
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s.remove(key).is_some())
            .unwrap_or(false))
    }

    async fn list(&self, name: &str) -> Result<Vec<EntryMeta>, Error> {
        let stores = self.stores.read().await;
        Ok(stores
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s.values().map(CacheEntry::meta).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Request, Response};
    use url::Url;

    fn entry(path: &str) -> CacheEntry {
        let url = Url::parse("https://example.com").unwrap().join(path).unwrap();
        CacheEntry::new(&Request::get(url), Response::new(200).with_body("body"))
    }

    #[tokio::test]
    async fn test_open_is_idempotent_and_ordered() {
        let storage = MemoryStorage::new();
        storage.open("v1").await.unwrap();
        storage.open("v2").await.unwrap();
        storage.open("v1").await.unwrap();
        assert_eq!(storage.keys().await.unwrap(), vec!["v1", "v2"]);
    }

    #[tokio::test]
    async fn test_put_get_overwrite() {
        let storage = MemoryStorage::new();
        let first = entry("/a.css");
        storage.put("v1", &first).await.unwrap();

        let mut second = entry("/a.css");
        second.response = Response::new(200).with_body("new");
        storage.put("v1", &second).await.unwrap();

        let got = storage.get("v1", &first.key).await.unwrap().unwrap();
        assert_eq!(got.response.text(), "new");
        assert_eq!(storage.len("v1").await, 1);
    }

    #[tokio::test]
    async fn test_delete_drops_entries() {
        let storage = MemoryStorage::new();
        let e = entry("/a.css");
        storage.put("v1", &e).await.unwrap();
        assert!(storage.delete("v1").await.unwrap());
        assert!(!storage.delete("v1").await.unwrap());
        assert!(storage.get("v1", &e.key).await.unwrap().is_none());
        assert!(storage.list("v1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_single_entry() {
        let storage = MemoryStorage::new();
        let a = entry("/a.css");
        let b = entry("/b.css");
        storage.put("v1", &a).await.unwrap();
        storage.put("v1", &b).await.unwrap();
        assert!(storage.remove("v1", &a.key).await.unwrap());
        assert!(!storage.remove("v1", &a.key).await.unwrap());
        let listed = storage.list("v1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, b.key);
    }
}
