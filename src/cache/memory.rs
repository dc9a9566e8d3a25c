//! In-memory cache storage
//!
//! Lives for the lifetime of the process. Used for ephemeral hosts and as
//! the storage double in tests.

use super::store::{CacheStorage, StoreSummary};
use crate::error::{PrecacheError, PrecacheResult};
use crate::fetch::{Request, Response};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct MemoryStore {
    created_at: DateTime<Utc>,
    entries: BTreeMap<String, Response>,
}

/// Cache storage held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStorage {
    stores: RwLock<BTreeMap<String, MemoryStore>>,
}

impl MemoryStorage {
    /// Create an empty storage
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> PrecacheResult<()> {
        let mut stores = self.stores.write().await;
        stores.entry(name.to_string()).or_insert_with(|| MemoryStore {
            created_at: Utc::now(),
            entries: BTreeMap::new(),
        });
        Ok(())
    }

    async fn put_all(&self, name: &str, entries: Vec<(String, Response)>) -> PrecacheResult<()> {
        let mut stores = self.stores.write().await;
        let store = stores
            .get_mut(name)
            .ok_or_else(|| PrecacheError::StoreNotFound(name.to_string()))?;
        store.entries.extend(entries);
        Ok(())
    }

    async fn match_request(
        &self,
        name: &str,
        request: &Request,
    ) -> PrecacheResult<Option<Response>> {
        if !request.is_cacheable() {
            return Ok(None);
        }
        let stores = self.stores.read().await;
        Ok(stores
            .get(name)
            .and_then(|s| s.entries.get(&request.cache_key()))
            .cloned())
    }

    async fn keys(&self) -> PrecacheResult<Vec<String>> {
        Ok(self.stores.read().await.keys().cloned().collect())
    }

    async fn delete(&self, name: &str) -> PrecacheResult<bool> {
        Ok(self.stores.write().await.remove(name).is_some())
    }

    async fn entry_keys(&self, name: &str) -> PrecacheResult<Option<Vec<String>>> {
        let stores = self.stores.read().await;
        Ok(stores.get(name).map(|s| s.entries.keys().cloned().collect()))
    }

    async fn summary(&self, name: &str) -> PrecacheResult<Option<StoreSummary>> {
        let stores = self.stores.read().await;
        Ok(stores.get(name).map(|s| StoreSummary {
            name: name.to_string(),
            entries: s.entries.len(),
            size_bytes: s.entries.values().map(|r| r.body.len() as u64).sum(),
            created_at: s.created_at,
        }))
    }

    async fn has(&self, name: &str) -> PrecacheResult<bool> {
        Ok(self.stores.read().await.contains_key(name))
    }
}
