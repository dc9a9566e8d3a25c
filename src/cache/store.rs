//! Cache storage abstraction
//!
//! A storage backend holds any number of named stores. Each store maps a
//! normalized request key to a captured response. Stores are written in
//! whole batches and removed as a whole; individual entries are never
//! invalidated.

use crate::error::PrecacheResult;
use crate::fetch::{Request, Response};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Format bytes as human-readable size (e.g., "1.5 MB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Summary of one store for listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSummary {
    /// Store name
    pub name: String,
    /// Number of cached entries
    pub entries: usize,
    /// Total body size in bytes
    pub size_bytes: u64,
    /// When the store was first opened
    pub created_at: DateTime<Utc>,
}

/// Origin-scoped registry of named cache stores
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a store, creating an empty one if absent
    async fn open(&self, name: &str) -> PrecacheResult<()>;

    /// Insert a batch of entries into an opened store.
    ///
    /// Either every entry becomes visible or none does.
    async fn put_all(&self, name: &str, entries: Vec<(String, Response)>) -> PrecacheResult<()>;

    /// Point lookup of a request in a store
    ///
    /// Returns `None` when the store or the entry does not exist.
    async fn match_request(&self, name: &str, request: &Request)
        -> PrecacheResult<Option<Response>>;

    /// Names of every store currently present
    async fn keys(&self) -> PrecacheResult<Vec<String>>;

    /// Delete a whole store; returns whether it existed
    async fn delete(&self, name: &str) -> PrecacheResult<bool>;

    /// Cached request keys of one store, `None` if the store is absent
    async fn entry_keys(&self, name: &str) -> PrecacheResult<Option<Vec<String>>>;

    /// Size and age of one store, `None` if the store is absent
    async fn summary(&self, name: &str) -> PrecacheResult<Option<StoreSummary>>;

    /// Whether a store exists
    async fn has(&self, name: &str) -> PrecacheResult<bool> {
        Ok(self.keys().await?.iter().any(|k| k == name))
    }
}
