//! Filesystem-backed cache storage
//!
//! Layout under the storage root:
//!
//! ```text
//! <root>/
//!   <store-name>/
//!     index.json        request key -> status, headers, blob hash
//!     blobs/<sha256>    response bodies, content-addressed
//! ```
//!
//! A store becomes visible only once its directory is renamed into place
//! with an index inside it, and a batch commits when the rewritten index is
//! renamed over the old one. A crash mid-batch leaves unreferenced blobs
//! behind but never a half-populated index.
//!
//! Scratch directories (`.staging-*`, `.trash-*`) left by a crash or a
//! failed removal are swept the next time a store is opened.

use super::store::{CacheStorage, StoreSummary};
use crate::error::{PrecacheError, PrecacheResult};
use crate::fetch::{Request, Response};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

const INDEX_FILE: &str = "index.json";
const BLOB_DIR: &str = "blobs";
const STAGING_PREFIX: &str = ".staging-";
const TRASH_PREFIX: &str = ".trash-";

/// Staging directories younger than this may belong to a live opener
const STALE_STAGING_AGE: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreIndex {
    created_at: DateTime<Utc>,
    entries: BTreeMap<String, IndexEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    status: u16,
    headers: Vec<(String, String)>,
    blob: String,
    size: u64,
}

/// Cache storage persisted in a directory
#[derive(Debug, Clone)]
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    /// Create a storage rooted at `root` (created lazily)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Storage root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn store_dir(&self, name: &str) -> PrecacheResult<PathBuf> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\'])
            && name != "..";
        if !valid {
            return Err(PrecacheError::Internal(format!(
                "invalid store name '{}'",
                name
            )));
        }
        Ok(self.root.join(name))
    }

    fn scratch_path(&self, prefix: &str) -> PathBuf {
        self.root.join(format!("{}{}", prefix, Uuid::new_v4()))
    }

    /// Remove leftover trash and abandoned staging directories.
    ///
    /// Best effort: failures are logged and the sweep moves on.
    pub async fn sweep_scratch(&self) -> usize {
        let Ok(mut reader) = fs::read_dir(&self.root).await else {
            return 0;
        };

        let mut removed = 0;
        while let Ok(Some(entry)) = reader.next_entry().await {
            let name = entry.file_name().to_string_lossy().to_string();
            let leftover = if name.starts_with(TRASH_PREFIX) {
                true
            } else if name.starts_with(STAGING_PREFIX) {
                entry
                    .metadata()
                    .await
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .and_then(|t| t.elapsed().ok())
                    .is_some_and(|age| age >= STALE_STAGING_AGE)
            } else {
                false
            };
            if !leftover {
                continue;
            }

            match fs::remove_dir_all(entry.path()).await {
                Ok(()) => {
                    debug!("Swept {}", name);
                    removed += 1;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!("Could not remove leftover {}: {}", name, e),
            }
        }
        removed
    }

    async fn read_index(&self, name: &str) -> PrecacheResult<Option<StoreIndex>> {
        let path = self.store_dir(name)?.join(INDEX_FILE);
        let content = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PrecacheError::io(
                    format!("reading store index {}", path.display()),
                    e,
                ))
            }
        };

        serde_json::from_slice(&content)
            .map(Some)
            .map_err(|e| PrecacheError::StoreCorrupt {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    async fn ensure_root(&self) -> PrecacheResult<()> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            PrecacheError::io(format!("creating storage root {}", self.root.display()), e)
        })
    }
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|m| m.is_file())
}

/// Write a file by renaming a sibling temp file over it
async fn write_atomic(path: &Path, bytes: &[u8]) -> PrecacheResult<()> {
    let tmp = path.with_extension(format!("tmp-{}", Uuid::new_v4()));
    fs::write(&tmp, bytes)
        .await
        .map_err(|e| PrecacheError::io(format!("writing {}", tmp.display()), e))?;
    fs::rename(&tmp, path)
        .await
        .map_err(|e| PrecacheError::io(format!("committing {}", path.display()), e))
}

/// SHA256 of a body as lowercase hex
fn blob_hash(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    hex::encode(hasher.finalize())
}

#[async_trait]
impl CacheStorage for DiskStorage {
    async fn open(&self, name: &str) -> PrecacheResult<()> {
        let dir = self.store_dir(name)?;
        self.sweep_scratch().await;
        if is_file(&dir.join(INDEX_FILE)).await {
            return Ok(());
        }

        self.ensure_root().await?;

        let staging = self.scratch_path(STAGING_PREFIX);
        fs::create_dir_all(staging.join(BLOB_DIR))
            .await
            .map_err(|e| PrecacheError::io(format!("creating {}", staging.display()), e))?;

        let index = StoreIndex {
            created_at: Utc::now(),
            entries: BTreeMap::new(),
        };
        write_atomic(&staging.join(INDEX_FILE), &serde_json::to_vec_pretty(&index)?).await?;

        if let Err(e) = fs::rename(&staging, &dir).await {
            // Lost a race with another opener; their store stands
            let _ = fs::remove_dir_all(&staging).await;
            if !is_file(&dir.join(INDEX_FILE)).await {
                return Err(PrecacheError::io(format!("creating store {}", name), e));
            }
        }

        debug!("Opened store {} at {}", name, dir.display());
        Ok(())
    }

    async fn put_all(&self, name: &str, entries: Vec<(String, Response)>) -> PrecacheResult<()> {
        let dir = self.store_dir(name)?;
        let mut index = self
            .read_index(name)
            .await?
            .ok_or_else(|| PrecacheError::StoreNotFound(name.to_string()))?;

        let blobs = dir.join(BLOB_DIR);
        fs::create_dir_all(&blobs)
            .await
            .map_err(|e| PrecacheError::io(format!("creating {}", blobs.display()), e))?;

        for (key, response) in entries {
            let hash = blob_hash(&response.body);
            let blob_path = blobs.join(&hash);
            if !is_file(&blob_path).await {
                write_atomic(&blob_path, &response.body).await?;
            }

            index.entries.insert(
                key,
                IndexEntry {
                    status: response.status,
                    headers: response.headers,
                    blob: hash,
                    size: response.body.len() as u64,
                },
            );
        }

        write_atomic(&dir.join(INDEX_FILE), &serde_json::to_vec_pretty(&index)?).await?;
        debug!("Committed {} entries to store {}", index.entries.len(), name);
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

        let Some(index) = self.read_index(name).await? else {
            return Ok(None);
        };
        let Some(entry) = index.entries.get(&request.cache_key()) else {
            return Ok(None);
        };

        let blob_path = self.store_dir(name)?.join(BLOB_DIR).join(&entry.blob);
        let body = fs::read(&blob_path)
            .await
            .map_err(|e| PrecacheError::StoreCorrupt {
                name: name.to_string(),
                reason: format!("missing blob {}: {}", entry.blob, e),
            })?;

        Ok(Some(Response {
            status: entry.status,
            headers: entry.headers.clone(),
            body,
        }))
    }

    async fn keys(&self) -> PrecacheResult<Vec<String>> {
        let mut reader = match fs::read_dir(&self.root).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(PrecacheError::io(
                    format!("listing stores in {}", self.root.display()),
                    e,
                ))
            }
        };

        let mut names = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| PrecacheError::io("reading storage root", e))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            if is_file(&entry.path().join(INDEX_FILE)).await {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> PrecacheResult<bool> {
        let dir = self.store_dir(name)?;

        // Move out of the registry first so readers never see a half-removed store
        let trash = self.scratch_path(TRASH_PREFIX);
        match fs::rename(&dir, &trash).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(PrecacheError::io(format!("deleting store {}", name), e)),
        }

        match fs::remove_dir_all(&trash).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(PrecacheError::io(format!("removing {}", trash.display()), e)),
        }

        debug!("Deleted store {}", name);
        Ok(true)
    }

    async fn entry_keys(&self, name: &str) -> PrecacheResult<Option<Vec<String>>> {
        Ok(self
            .read_index(name)
            .await?
            .map(|index| index.entries.into_keys().collect()))
    }

    async fn summary(&self, name: &str) -> PrecacheResult<Option<StoreSummary>> {
        Ok(self.read_index(name).await?.map(|index| StoreSummary {
            name: name.to_string(),
            entries: index.entries.len(),
            size_bytes: index.entries.values().map(|e| e.size).sum(),
            created_at: index.created_at,
        }))
    }

    async fn has(&self, name: &str) -> PrecacheResult<bool> {
        Ok(is_file(&self.store_dir(name)?.join(INDEX_FILE)).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn storage() -> (TempDir, DiskStorage) {
        let dir = TempDir::new().unwrap();
        let storage = DiskStorage::new(dir.path().join("stores"));
        (dir, storage)
    }

    #[tokio::test]
    async fn keys_empty_when_root_missing() {
        let (_dir, storage) = storage();
        assert!(storage.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn open_put_match() {
        let (_dir, storage) = storage();
        storage.open("app-b1").await.unwrap();
        storage
            .put_all(
                "app-b1",
                vec![(
                    "index.html".to_string(),
                    Response::new(200, "<html></html>").with_header("content-type", "text/html"),
                )],
            )
            .await
            .unwrap();

        let hit = storage
            .match_request("app-b1", &Request::get("./index.html"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.body, b"<html></html>");
        assert_eq!(hit.header("Content-Type"), Some("text/html"));

        let miss = storage
            .match_request("app-b1", &Request::get("./other.js"))
            .await
            .unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn store_persists_across_instances() {
        let (dir, storage) = storage();
        storage.open("app-b1").await.unwrap();
        storage
            .put_all("app-b1", vec![("".to_string(), Response::new(200, "root"))])
            .await
            .unwrap();
        drop(storage);

        let reopened = DiskStorage::new(dir.path().join("stores"));
        assert_eq!(reopened.keys().await.unwrap(), vec!["app-b1".to_string()]);
        let hit = reopened
            .match_request("app-b1", &Request::get("./"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.body, b"root");
    }

    #[tokio::test]
    async fn identical_bodies_share_a_blob() {
        let (_dir, storage) = storage();
        storage.open("s").await.unwrap();
        storage
            .put_all(
                "s",
                vec![
                    ("".to_string(), Response::new(200, "same")),
                    ("index.html".to_string(), Response::new(200, "same")),
                ],
            )
            .await
            .unwrap();

        let blobs = storage.root().join("s").join(BLOB_DIR);
        let count = std::fs::read_dir(blobs).unwrap().count();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn delete_removes_from_registry() {
        let (_dir, storage) = storage();
        storage.open("app-b1").await.unwrap();
        storage.open("app-b2").await.unwrap();

        assert!(storage.delete("app-b1").await.unwrap());
        assert!(!storage.delete("app-b1").await.unwrap());
        assert_eq!(storage.keys().await.unwrap(), vec!["app-b2".to_string()]);
    }

    #[tokio::test]
    async fn scratch_dirs_are_not_stores() {
        let (_dir, storage) = storage();
        storage.open("real").await.unwrap();
        std::fs::create_dir_all(storage.root().join(".staging-leftover")).unwrap();
        std::fs::create_dir_all(storage.root().join("no-index")).unwrap();

        assert_eq!(storage.keys().await.unwrap(), vec!["real".to_string()]);
    }

    #[tokio::test]
    async fn open_sweeps_leftover_trash_but_not_fresh_staging() {
        let (_dir, storage) = storage();
        storage.open("real").await.unwrap();
        let trash = storage.root().join(".trash-leftover");
        let staging = storage.root().join(".staging-inflight");
        std::fs::create_dir_all(trash.join(BLOB_DIR)).unwrap();
        std::fs::create_dir_all(&staging).unwrap();

        storage.open("other").await.unwrap();

        assert!(!trash.exists());
        assert!(staging.exists());
        assert_eq!(
            storage.keys().await.unwrap(),
            vec!["other".to_string(), "real".to_string()]
        );
    }

    #[tokio::test]
    async fn rejects_path_like_names() {
        let (_dir, storage) = storage();
        assert!(storage.open("../escape").await.is_err());
        assert!(storage.open(".hidden").await.is_err());
        assert!(storage.open("").await.is_err());
    }

    #[tokio::test]
    async fn corrupt_index_is_reported() {
        let (_dir, storage) = storage();
        storage.open("s").await.unwrap();
        std::fs::write(storage.root().join("s").join(INDEX_FILE), "not json").unwrap();

        let err = storage
            .match_request("s", &Request::get("./"))
            .await
            .unwrap_err();
        assert!(matches!(err, PrecacheError::StoreCorrupt { .. }));
    }

    #[tokio::test]
    async fn summary_reports_sizes() {
        let (_dir, storage) = storage();
        storage.open("s").await.unwrap();
        storage
            .put_all("s", vec![("a".to_string(), Response::new(200, vec![0u8; 10]))])
            .await
            .unwrap();

        let summary = storage.summary("s").await.unwrap().unwrap();
        assert_eq!(summary.entries, 1);
        assert_eq!(summary.size_bytes, 10);
        assert_eq!(
            storage.entry_keys("s").await.unwrap(),
            Some(vec!["a".to_string()])
        );
    }
}
