//! Cache lifecycle controller
//!
//! One controller per deployed version. It provisions its store from the
//! asset manifest, deletes the stores of superseded versions when it
//! activates, and then answers requests cache-first.

use crate::cache::{AssetManifest, CacheIdentity, CacheStorage};
use crate::error::{PrecacheError, PrecacheResult};
use crate::fetch::{Fetcher, Request, Response};
use futures_util::future::join_all;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle state of a controller instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerState {
    /// Constructed, nothing fetched yet
    Uninstalled,
    /// Batch fetch in flight
    Provisioning,
    /// Store fully populated, waiting to take over
    Installed,
    /// Intercepting requests
    Active,
    /// Replaced by a newer version
    Superseded,
    /// Provisioning failed; may be retried
    Redundant,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninstalled => "uninstalled",
            Self::Provisioning => "provisioning",
            Self::Installed => "installed",
            Self::Active => "active",
            Self::Superseded => "superseded",
            Self::Redundant => "redundant",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of a stale-store cleanup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Stores that were removed
    pub deleted: Vec<String>,
    /// Stores that were already gone when deletion ran
    pub missing: Vec<String>,
    /// Stores that could not be removed, with the reason
    pub failed: Vec<(String, String)>,
}

impl ReconcileReport {
    /// Whether every stale store is gone
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Owns the store of one application version
pub struct CacheController {
    identity: CacheIdentity,
    manifest: AssetManifest,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    state: ControllerState,
}

impl CacheController {
    /// Create a controller for `identity`
    pub fn new(
        identity: CacheIdentity,
        manifest: AssetManifest,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            identity,
            manifest,
            storage,
            fetcher,
            state: ControllerState::Uninstalled,
        }
    }

    pub fn identity(&self) -> &CacheIdentity {
        &self.identity
    }

    pub fn manifest(&self) -> &AssetManifest {
        &self.manifest
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    fn require(&self, action: &'static str, allowed: &[ControllerState]) -> PrecacheResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(PrecacheError::InvalidTransition {
                action,
                state: self.state.to_string(),
            })
        }
    }

    /// Populate this version's store with every manifest asset.
    ///
    /// All assets are fetched before the store is even opened; one failed
    /// fetch (transport error or non-2xx status) fails the whole batch and
    /// leaves the controller `Redundant`. After a failure only a store that
    /// was already complete survives, so no partial store is ever kept.
    pub async fn provision(&mut self) -> PrecacheResult<()> {
        self.require(
            "provision",
            &[ControllerState::Uninstalled, ControllerState::Redundant],
        )?;
        self.state = ControllerState::Provisioning;

        let name = self.identity.name();
        info!("Provisioning {} ({} assets)", name, self.manifest.len());

        let complete_before = self.is_complete(&name).await;
        match self.fill_store(&name).await {
            Ok(()) => {
                self.state = ControllerState::Installed;
                info!("Installed {}", name);
                Ok(())
            }
            Err(e) => {
                self.state = ControllerState::Redundant;
                warn!("Provisioning {} failed: {}", name, e);
                if !complete_before {
                    if let Err(cleanup) = self.storage.delete(&name).await {
                        warn!("Could not remove partial store {}: {}", name, cleanup);
                    }
                }
                Err(e)
            }
        }
    }

    async fn fill_store(&self, name: &str) -> PrecacheResult<()> {
        let requests = self.manifest.requests();
        let fetches = requests.iter().map(|req| self.fetcher.fetch(req));
        let results = join_all(fetches).await;

        let mut entries = Vec::with_capacity(requests.len());
        for (request, result) in requests.iter().zip(results) {
            let response = result.map_err(|e| PrecacheError::Provision {
                path: request.path.clone(),
                reason: e.to_string(),
            })?;
            if !response.is_success() {
                return Err(PrecacheError::Provision {
                    path: request.path.clone(),
                    reason: format!("HTTP {}", response.status),
                });
            }
            debug!("Fetched {} ({} bytes)", request.path, response.body.len());
            entries.push((request.cache_key(), response));
        }

        self.storage.open(name).await?;
        self.storage.put_all(name, entries).await
    }

    /// First manifest asset absent from `keys`
    fn missing_asset(&self, keys: &[String]) -> Option<String> {
        self.manifest
            .cache_keys()
            .into_iter()
            .find(|key| !keys.contains(key))
    }

    /// Whether `name` holds every manifest asset
    async fn is_complete(&self, name: &str) -> bool {
        match self.storage.entry_keys(name).await {
            Ok(Some(keys)) => self.missing_asset(&keys).is_none(),
            Ok(None) => false,
            Err(e) => {
                debug!("Treating unreadable store {} as incomplete: {}", name, e);
                false
            }
        }
    }

    /// Take over request handling.
    ///
    /// Runs [`reconcile`](Self::reconcile) first. Cleanup problems are
    /// logged and reported but never block activation.
    pub async fn activate(&mut self) -> PrecacheResult<ReconcileReport> {
        self.require("activate", &[ControllerState::Installed])?;

        let report = match self.reconcile().await {
            Ok(report) => report,
            Err(e) => {
                warn!("Skipping stale store cleanup: {}", e);
                ReconcileReport::default()
            }
        };

        self.state = ControllerState::Active;
        info!("Activated {}", self.identity);
        Ok(report)
    }

    /// Delete every store in this namespace except the current one.
    ///
    /// Deletions run concurrently and are all awaited. Only enumerating the
    /// registry can fail; individual deletion failures land in the report.
    pub async fn reconcile(&self) -> PrecacheResult<ReconcileReport> {
        let current = self.identity.name();
        let stale: Vec<String> = self
            .storage
            .keys()
            .await?
            .into_iter()
            .filter(|name| self.identity.owns(name) && *name != current)
            .collect();

        if stale.is_empty() {
            debug!("No stale stores to remove");
            return Ok(ReconcileReport::default());
        }

        let deletions = stale.iter().map(|name| self.storage.delete(name));
        let results = join_all(deletions).await;

        let mut report = ReconcileReport::default();
        for (name, result) in stale.into_iter().zip(results) {
            match result {
                Ok(true) => {
                    info!("Deleted stale store {}", name);
                    report.deleted.push(name);
                }
                Ok(false) => report.missing.push(name),
                Err(e) => {
                    warn!("Failed to delete stale store {}: {}", name, e);
                    report.failed.push((name, e.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// Re-attach to a store provisioned by an earlier run of this version.
    ///
    /// Succeeds only when every manifest asset is present; the controller
    /// becomes `Active` without fetching or cleaning up.
    pub async fn resume(&mut self) -> PrecacheResult<()> {
        self.require("resume", &[ControllerState::Uninstalled])?;

        let name = self.identity.name();
        let keys = self
            .storage
            .entry_keys(&name)
            .await?
            .ok_or_else(|| PrecacheError::StoreNotFound(name.clone()))?;

        if let Some(missing) = self.missing_asset(&keys) {
            return Err(PrecacheError::StoreCorrupt {
                name,
                reason: format!("asset '{}' was never cached", missing),
            });
        }

        self.state = ControllerState::Active;
        debug!("Resumed {}", name);
        Ok(())
    }

    /// Answer a request from the store, or from the network on a miss.
    ///
    /// Network responses are relayed unchanged and never written back.
    pub async fn intercept(&self, request: &Request) -> PrecacheResult<Response> {
        self.require("intercept", &[ControllerState::Active])?;

        let name = self.identity.name();
        match self.storage.match_request(&name, request).await {
            Ok(Some(response)) => {
                debug!("Cache hit: {} {}", request.method, request.path);
                return Ok(response);
            }
            Ok(None) => debug!("Cache miss: {} {}", request.method, request.path),
            Err(e) => warn!("Cache lookup for {} failed, using network: {}", request.path, e),
        }

        self.fetcher.fetch(request).await
    }

    /// Stop intercepting; a newer version has taken over
    pub fn supersede(&mut self) {
        if self.state != ControllerState::Superseded {
            info!("{} superseded", self.identity);
        }
        self.state = ControllerState::Superseded;
    }
}
