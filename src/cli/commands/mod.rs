//! CLI command implementations

pub mod clear;
pub mod config;
pub mod fetch;
pub mod identity;
pub mod install;
pub mod list;
pub mod load;

pub use clear::execute as clear;
pub use config::execute as config;
pub use fetch::execute as fetch;
pub use identity::execute as identity;
pub use install::execute as install;
pub use list::execute as list;
pub use load::execute as load;

use crate::cache::{CacheStorage, DiskStorage};
use crate::config::{Config, ConfigManager};
use crate::controller::CacheController;
use crate::error::{PrecacheError, PrecacheResult};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::host::LifecycleHost;
use std::sync::Arc;
use tracing::{debug, warn};

/// Disk storage at the configured store directory
pub(crate) fn storage(config: &Config) -> Arc<dyn CacheStorage> {
    let dir = ConfigManager::store_dir(config);
    debug!("Using store directory {}", dir.display());
    Arc::new(DiskStorage::new(dir))
}

/// HTTP access to the configured origin
pub(crate) fn network(config: &Config) -> PrecacheResult<Arc<dyn Fetcher>> {
    Ok(Arc::new(HttpFetcher::new(
        &config.origin.base_url,
        config.origin.timeout_secs,
    )?))
}

/// Controller for the running build
pub(crate) fn controller(
    config: &Config,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Fetcher>,
) -> PrecacheResult<CacheController> {
    Ok(CacheController::new(
        config.identity(),
        config.manifest()?,
        storage,
        network,
    ))
}

/// Host with this build's store attached, or a pass-through host if the
/// build was never fully installed
pub(crate) async fn attached_host(config: &Config) -> PrecacheResult<LifecycleHost> {
    let network = network(config)?;
    let mut host = LifecycleHost::new(network.clone());
    let controller = controller(config, storage(config), network)?;
    let identity = controller.identity().clone();

    match host.resume(controller).await {
        Ok(()) => debug!("Serving from {}", identity),
        Err(PrecacheError::StoreNotFound(_)) => {
            warn!("{} is not installed, requests go to the network", identity)
        }
        Err(e @ PrecacheError::StoreCorrupt { .. }) => {
            warn!("{}; requests go to the network until reinstalled", e)
        }
        Err(e) => return Err(e),
    }

    Ok(host)
}
