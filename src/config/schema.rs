//! Configuration schema for precache
//!
//! Configuration is stored at `~/.config/precache/config.toml`

use crate::cache::{compiled_build_id, AssetManifest, CacheIdentity, DEFAULT_ASSETS, DEFAULT_NAMESPACE};
use crate::error::PrecacheResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Origin the application is served from
    pub origin: OriginConfig,

    /// Cache store settings
    pub cache: CacheConfig,

    /// Module loader settings
    pub loader: LoaderConfig,
}

impl Config {
    /// Cache identity for the running build
    ///
    /// `cache.build_id` overrides the identifier compiled into the binary.
    pub fn identity(&self) -> CacheIdentity {
        if !self.cache.versioned {
            return CacheIdentity::unversioned(&self.cache.namespace);
        }
        let build_id = match self.cache.build_id.as_deref() {
            Some(id) => Some(id),
            None => compiled_build_id(),
        };
        CacheIdentity::versioned(&self.cache.namespace, build_id)
    }

    /// Validated asset manifest
    pub fn manifest(&self) -> PrecacheResult<AssetManifest> {
        AssetManifest::new(self.cache.manifest.iter().cloned())
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Origin settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Absolute URL the manifest paths resolve against
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Prefix shared by every store this application owns
    pub namespace: String,

    /// Name stores after the build identifier (false = one constant store)
    pub versioned: bool,

    /// Build identifier override
    pub build_id: Option<String>,

    /// Store directory (defaults to the user cache dir)
    pub store_dir: Option<PathBuf>,

    /// Assets that must be cached before a version activates
    pub manifest: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            versioned: true,
            build_id: None,
            store_dir: None,
            manifest: DEFAULT_ASSETS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Module loader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Relative path of the binary module
    pub module: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            module: "./app_bg.wasm".to_string(),
        }
    }
}
