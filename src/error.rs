//! Error types for precache
//!
//! All modules use `PrecacheResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for precache operations
pub type PrecacheResult<T> = Result<T, PrecacheError>;

/// All errors that can occur in precache
#[derive(Error, Debug)]
pub enum PrecacheError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid asset manifest: {0}")]
    ManifestInvalid(String),

    #[error("Invalid origin URL '{url}': {reason}")]
    OriginInvalid { url: String, reason: String },

    // Lifecycle errors
    #[error("Provisioning failed for {path}: {reason}")]
    Provision { path: String, reason: String },

    #[error("Invalid lifecycle transition: cannot {action} while {state}")]
    InvalidTransition { action: &'static str, state: String },

    #[error("No installed version to activate")]
    NothingInstalled,

    // Storage errors
    #[error("Cache store not found: {0}")]
    StoreNotFound(String),

    #[error("Cache store {name} is corrupt: {reason}")]
    StoreCorrupt { name: String, reason: String },

    // Network errors
    #[error("Network request for {url} failed: {reason}")]
    Network { url: String, reason: String },

    // Loader errors
    #[error("Module instantiation failed: {0}")]
    Instantiate(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PrecacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a network error for a URL
    pub fn network(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Check if error is retryable
    ///
    /// A failed install may succeed on the next attempt once the origin is
    /// reachable again; lifecycle misuse never will.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provision { .. } | Self::Network { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Provision { .. } => Some("Check origin.base_url and rerun: precache install"),
            Self::NothingInstalled => Some("Run: precache install"),
            Self::StoreNotFound(_) => Some("Run: precache install"),
            Self::StoreCorrupt { .. } => Some("Run: precache clear --yes && precache install"),
            Self::OriginInvalid { .. } => Some("Run: precache config show"),
            _ if self.is_retryable() => Some("The origin may be unreachable; try again later"),
            _ => None,
        }
    }
}
