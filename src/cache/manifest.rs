//! Static asset manifest
//!
//! The ordered set of request specifiers that must be cached before a
//! version may take over request handling.

use crate::error::{PrecacheError, PrecacheResult};
use crate::fetch::{normalize_path, Request};
use std::collections::HashSet;

/// Shell document, loader script and binary module of the default layout
pub const DEFAULT_ASSETS: &[&str] = &["./", "./index.html", "./app.js", "./app_bg.wasm"];

/// Fixed, ordered list of assets to pre-cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetManifest {
    paths: Vec<String>,
}

impl AssetManifest {
    /// Build a manifest, rejecting empty lists and duplicate entries
    ///
    /// Two specifiers are duplicates when they normalize to the same cache
    /// key (`./index.html` and `/index.html`).
    pub fn new<I, S>(paths: I) -> PrecacheResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let paths: Vec<String> = paths.into_iter().map(Into::into).collect();
        if paths.is_empty() {
            return Err(PrecacheError::ManifestInvalid(
                "manifest must list at least one asset".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for path in &paths {
            if path.contains("://") {
                return Err(PrecacheError::ManifestInvalid(format!(
                    "'{}' is not a relative path",
                    path
                )));
            }
            if !seen.insert(normalize_path(path)) {
                return Err(PrecacheError::ManifestInvalid(format!(
                    "duplicate asset '{}'",
                    path
                )));
            }
        }

        Ok(Self { paths })
    }

    /// Relative specifiers in manifest order
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Normalized cache keys in manifest order
    pub fn cache_keys(&self) -> Vec<String> {
        self.paths.iter().map(|p| normalize_path(p)).collect()
    }

    /// GET requests for every asset
    pub fn requests(&self) -> Vec<Request> {
        self.paths.iter().map(Request::get).collect()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self {
            paths: DEFAULT_ASSETS.iter().map(|s| s.to_string()).collect(),
        }
    }
}
