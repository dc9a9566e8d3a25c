//! Cache identity naming
//!
//! A store name is `{namespace}-{version}`. The version token is either a
//! constant (unversioned deployments share one store forever) or the build
//! identifier of the running binary, so every deployment gets its own store
//! and re-installing the same build reuses it.

use std::fmt;

/// Namespace prefix used when the configuration does not override it
pub const DEFAULT_NAMESPACE: &str = "precache";

/// Version token of the unversioned identity
pub const UNVERSIONED_TOKEN: &str = "v1";

/// Placeholder version used when no build identifier is available
pub const DEV_BUILD_TOKEN: &str = "dev";

/// Build identifier baked in at compile time by `build.rs`, if any
pub fn compiled_build_id() -> Option<&'static str> {
    option_env!("PRECACHE_BUILD_ID")
}

/// The unique name under which one version's asset set is stored
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheIdentity {
    namespace: String,
    version: String,
}

impl CacheIdentity {
    /// Identity that stays constant across all deployments
    pub fn unversioned(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            version: UNVERSIONED_TOKEN.to_string(),
        }
    }

    /// Identity derived from a build identifier
    ///
    /// A missing or blank build id maps to [`DEV_BUILD_TOKEN`].
    pub fn versioned(namespace: &str, build_id: Option<&str>) -> Self {
        let version = build_id
            .map(sanitize_token)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEV_BUILD_TOKEN.to_string());

        Self {
            namespace: namespace.to_string(),
            version,
        }
    }

    /// Namespace prefix shared by every version of this application
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Version token
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Full store name
    pub fn name(&self) -> String {
        format!("{}-{}", self.namespace, self.version)
    }

    /// Whether a store name belongs to this identity's namespace
    pub fn owns(&self, store_name: &str) -> bool {
        store_name
            .strip_prefix(&self.namespace)
            .and_then(|rest| rest.strip_prefix('-'))
            .is_some_and(|version| !version.is_empty())
    }
}

impl fmt::Display for CacheIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.namespace, self.version)
    }
}

/// Keep store names filesystem-safe: whitespace and path separators become `_`
fn sanitize_token(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
