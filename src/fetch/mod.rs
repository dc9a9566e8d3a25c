//! Request/response model and the network fetch seam
//!
//! The controller never talks to the network directly; it goes through a
//! [`Fetcher`] so tests can substitute a scripted origin.

mod http;

pub use http::HttpFetcher;

use crate::error::PrecacheResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An outgoing request descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// HTTP method (upper case)
    pub method: String,
    /// Relative request specifier, e.g. `./index.html`
    pub path: String,
}

impl Request {
    /// Create a GET request for a relative path
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            path: path.into(),
        }
    }

    /// Create a request with an explicit method
    pub fn new(method: &str, path: impl Into<String>) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            path: path.into(),
        }
    }

    /// Only GET requests are ever answered from a cache store
    pub fn is_cacheable(&self) -> bool {
        self.method == "GET"
    }

    /// Normalized cache key for this request's path
    pub fn cache_key(&self) -> String {
        normalize_path(&self.path)
    }
}

/// Normalize a relative specifier so `./a`, `/a` and `a` share one key.
///
/// The document root (`./`, `/`, empty) normalizes to the empty string.
pub fn normalize_path(path: &str) -> String {
    let mut rest = path.trim();
    loop {
        if let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix('/') {
            rest = stripped;
        } else {
            break;
        }
    }
    if rest == "." {
        rest = "";
    }
    rest.to_string()
}

/// A captured response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response headers in arrival order
    pub headers: Vec<(String, String)>,
    /// Response body
    #[serde(skip)]
    pub body: Vec<u8>,
}

impl Response {
    /// Create a response with no headers
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Attach a header
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Network access used on cache misses and during provisioning
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform the request against the network.
    ///
    /// HTTP error statuses are returned as responses; only transport
    /// failures are errors.
    async fn fetch(&self, request: &Request) -> PrecacheResult<Response>;
}
