//! HTTP fetcher backed by ureq
//!
//! ureq is blocking, so every request runs on tokio's blocking pool.

use super::{normalize_path, Fetcher, Request, Response};
use crate::error::{PrecacheError, PrecacheResult};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Fetches relative specifiers from a single origin
#[derive(Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpFetcher {
    /// Create a fetcher rooted at `base_url`
    ///
    /// The base must be an absolute http(s) URL. A trailing slash is added
    /// when missing so relative specifiers resolve beneath it.
    pub fn new(base_url: &str, timeout_secs: u64) -> PrecacheResult<Self> {
        let base_url = normalize_base_url(base_url)?;

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();

        Ok(Self { agent, base_url })
    }

    /// Origin root all requests resolve against
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve a relative specifier to an absolute URL
    pub fn resolve(&self, path: &str) -> String {
        format!("{}{}", self.base_url, normalize_path(path))
    }
}

fn normalize_base_url(raw: &str) -> PrecacheResult<String> {
    let raw = raw.trim();
    let has_scheme = raw.starts_with("http://") || raw.starts_with("https://");
    let host_part = raw.split_once("://").map(|(_, rest)| rest).unwrap_or("");

    if !has_scheme || host_part.is_empty() || host_part.starts_with('/') {
        return Err(PrecacheError::OriginInvalid {
            url: raw.to_string(),
            reason: "expected an absolute http:// or https:// URL".to_string(),
        });
    }

    if raw.ends_with('/') {
        Ok(raw.to_string())
    } else {
        Ok(format!("{}/", raw))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> PrecacheResult<Response> {
        let url = self.resolve(&request.path);
        let method = request.method.clone();
        let agent = self.agent.clone();

        debug!("{} {}", method, url);

        tokio::task::spawn_blocking(move || blocking_fetch(&agent, &method, &url))
            .await
            .map_err(|e| PrecacheError::Internal(format!("fetch task panicked: {}", e)))?
    }
}

fn blocking_fetch(agent: &ureq::Agent, method: &str, url: &str) -> PrecacheResult<Response> {
    let http_request = ureq::http::Request::builder()
        .method(method)
        .uri(url)
        .body(())
        .map_err(|e| PrecacheError::network(url, e.to_string()))?;

    let mut http_response = agent
        .run(http_request)
        .map_err(|e| PrecacheError::network(url, e.to_string()))?;

    let status = http_response.status().as_u16();
    let headers = http_response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let body = http_response
        .body_mut()
        .with_config()
        .limit(u64::MAX)
        .read_to_vec()
        .map_err(|e| PrecacheError::network(url, e.to_string()))?;

    debug!("{} -> {} ({} bytes)", url, status, body.len());

    Ok(Response {
        status,
        headers,
        body,
    })
}
