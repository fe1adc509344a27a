//! HTTP transport.
//!
//! Retrieval only ever issues GET requests, so the transport is a single
//! method returning a status and a streaming body.

use std::fmt;
use std::io::Read;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;

use crate::util::config::NetConfig;

/// Accept header for package index requests.
///
/// Prefers the abbreviated install document, which still carries
/// `dist-tags` and every version's `dist.tarball`.
pub const INDEX_ACCEPT: &str =
    "application/vnd.npm.install-v1+json; q=1.0, application/json; q=0.8, */*";

/// A response with a streaming body.
pub struct HttpResponse {
    pub status: u16,
    pub body: Box<dyn Read + Send>,
}

impl HttpResponse {
    /// Check if this is a successful response.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Drain the body into memory.
    pub fn into_bytes(mut self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.body
            .read_to_end(&mut bytes)
            .context("failed to read response body")?;
        Ok(bytes)
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Transport capability.
pub trait HttpClient: Send + Sync {
    /// Issue a GET request. Non-2xx statuses are returned, not raised.
    fn get(&self, url: &str, accept: Option<&str>) -> Result<HttpResponse>;
}

/// [`HttpClient`] backed by `reqwest`'s blocking client.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    /// Create a client configured from `[net]` settings.
    pub fn new(net: &NetConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(net.timeout_secs))
            .connect_timeout(Duration::from_secs(net.connect_timeout_secs))
            .user_agent(net.user_agent())
            .build()
            .context("failed to build HTTP client")?;

        Ok(ReqwestClient { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str, accept: Option<&str>) -> Result<HttpResponse> {
        let mut request = self.client.get(url);
        if let Some(accept) = accept {
            request = request.header(ACCEPT, accept);
        }

        let response = request
            .send()
            .with_context(|| format!("failed to request {}", url))?;

        Ok(HttpResponse {
            status: response.status().as_u16(),
            body: Box::new(response),
        })
    }
}
