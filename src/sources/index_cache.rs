//! Read-through cache of package index documents.
//!
//! A cached document is served as-is while younger than the staleness
//! window (measured from its last write). Older or missing documents are
//! refetched wholesale and persisted verbatim, overwriting the old copy.

use std::io::Read;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::Context;

use crate::core::error::{Error, Result};
use crate::core::package_index::PackageIndex;
use crate::sources::http::{HttpClient, INDEX_ACCEPT};
use crate::sources::layout::CacheLayout;
use crate::sources::store::CacheStore;
use crate::util::cancel::CancelToken;

/// Cache of package index documents.
#[derive(Clone)]
pub struct PackageIndexCache {
    store: Arc<dyn CacheStore>,
    http: Arc<dyn HttpClient>,
    layout: CacheLayout,
    ttl: Duration,
}

impl PackageIndexCache {
    pub fn new(
        store: Arc<dyn CacheStore>,
        http: Arc<dyn HttpClient>,
        layout: CacheLayout,
        ttl: Duration,
    ) -> Self {
        PackageIndexCache {
            store,
            http,
            layout,
            ttl,
        }
    }

    /// The staleness window.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get the index document of `name`, refetching it from `index_url`
    /// when the cached copy is missing or stale.
    pub fn get(&self, name: &str, index_url: &str, cancel: &CancelToken) -> Result<PackageIndex> {
        if self.is_fresh(name) {
            match self.load_cached(name) {
                Ok(Some(index)) => {
                    tracing::debug!("Using cached index for {}", name);
                    return Ok(index);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Ignoring unreadable cached index for {}: {}", name, e);
                }
            }
        }

        cancel.check()?;
        self.fetch(name, index_url, cancel)
    }

    /// Load the cached document regardless of age. Never touches the
    /// network.
    pub fn load_cached(&self, name: &str) -> Result<Option<PackageIndex>> {
        let path = self.layout.index_file(name);
        if !self.store.is_file(&path) {
            return Ok(None);
        }

        let bytes = self.store.read(&path).map_err(|e| Error::io(&path, e))?;
        let index = PackageIndex::from_slice(&bytes)
            .with_context(|| format!("failed to parse cached index: {}", path.display()))
            .map_err(Error::Upstream)?;

        Ok(Some(index))
    }

    /// Whether a cached document exists and is within the staleness window.
    pub fn is_fresh(&self, name: &str) -> bool {
        let path = self.layout.index_file(name);
        match self.store.stat(&path) {
            Ok(Some(stat)) if stat.is_file() => SystemTime::now()
                .duration_since(stat.modified)
                // Written in the future (clock skew): treat as fresh.
                .map_or(true, |age| age < self.ttl),
            _ => false,
        }
    }

    fn fetch(&self, name: &str, index_url: &str, cancel: &CancelToken) -> Result<PackageIndex> {
        tracing::info!("Fetching package index for {} from {}", name, index_url);

        let response = match self.http.get(index_url, Some(INDEX_ACCEPT)) {
            Ok(response) => response,
            Err(_) if cancel.is_cancelled() => return Err(Error::Cancelled),
            Err(e) => return Err(Error::Upstream(e)),
        };
        let status = response.status;

        let mut bytes = Vec::new();
        let read = cancel.reader(response.body).read_to_end(&mut bytes);
        cancel.check()?;
        read.with_context(|| format!("failed to read index body from {}", index_url))
            .map_err(Error::Upstream)?;

        let parsed = PackageIndex::from_slice(&bytes);

        // The registry reports missing packages as `{"error":"Not found"}`.
        if let Ok(PackageIndex {
            error: Some(message),
            ..
        }) = &parsed
        {
            return Err(Error::NotFound(format!("package `{}`: {}", name, message)));
        }
        if status == 404 {
            return Err(Error::NotFound(format!("package `{}`", name)));
        }
        if !(200..300).contains(&status) {
            return Err(Error::Upstream(anyhow::anyhow!(
                "registry returned HTTP {} for {}",
                status,
                index_url
            )));
        }

        let index = parsed
            .with_context(|| format!("malformed index document from {}", index_url))
            .map_err(Error::Upstream)?;

        self.persist(name, &bytes)?;
        Ok(index)
    }

    fn persist(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.layout.index_file(name);
        if let Some(parent) = path.parent() {
            self.store
                .create_dir_all(parent)
                .map_err(|e| Error::io(parent, e))?;
        }
        self.store.write(&path, bytes).map_err(|e| Error::io(&path, e))?;
        tracing::debug!("Cached index for {} at {}", name, path.display());
        Ok(())
    }
}
