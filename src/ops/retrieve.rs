//! Buffered retrieval: `download_file`, `read_file`.
//!
//! An exact version whose file is already extracted is served from disk
//! without touching the network. Everything else goes through the package
//! index, version resolution and tarball extraction. Extraction is repeated
//! on that path even when the resolved version is already cached; exact
//! versions are immutable, so re-extraction only rewrites the same bytes.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::core::address::Address;
use crate::core::error::{Error, Result};
use crate::ops::inflight::ExtractionGate;
use crate::resolver::resolve;
use crate::sources::archive::ArchiveFetcher;
use crate::sources::http::{HttpClient, ReqwestClient};
use crate::sources::index_cache::PackageIndexCache;
use crate::sources::layout::CacheLayout;
use crate::sources::store::{CacheStore, FsStore};
use crate::util::cancel::CancelToken;
use crate::util::config::DEFAULT_INDEX_TTL_MS;
use crate::util::context::GlobalContext;

/// Retrieves single files out of published package versions.
///
/// Cheap to clone; clones share the store, transport and in-flight map.
#[derive(Clone)]
pub struct Retriever {
    store: Arc<dyn CacheStore>,
    layout: CacheLayout,
    index: PackageIndexCache,
    fetcher: ArchiveFetcher,
    gate: Arc<ExtractionGate>,
}

impl Retriever {
    /// Create a retriever over `store` and `http` with the default
    /// staleness window.
    pub fn new(store: Arc<dyn CacheStore>, http: Arc<dyn HttpClient>) -> Self {
        Self::with_index_ttl(store, http, Duration::from_millis(DEFAULT_INDEX_TTL_MS))
    }

    /// Create a retriever with an explicit staleness window for package
    /// index documents.
    pub fn with_index_ttl(
        store: Arc<dyn CacheStore>,
        http: Arc<dyn HttpClient>,
        ttl: Duration,
    ) -> Self {
        let layout = CacheLayout::new(store.root());
        let index = PackageIndexCache::new(store.clone(), http.clone(), layout.clone(), ttl);
        let fetcher = ArchiveFetcher::new(store.clone(), http);

        Retriever {
            store,
            layout,
            index,
            fetcher,
            gate: Arc::new(ExtractionGate::new()),
        }
    }

    /// Build the production stack: the on-disk cache under the context's
    /// cache root and an HTTP client configured from `[net]`.
    pub fn from_context(ctx: &GlobalContext) -> anyhow::Result<Self> {
        let config = ctx.config();
        let http = ReqwestClient::new(&config.net).context("failed to create HTTP client")?;
        let store = FsStore::new(ctx.cache_dir());

        Ok(Self::with_index_ttl(
            Arc::new(store),
            Arc::new(http),
            config.cache.index_ttl(),
        ))
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    pub fn index_cache(&self) -> &PackageIndexCache {
        &self.index
    }

    pub(crate) fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Make sure the file named by `address` is extracted in the cache and
    /// return its path.
    pub fn download_file(&self, address: &str) -> Result<PathBuf> {
        self.download_file_with(address, &CancelToken::new())
    }

    /// [`download_file`](Self::download_file) with a cancellation token.
    pub fn download_file_with(&self, address: &str, cancel: &CancelToken) -> Result<PathBuf> {
        let address = parse_request(address)?;

        if let Some(path) = self.cached_exact(&address)? {
            tracing::debug!("Cache hit for {}", address);
            return Ok(path);
        }

        self.fetch_file(&address, cancel)
    }

    /// Read the whole file named by `address`.
    pub fn read_file(&self, address: &str) -> Result<Vec<u8>> {
        self.read_file_with(address, &CancelToken::new())
    }

    /// [`read_file`](Self::read_file) with a cancellation token.
    pub fn read_file_with(&self, address: &str, cancel: &CancelToken) -> Result<Vec<u8>> {
        let path = self.download_file_with(address, cancel)?;
        cancel.check()?;
        self.store.read(&path).map_err(|e| Error::io(&path, e))
    }

    /// Read the file named by `address` as UTF-8 text.
    pub fn read_to_string(&self, address: &str) -> Result<String> {
        let bytes = self.read_file(address)?;
        String::from_utf8(bytes).map_err(|e| {
            Error::Upstream(anyhow::anyhow!("`{}` is not valid UTF-8: {}", address, e))
        })
    }

    /// Path of the file if the address names an exact version that is
    /// already extracted.
    ///
    /// Containment failures are returned as errors. A miss is `Ok(None)`.
    pub(crate) fn cached_exact(&self, address: &Address) -> Result<Option<PathBuf>> {
        let version = match address.exact_version() {
            Some(version) => version.to_string(),
            None => return Ok(None),
        };

        let dir = self.layout.download_dir(&address.name, &version);
        let path = self.layout.resolve_file(&dir, &address.file_path)?;
        Ok(self.is_servable(&path, address).then_some(path))
    }

    /// Path of the file if the cached (possibly stale) index resolves the
    /// specifier to a version that is already extracted. Never touches the
    /// network.
    pub(crate) fn cached_resolved(&self, address: &Address) -> Result<Option<PathBuf>> {
        let index = match self.index.load_cached(&address.name)? {
            Some(index) => index,
            None => return Ok(None),
        };
        let resolved = resolve(&index, &address.name, address.version.as_deref())?;

        let dir = self
            .layout
            .download_dir(&address.name, &resolved.version.to_string());
        let path = self.layout.resolve_file(&dir, &address.file_path)?;
        Ok(self.is_servable(&path, address).then_some(path))
    }

    /// Resolve the version through the package index, extract its tarball
    /// and locate the file.
    pub(crate) fn fetch_file(&self, address: &Address, cancel: &CancelToken) -> Result<PathBuf> {
        let index = self
            .index
            .get(&address.name, address.index_url.as_str(), cancel)?;
        let resolved = resolve(&index, &address.name, address.version.as_deref())?;
        let version = resolved.version.to_string();

        let dir = self.layout.download_dir(&address.name, &version);
        let path = self.layout.resolve_file(&dir, &address.file_path)?;

        let tarball = resolved.tarball();
        if tarball.is_empty() {
            return Err(Error::Upstream(anyhow::anyhow!(
                "{}@{} has no tarball URL",
                address.name,
                version
            )));
        }

        self.gate.run(&address.name, &version, cancel, || {
            self.fetcher
                .fetch_and_extract(tarball, &dir, cancel)
                .map(|_| ())
        })?;

        if self.is_servable(&path, address) {
            Ok(path)
        } else {
            Err(Error::NotFound(format!(
                "`{}` in {}@{}",
                address.file_path, address.name, version
            )))
        }
    }

    /// A file, or the package root when the address names no file.
    fn is_servable(&self, path: &Path, address: &Address) -> bool {
        match self.store.stat(path) {
            Ok(Some(stat)) => stat.is_file() || (address.file_path.is_empty() && stat.is_dir()),
            _ => false,
        }
    }
}

/// Parse an address, requiring a version or dist-tag.
pub(crate) fn parse_request(address: &str) -> Result<Address> {
    if address.is_empty() {
        return Err(Error::bad_request("address is required"));
    }

    let parsed = Address::parse(address)?;
    if parsed.version.is_none() {
        return Err(Error::bad_request(format!(
            "address `{}` names no version or dist-tag",
            address
        )));
    }
    Ok(parsed)
}
