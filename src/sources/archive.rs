//! Tarball download and extraction.
//!
//! Published packages are gzip-compressed tarballs whose entries all live
//! under one wrapper directory (conventionally `package/`). Extraction
//! strips that first component and writes everything else below the
//! target directory.
//!
//! The body is streamed from the transport through the decompressor and
//! the tar reader, one entry at a time: each entry is fully written before
//! the next header is read, so memory stays bounded by the copy buffer
//! whatever the archive size.

use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result as AnyResult};
use flate2::read::GzDecoder;
use tar::{Archive, EntryType};

use crate::core::error::{Error, Result};
use crate::sources::http::HttpClient;
use crate::sources::store::CacheStore;
use crate::util::cancel::CancelToken;

/// Counts from one extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: usize,
    pub dirs: usize,
    pub bytes: u64,
    pub skipped: usize,
}

/// Downloads tarballs and extracts them into the cache.
#[derive(Clone)]
pub struct ArchiveFetcher {
    store: Arc<dyn CacheStore>,
    http: Arc<dyn HttpClient>,
}

impl ArchiveFetcher {
    pub fn new(store: Arc<dyn CacheStore>, http: Arc<dyn HttpClient>) -> Self {
        ArchiveFetcher { store, http }
    }

    /// Download the tarball at `url` and extract it into `target_dir`.
    ///
    /// On failure the target directory may be partially written; extracting
    /// again over it is safe.
    pub fn fetch_and_extract(
        &self,
        url: &str,
        target_dir: &Path,
        cancel: &CancelToken,
    ) -> Result<ExtractSummary> {
        cancel.check()?;
        tracing::info!("Fetching tarball from {}", url);

        let response = match self.http.get(url, None) {
            Ok(response) => response,
            Err(_) if cancel.is_cancelled() => return Err(Error::Cancelled),
            Err(e) => return Err(Error::Upstream(e)),
        };
        if !response.is_success() {
            return Err(Error::Upstream(anyhow::anyhow!(
                "failed to download tarball from {}: HTTP {}",
                url,
                response.status
            )));
        }

        let body = cancel.reader(response.body);
        match extract_archive(body, target_dir, self.store.as_ref(), cancel)
            .with_context(|| format!("failed to extract tarball from {}", url))
        {
            Ok(summary) => {
                tracing::info!(
                    "Extracted {} file(s) ({} bytes) to {}",
                    summary.files,
                    summary.bytes,
                    target_dir.display()
                );
                Ok(summary)
            }
            Err(_) if cancel.is_cancelled() => Err(Error::Cancelled),
            Err(e) => Err(Error::Upstream(e)),
        }
    }
}

/// Extract a gzip-compressed tarball read from `reader` into `dest`,
/// stripping the first path component of every entry.
///
/// Entries that would land outside `dest` are skipped, as are links and
/// special files.
pub fn extract_archive<R: Read>(
    reader: R,
    dest: &Path,
    store: &dyn CacheStore,
    cancel: &CancelToken,
) -> AnyResult<ExtractSummary> {
    let mut archive = Archive::new(GzDecoder::new(reader));
    let mut summary = ExtractSummary::default();

    store
        .create_dir_all(dest)
        .with_context(|| format!("failed to create destination directory: {}", dest.display()))?;

    for entry in archive
        .entries()
        .context("failed to read tarball entries")?
    {
        cancel.check()?;

        let mut entry = entry.context("failed to read tarball entry")?;
        let entry_path = entry
            .path()
            .context("failed to get entry path")?
            .into_owned();

        let relative = match strip_first_component(&entry_path) {
            Some(Ok(relative)) => relative,
            // The wrapper directory itself.
            None => continue,
            Some(Err(())) => {
                tracing::warn!(
                    "Skipping tarball entry outside the package: {}",
                    entry_path.display()
                );
                summary.skipped += 1;
                continue;
            }
        };
        let output_path = dest.join(&relative);

        let entry_type = entry.header().entry_type();
        match entry_type {
            EntryType::Directory => {
                store.create_dir_all(&output_path).with_context(|| {
                    format!("failed to create directory: {}", output_path.display())
                })?;
                summary.dirs += 1;
            }
            EntryType::Regular | EntryType::Continuous => {
                if let Some(parent) = output_path.parent() {
                    store.create_dir_all(parent).with_context(|| {
                        format!("failed to create directory: {}", parent.display())
                    })?;
                }
                let written = store.write_from(&output_path, &mut entry).with_context(|| {
                    format!("failed to extract file: {}", output_path.display())
                })?;
                summary.files += 1;
                summary.bytes += written;
            }
            _ => {
                tracing::debug!(
                    "Skipping unsupported entry type {:?}: {}",
                    entry_type,
                    entry_path.display()
                );
                summary.skipped += 1;
            }
        }
    }

    Ok(summary)
}

/// Drop the first normal component of `path`.
///
/// Returns `None` when nothing remains, and `Some(Err(()))` when the rest
/// is absolute or climbs with `..`.
fn strip_first_component(path: &Path) -> Option<std::result::Result<PathBuf, ()>> {
    let mut components = path
        .components()
        .skip_while(|c| matches!(c, Component::CurDir));

    match components.next() {
        Some(Component::Normal(_)) => {}
        None => return None,
        Some(_) => return Some(Err(())),
    }

    let mut relative = PathBuf::new();
    for component in components {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Some(Err(()))
            }
        }
    }

    if relative.as_os_str().is_empty() {
        None
    } else {
        Some(Ok(relative))
    }
}
