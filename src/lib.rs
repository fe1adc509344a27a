//! npm-readfile - read single files out of published npm packages
//!
//! This crate resolves addresses of the form
//! `https://registry.npmjs.org/<package>@<version-or-tag>/<path>` to the
//! bytes of one file inside that package version. Package index documents
//! and extracted tarballs are kept in a disk cache, so repeated reads of an
//! exact version never touch the network.
//!
//! ```rust,no_run
//! use npm_readfile::{Retriever, StreamOptions};
//!
//! # fn main() -> anyhow::Result<()> {
//! let ctx = npm_readfile::GlobalContext::new()?;
//! let retriever = Retriever::from_context(&ctx)?;
//!
//! let readme = retriever.read_to_string("https://registry.npmjs.org/semver@7.6.0/README.md")?;
//! let stream = retriever.create_read_stream(
//!     "https://registry.npmjs.org/semver@latest/package.json",
//!     StreamOptions::default().prefer_cache(true),
//! )?;
//! # let _ = (readme, stream);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod ops;
pub mod resolver;
pub mod sources;
pub mod util;

/// Test utilities and mocks for unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides an in-memory cache store, a scripted HTTP
/// client and tarball fixtures.
#[cfg(test)]
pub mod test_support;

use std::path::PathBuf;
use std::sync::OnceLock;

pub use crate::core::{Address, Error, ErrorKind, PackageIndex, Result};
pub use ops::{FileStream, Retriever, StreamOptions};
pub use util::cancel::CancelToken;
pub use util::context::GlobalContext;

/// Retriever behind the free functions. Shared so that concurrent calls
/// coalesce their extractions and reuse one HTTP client.
static DEFAULT_RETRIEVER: OnceLock<Retriever> = OnceLock::new();

fn default_retriever() -> Result<&'static Retriever> {
    shared_retriever(&DEFAULT_RETRIEVER, || {
        GlobalContext::new().and_then(|ctx| Retriever::from_context(&ctx))
    })
}

fn shared_retriever<F>(cell: &OnceLock<Retriever>, build: F) -> Result<&Retriever>
where
    F: FnOnce() -> anyhow::Result<Retriever>,
{
    if let Some(retriever) = cell.get() {
        return Ok(retriever);
    }
    let retriever = build().map_err(Error::Upstream)?;
    // A racing caller may have won; everyone uses the stored one.
    Ok(cell.get_or_init(|| retriever))
}

/// [`Retriever::download_file`] on the per-user cache.
pub fn download_file(address: &str) -> Result<PathBuf> {
    default_retriever()?.download_file(address)
}

/// [`Retriever::read_file`] on the per-user cache.
pub fn read_file(address: &str) -> Result<Vec<u8>> {
    default_retriever()?.read_file(address)
}

/// [`Retriever::create_read_stream`] on the per-user cache.
pub fn create_read_stream(address: &str, options: StreamOptions) -> Result<FileStream> {
    default_retriever()?.create_read_stream(address, options)
}
