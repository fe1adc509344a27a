//! Package sources.
//!
//! Everything that touches the outside world lives here: the registry
//! transport, the on-disk store, the cache layout on top of it, the
//! package index cache and tarball extraction.

pub mod archive;
pub mod http;
pub mod index_cache;
pub mod layout;
pub mod store;

pub use archive::{ArchiveFetcher, ExtractSummary};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use index_cache::PackageIndexCache;
pub use layout::CacheLayout;
pub use store::{CacheStore, FsStore};
