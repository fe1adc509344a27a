//! Byte store backing the cache.
//!
//! The cache only needs a handful of filesystem operations. They are
//! grouped behind [`CacheStore`] so retrieval can run against the real
//! filesystem or an in-memory store in tests.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// What a path refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// Result of a stat call.
#[derive(Debug, Clone, Copy)]
pub struct FileStat {
    pub kind: EntryKind,
    pub len: u64,
    pub modified: SystemTime,
}

impl FileStat {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// Storage capability for cached index documents and extracted files.
pub trait CacheStore: Send + Sync {
    /// Root directory every cache path lives under.
    fn root(&self) -> &Path;

    /// Stat a path. Returns `Ok(None)` if nothing exists there.
    fn stat(&self, path: &Path) -> io::Result<Option<FileStat>>;

    /// Read a whole file.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Open a file for streaming reads.
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>>;

    /// Write a whole file, replacing any previous content.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Stream `reader` into a file until EOF, replacing any previous
    /// content. Returns the number of bytes written.
    fn write_from(&self, path: &Path, reader: &mut dyn Read) -> io::Result<u64>;

    /// Create a directory and all missing parents.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Whether `path` is an existing regular file.
    fn is_file(&self, path: &Path) -> bool {
        matches!(self.stat(path), Ok(Some(stat)) if stat.is_file())
    }
}

/// [`CacheStore`] on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Create a store rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsStore { root: root.into() }
    }
}

impl CacheStore for FsStore {
    fn root(&self) -> &Path {
        &self.root
    }

    fn stat(&self, path: &Path) -> io::Result<Option<FileStat>> {
        match fs::metadata(path) {
            Ok(meta) => Ok(Some(FileStat {
                kind: if meta.is_dir() {
                    EntryKind::Dir
                } else {
                    EntryKind::File
                },
                len: meta.len(),
                modified: meta.modified()?,
            })),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(fs::File::open(path)?))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn write_from(&self, path: &Path, reader: &mut dyn Read) -> io::Result<u64> {
        let mut file = fs::File::create(path)?;
        io::copy(reader, &mut file)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }
}
