//! Test utilities and mocks.
//!
//! Provides an in-memory [`CacheStore`] and a scripted [`HttpClient`] so
//! retrieval can be tested without touching the network or the disk.
//!
//! # Example
//!
//! ```rust,ignore
//! use npm_readfile::test_support::{MemoryStore, MockHttpClient, MockHttpResponse};
//!
//! let http = MockHttpClient::new();
//! http.mock_url("https://registry.example/pkg", MockHttpResponse::ok("{}"));
//! ```

pub mod fixtures;

use std::collections::{HashMap, HashSet};
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use anyhow::{bail, Result};

use crate::sources::http::{HttpClient, HttpResponse};
use crate::sources::store::{CacheStore, EntryKind, FileStat};

// Re-export fixtures for convenience
pub use fixtures::*;

#[derive(Debug, Clone)]
struct MemoryFile {
    contents: Vec<u8>,
    modified: SystemTime,
}

#[derive(Debug, Default)]
struct MemoryState {
    files: HashMap<PathBuf, MemoryFile>,
    dirs: HashSet<PathBuf>,
    writes: Vec<PathBuf>,
}

/// In-memory [`CacheStore`].
///
/// Writes fail if the parent directory was never created, like a real
/// filesystem.
#[derive(Debug)]
pub struct MemoryStore {
    root: PathBuf,
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        MemoryStore {
            root: root.into(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Add a file, creating its parent directories.
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent).unwrap();
        }
        self.lock().files.insert(
            path.to_path_buf(),
            MemoryFile {
                contents: contents.into(),
                modified: SystemTime::now(),
            },
        );
    }

    /// Move a file's modification time `age` into the past.
    pub fn backdate(&self, path: &Path, age: Duration) {
        let mut state = self.lock();
        let file = state
            .files
            .get_mut(path)
            .unwrap_or_else(|| panic!("file not found: {}", path.display()));
        file.modified = SystemTime::now() - age;
    }

    /// Every path written through the [`CacheStore`] interface, in order.
    pub fn writes(&self) -> Vec<PathBuf> {
        self.lock().writes.clone()
    }

    /// Number of writes to `path`.
    pub fn write_count(&self, path: &Path) -> usize {
        self.lock().writes.iter().filter(|p| *p == path).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap()
    }

    fn check_parent(state: &MemoryState, path: &Path) -> io::Result<()> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !state.dirs.contains(parent) => {
                Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("parent directory does not exist: {}", parent.display()),
                ))
            }
            _ => Ok(()),
        }
    }
}

impl CacheStore for MemoryStore {
    fn root(&self) -> &Path {
        &self.root
    }

    fn stat(&self, path: &Path) -> io::Result<Option<FileStat>> {
        let state = self.lock();
        if let Some(file) = state.files.get(path) {
            return Ok(Some(FileStat {
                kind: EntryKind::File,
                len: file.contents.len() as u64,
                modified: file.modified,
            }));
        }
        if state.dirs.contains(path) {
            return Ok(Some(FileStat {
                kind: EntryKind::Dir,
                len: 0,
                modified: SystemTime::UNIX_EPOCH,
            }));
        }
        Ok(None)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.lock()
            .files
            .get(path)
            .map(|f| f.contents.clone())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("file not found: {}", path.display()),
                )
            })
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.read(path)?)))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut state = self.lock();
        Self::check_parent(&state, path)?;
        state.files.insert(
            path.to_path_buf(),
            MemoryFile {
                contents: contents.to_vec(),
                modified: SystemTime::now(),
            },
        );
        state.writes.push(path.to_path_buf());
        Ok(())
    }

    fn write_from(&self, path: &Path, reader: &mut dyn Read) -> io::Result<u64> {
        Self::check_parent(&self.lock(), path)?;
        let mut contents = Vec::new();
        let len = reader.read_to_end(&mut contents)? as u64;
        self.write(path, &contents)?;
        Ok(len)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        let mut current = Some(path);
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() {
                break;
            }
            state.dirs.insert(dir.to_path_buf());
            current = dir.parent();
        }
        Ok(())
    }
}

/// Mock HTTP response.
#[derive(Debug, Clone)]
pub struct MockHttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl MockHttpResponse {
    /// Create a successful response with the given body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        MockHttpResponse {
            status: 200,
            body: body.into(),
        }
    }

    /// Create a not found response.
    pub fn not_found() -> Self {
        MockHttpResponse {
            status: 404,
            body: b"Not Found".to_vec(),
        }
    }

    /// Create a server error response.
    pub fn server_error(message: &str) -> Self {
        MockHttpResponse {
            status: 500,
            body: message.as_bytes().to_vec(),
        }
    }
}

#[derive(Debug, Clone)]
enum MockReply {
    Response(MockHttpResponse),
    Failure(String),
}

/// Scripted [`HttpClient`] that records every request.
#[derive(Debug, Default)]
pub struct MockHttpClient {
    replies: Mutex<HashMap<String, MockReply>>,
    requests: Mutex<Vec<(String, Option<String>)>>,
    delay: Mutex<Option<Duration>>,
}

impl MockHttpClient {
    /// Create a new mock HTTP client.
    pub fn new() -> Self {
        MockHttpClient::default()
    }

    /// Answer requests for `url` with `response`, replacing any previous
    /// answer.
    pub fn mock_url(&self, url: &str, response: MockHttpResponse) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .insert(url.to_string(), MockReply::Response(response));
        self
    }

    /// Fail requests for `url` at the transport level.
    pub fn mock_failure(&self, url: &str, message: &str) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .insert(url.to_string(), MockReply::Failure(message.to_string()));
        self
    }

    /// Sleep this long before answering each request.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// All requested URLs, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    /// Number of requests made for `url`.
    pub fn request_count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u == url)
            .count()
    }

    /// Accept headers sent with each request for `url`.
    pub fn accept_headers(&self, url: &str) -> Vec<Option<String>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u == url)
            .map(|(_, accept)| accept.clone())
            .collect()
    }
}

impl HttpClient for MockHttpClient {
    fn get(&self, url: &str, accept: Option<&str>) -> Result<HttpResponse> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), accept.map(str::to_string)));

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        let reply = self.replies.lock().unwrap().get(url).cloned();
        match reply {
            Some(MockReply::Response(response)) => Ok(HttpResponse {
                status: response.status,
                body: Box::new(Cursor::new(response.body)),
            }),
            Some(MockReply::Failure(message)) => bail!("connection failed: {}", message),
            None => bail!("no mock response for URL: {}", url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_requires_parent() {
        let store = MemoryStore::new("/cache");
        let file = Path::new("/cache/a/b.txt");

        assert!(store.write(file, b"x").is_err());

        store.create_dir_all(Path::new("/cache/a")).unwrap();
        store.write(file, b"x").unwrap();
        assert!(store.is_file(file));
        assert!(store.stat(Path::new("/cache")).unwrap().unwrap().is_dir());
        assert_eq!(store.write_count(file), 1);
    }

    #[test]
    fn test_memory_store_backdate() {
        let store = MemoryStore::new("/cache");
        let file = Path::new("/cache/index.json");
        store.add_file(file, "{}");

        store.backdate(file, Duration::from_secs(60));
        let modified = store.stat(file).unwrap().unwrap().modified;
        assert!(SystemTime::now().duration_since(modified).unwrap() >= Duration::from_secs(60));
    }

    #[test]
    fn test_mock_http_client() {
        let client = MockHttpClient::new();
        client.mock_url(
            "https://example.com/file.tgz",
            MockHttpResponse::ok(b"tarball content".to_vec()),
        );
        client.mock_failure("https://down.example/", "refused");

        let response = client.get("https://example.com/file.tgz", None).unwrap();
        assert!(response.is_success());
        assert_eq!(response.into_bytes().unwrap(), b"tarball content");

        assert!(client.get("https://down.example/", None).is_err());
        assert!(client.get("https://unknown.example/", None).is_err());
        assert_eq!(client.requests().len(), 3);
        assert_eq!(client.request_count("https://example.com/file.tgz"), 1);
    }
}
