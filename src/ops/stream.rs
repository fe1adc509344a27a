//! Streaming retrieval: `create_read_stream`.
//!
//! The stream handle is returned before any I/O happens. A worker thread
//! then decides how to fill it:
//!
//! 1. load the cached package index, if any (no network)
//! 2. with `prefer_cache`, a cached index and a non-exact specifier, resolve
//!    against the cached index (stale or not) and serve the file if it is
//!    already extracted
//! 3. with a cached index and an exact specifier, serve the extracted file
//!    if present and stop
//! 4. otherwise run the network path and serve its result
//!
//! When step 2 served the caller, step 4 still runs to refresh the cache,
//! but its outcome is only logged; [`FileStream::wait_for_refresh`] lets a
//! short-lived caller keep the process alive until it is done. Data and
//! errors reach the stream at most once.

use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::core::address::Address;
use crate::core::error::{Error, Result};
use crate::ops::retrieve::{parse_request, Retriever};
use crate::sources::store::CacheStore;
use crate::util::cancel::{CancelToken, POLL_INTERVAL};

/// Default size of the chunks handed from the worker to the reader.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Chunks buffered between the worker and the reader.
const CHANNEL_DEPTH: usize = 4;

/// Options for [`Retriever::create_read_stream`].
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Serve from the cache when a possibly stale cached index resolves the
    /// specifier to an extracted version.
    pub prefer_cache: bool,

    /// Token aborting the retrieval. A fresh one is created when unset.
    pub cancel: Option<CancelToken>,

    /// Read buffer size. Zero means [`DEFAULT_CHUNK_SIZE`].
    pub chunk_size: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        StreamOptions {
            prefer_cache: false,
            cancel: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl StreamOptions {
    pub fn prefer_cache(mut self, prefer_cache: bool) -> Self {
        self.prefer_cache = prefer_cache;
        self
    }

    pub fn cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

enum Message {
    Data(Vec<u8>),
    Error(Error),
}

/// A file being delivered by a retrieval worker.
///
/// Reads block until the worker has data or the stream is cancelled.
/// Failures arrive as an `io::Error` wrapping the retrieval [`Error`]; end
/// of file is a zero-length read. Dropping the stream stops delivery.
pub struct FileStream {
    rx: Receiver<Message>,
    chunk: Vec<u8>,
    pos: usize,
    finished: bool,
    cancel: CancelToken,
    used_cache: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl FileStream {
    /// Abort the retrieval. The next read fails with a cancellation error
    /// unless end of file was already reached, even when data is still
    /// buffered.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Close the stream and block until its worker is done, including a
    /// cache refresh that runs after the caller was served from the cache.
    pub fn wait_for_refresh(self) {
        let FileStream { rx, worker, .. } = self;
        drop(rx);

        if let Some(worker) = worker {
            if worker.join().is_err() {
                tracing::warn!("Stream worker panicked");
            }
        }
    }

    /// Whether the data came from the cache ahead of a registry refresh.
    ///
    /// Only meaningful once the first byte has been read.
    pub fn served_from_cache(&self) -> bool {
        self.used_cache.load(Ordering::SeqCst)
    }
}

impl Read for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            if self.finished {
                return Ok(0);
            }
            if self.cancel.is_cancelled() {
                self.finished = true;
                self.chunk.clear();
                self.pos = 0;
                return Err(Error::Cancelled.into_io());
            }
            if self.pos < self.chunk.len() {
                let n = buf.len().min(self.chunk.len() - self.pos);
                buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
                self.pos += n;
                return Ok(n);
            }

            match self.rx.recv_timeout(POLL_INTERVAL) {
                Ok(Message::Data(chunk)) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                Ok(Message::Error(err)) => {
                    self.finished = true;
                    return Err(err.into_io());
                }
                Err(RecvTimeoutError::Timeout) => {}
                // Worker closed the stream.
                Err(RecvTimeoutError::Disconnected) => self.finished = true,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SinkState {
    Unset,
    Fulfilled,
    Errored,
}

/// Writing end of a [`FileStream`]. Accepts one outcome.
struct Sink {
    tx: Option<SyncSender<Message>>,
    state: SinkState,
    chunk_size: usize,
    cancel: CancelToken,
}

impl Sink {
    fn is_set(&self) -> bool {
        self.state != SinkState::Unset
    }

    /// Stream the file at `path` into the stream and close it.
    fn serve(&mut self, store: &dyn CacheStore, path: &Path) {
        if self.is_set() {
            return;
        }
        self.state = SinkState::Fulfilled;

        if let Err(err) = self.pump(store, path) {
            self.send(Message::Error(err));
        }
        self.close();
    }

    fn pump(&mut self, store: &dyn CacheStore, path: &Path) -> Result<()> {
        let file = store.open(path).map_err(|e| Error::io(path, e))?;
        let mut reader = self.cancel.reader(file);
        let mut buf = vec![0u8; self.chunk_size];

        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => return Ok(()),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if crate::util::cancel::is_cancellation(&e) => {
                    return Err(Error::Cancelled)
                }
                Err(e) => return Err(Error::io(path, e)),
            };
            if !self.send(Message::Data(buf[..n].to_vec())) {
                tracing::debug!("Stream dropped while serving {}", path.display());
                return Ok(());
            }
        }
    }

    /// Deliver `err` unless the stream already has an outcome.
    fn fail(&mut self, err: Error) {
        if self.is_set() {
            tracing::debug!("Discarding error on settled stream: {}", err);
            return;
        }
        self.state = SinkState::Errored;
        self.send(Message::Error(err));
        self.close();
    }

    /// Returns `false` once the reader is gone.
    fn send(&mut self, message: Message) -> bool {
        match &self.tx {
            Some(tx) => tx.send(message).is_ok(),
            None => false,
        }
    }

    fn close(&mut self) {
        self.tx = None;
    }
}

impl Drop for Sink {
    fn drop(&mut self) {
        // Reached with no outcome only when the worker unwinds.
        if !self.is_set() {
            self.fail(Error::Upstream(anyhow::anyhow!(
                "stream worker stopped without a result"
            )));
        }
    }
}

impl Retriever {
    /// Open a stream over the file named by `address`.
    ///
    /// Only an empty address fails here; every other failure is delivered
    /// through the stream.
    pub fn create_read_stream(&self, address: &str, options: StreamOptions) -> Result<FileStream> {
        if address.is_empty() {
            return Err(Error::bad_request("address is required"));
        }

        let (tx, rx) = mpsc::sync_channel(CHANNEL_DEPTH);
        let cancel = options.cancel.clone().unwrap_or_default();
        let used_cache = Arc::new(AtomicBool::new(false));

        let sink = Sink {
            tx: Some(tx),
            state: SinkState::Unset,
            chunk_size: if options.chunk_size == 0 {
                DEFAULT_CHUNK_SIZE
            } else {
                options.chunk_size
            },
            cancel: cancel.clone(),
        };

        let worker = StreamWorker {
            retriever: self.clone(),
            address: address.to_string(),
            prefer_cache: options.prefer_cache,
            cancel: cancel.clone(),
            used_cache: used_cache.clone(),
        };
        let worker = std::thread::Builder::new()
            .name("npm-readfile-stream".to_string())
            .spawn(move || worker.run(sink))
            .map_err(|e| {
                Error::Upstream(anyhow::Error::new(e).context("failed to spawn stream worker"))
            })?;

        Ok(FileStream {
            rx,
            chunk: Vec::new(),
            pos: 0,
            finished: false,
            cancel,
            used_cache,
            worker: Some(worker),
        })
    }
}

struct StreamWorker {
    retriever: Retriever,
    address: String,
    prefer_cache: bool,
    cancel: CancelToken,
    used_cache: Arc<AtomicBool>,
}

impl StreamWorker {
    fn run(self, mut sink: Sink) {
        let address = match parse_request(&self.address) {
            Ok(address) => address,
            Err(err) => return sink.fail(err),
        };

        let has_cached_index = match self.retriever.index_cache().load_cached(&address.name) {
            Ok(index) => index.is_some(),
            Err(err) => {
                tracing::warn!("Ignoring unreadable cached index for {}: {}", address.name, err);
                false
            }
        };

        if has_cached_index {
            if address.is_exact() {
                match self.retriever.cached_exact(&address) {
                    Ok(Some(path)) => {
                        tracing::debug!("Cache hit for {}", address);
                        return sink.serve(self.retriever.store().as_ref(), &path);
                    }
                    Ok(None) => {}
                    Err(err) => return sink.fail(err),
                }
            } else if self.prefer_cache {
                self.serve_from_cached_index(&address, &mut sink);
            }
        }

        let result = self.retriever.fetch_file(&address, &self.cancel);

        if self.used_cache.load(Ordering::SeqCst) {
            match result {
                Ok(_) => tracing::debug!("Refreshed cache for {}", address),
                Err(err) => tracing::warn!("Background refresh of {} failed: {}", address, err),
            }
            return;
        }

        match result {
            Ok(path) => sink.serve(self.retriever.store().as_ref(), &path),
            Err(err) => sink.fail(err),
        }
    }

    /// Serve from whatever the cached index says, without revalidating it.
    fn serve_from_cached_index(&self, address: &Address, sink: &mut Sink) {
        match self.retriever.cached_resolved(address) {
            Ok(Some(path)) => {
                tracing::debug!("Serving {} from cache ahead of refresh", address);
                self.used_cache.store(true, Ordering::SeqCst);
                sink.serve(self.retriever.store().as_ref(), &path);
            }
            Ok(None) => {}
            Err(err) => {
                tracing::debug!("Cached index cannot serve {}: {}", address, err);
            }
        }
    }
}
