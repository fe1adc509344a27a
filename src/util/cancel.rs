//! Cooperative cancellation.

use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::core::error::{Error, Result};

/// How often blocked waiters look at their token.
pub const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A shared flag that aborts in-progress retrievals.
///
/// Clones observe the same flag. Cancellation is checked at every I/O step
/// and between archive entries. A transport call already waiting on the
/// network is not interrupted, but callers parked on a stream or on another
/// request's extraction stop waiting within [`POLL_INTERVAL`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        CancelToken::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail with [`Error::Cancelled`] if cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Wrap a reader so reads fail once cancellation is requested.
    pub fn reader<R: Read>(&self, inner: R) -> CancelReader<R> {
        CancelReader {
            inner,
            token: self.clone(),
        }
    }
}

/// Reader that fails with a wrapped [`Error::Cancelled`] after cancellation.
///
/// `ErrorKind::Interrupted` is avoided because `Read` adapters retry it.
pub struct CancelReader<R> {
    inner: R,
    token: CancelToken,
}

impl<R: Read> Read for CancelReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.token.is_cancelled() {
            return Err(io::Error::other(Error::Cancelled));
        }
        self.inner.read(buf)
    }
}

/// Whether an I/O error was produced by a [`CancelReader`].
pub fn is_cancellation(err: &io::Error) -> bool {
    err.get_ref()
        .and_then(|e| e.downcast_ref::<Error>())
        .is_some_and(|e| matches!(e, Error::Cancelled))
}
