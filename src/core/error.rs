//! Retrieval error types.

use std::io;

use thiserror::Error;

/// Coarse classification of a retrieval failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The address was malformed or lacked a version specifier.
    BadRequest,
    /// The package, dist-tag or exact version does not exist.
    NotFound,
    /// The requested path escapes the package's cache directory.
    Forbidden,
    /// Transport, decompression or filesystem failure while fetching.
    Upstream,
    /// A version range matched no published version.
    VersionResolution,
    /// The caller cancelled the request.
    Cancelled,
}

/// Error returned by every public retrieval operation.
#[derive(Debug, Error)]
pub enum Error {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("version doesn't exist: `{package}@{version}`")]
    VersionNotFound { package: String, version: String },

    #[error("version doesn't exist: no version of `{package}` satisfies `{range}`")]
    NoMatchingVersion { package: String, range: String },

    #[error("forbidden: `{path}` escapes the package directory")]
    Forbidden { path: String },

    #[error("upstream failure: {0:#}")]
    Upstream(#[source] anyhow::Error),

    #[error("request cancelled")]
    Cancelled,

    #[error("failed to read `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BadRequest(_) => ErrorKind::BadRequest,
            Error::NotFound(_) | Error::VersionNotFound { .. } => ErrorKind::NotFound,
            Error::NoMatchingVersion { .. } => ErrorKind::VersionResolution,
            Error::Forbidden { .. } => ErrorKind::Forbidden,
            Error::Upstream(_) | Error::Io { .. } => ErrorKind::Upstream,
            Error::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// HTTP-style status code for this error.
    pub fn status(&self) -> u16 {
        match self.kind() {
            ErrorKind::BadRequest => 400,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound | ErrorKind::VersionResolution => 404,
            ErrorKind::Cancelled => 499,
            ErrorKind::Upstream => 502,
        }
    }

    /// Whether this error means "nothing by that name or version".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NotFound | ErrorKind::VersionResolution
        )
    }

    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Error::BadRequest(message.into())
    }

    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: io::Error) -> Self {
        Error::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Convert into an `io::Error` for delivery through a byte stream.
    ///
    /// The original error stays reachable through `io::Error::get_ref`.
    pub fn into_io(self) -> io::Error {
        let kind = match self.kind() {
            ErrorKind::BadRequest => io::ErrorKind::InvalidInput,
            ErrorKind::NotFound | ErrorKind::VersionResolution => io::ErrorKind::NotFound,
            ErrorKind::Forbidden => io::ErrorKind::PermissionDenied,
            ErrorKind::Cancelled | ErrorKind::Upstream => io::ErrorKind::Other,
        };
        io::Error::new(kind, self)
    }
}

/// Result alias used across the public API.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_and_status() {
        assert_eq!(Error::bad_request("x").status(), 400);
        assert_eq!(Error::NotFound("pkg".into()).kind(), ErrorKind::NotFound);

        let missing = Error::VersionNotFound {
            package: "pkg".into(),
            version: "9.9.9".into(),
        };
        assert_eq!(missing.kind(), ErrorKind::NotFound);
        assert!(missing.to_string().contains("version doesn't exist"));

        let range = Error::NoMatchingVersion {
            package: "pkg".into(),
            range: "^9".into(),
        };
        assert_eq!(range.kind(), ErrorKind::VersionResolution);
        assert!(range.is_not_found());
        assert_eq!(range.status(), 404);

        let forbidden = Error::Forbidden {
            path: "../etc".into(),
        };
        assert_eq!(forbidden.status(), 403);
        assert_eq!(Error::Cancelled.status(), 499);
    }

    #[test]
    fn test_into_io_keeps_source() {
        let err = Error::Forbidden {
            path: "../x".into(),
        }
        .into_io();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);

        let inner = err
            .get_ref()
            .and_then(|e| e.downcast_ref::<Error>())
            .unwrap();
        assert_eq!(inner.kind(), ErrorKind::Forbidden);
    }
}
