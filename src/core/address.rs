//! Logical file addresses.
//!
//! An address names one file inside one published package version:
//!
//! ```text
//! https://registry.npmjs.org/@babel/core@7.1.2/lib/index.js
//! └──────── registry ───────┘└─ name ──┘└ver┘└─ file path ┘
//! ```
//!
//! The registry origin of the address is also the base of the package
//! index URL. Scoped packages are addressed by the registry as
//! `@scope%2Fname`, so the name is percent-encoded as a URI component and
//! the leading `@` is restored afterwards.

use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

use crate::core::error::{Error, Result};

/// Characters left alone by `encodeURIComponent`.
const URI_COMPONENT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// A parsed address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Package name, possibly scoped (`@scope/name`).
    pub name: String,

    /// Version, dist-tag or range. `None` when the address carried no `@`.
    pub version: Option<String>,

    /// Path of the file inside the package, `/`-separated. May be empty.
    pub file_path: String,

    /// URL of the package index document.
    pub index_url: Url,
}

impl Address {
    /// Parse an address string.
    pub fn parse(address: &str) -> Result<Address> {
        if address.is_empty() {
            return Err(Error::bad_request("address is empty"));
        }

        let url = Url::parse(address)
            .map_err(|e| Error::bad_request(format!("invalid address `{}`: {}", address, e)))?;

        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(Error::bad_request(format!(
                "address `{}` has no registry origin",
                address
            )));
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        if segments.len() < 2 {
            return Err(Error::bad_request(format!(
                "address `{}` must name a package and a file",
                address
            )));
        }

        let mut segments = segments.into_iter();
        // Length checked above.
        let first = segments.next().unwrap_or_default();
        let name_with_version = if first.starts_with('@') {
            match segments.next() {
                Some(second) => format!("{}/{}", first, second),
                None => first.to_string(),
            }
        } else {
            first.to_string()
        };

        let (name, version) = split_name_and_version(&name_with_version);
        validate_name(name, address)?;

        let version = version.map(decode);
        let file_path = segments.map(decode).collect::<Vec<_>>().join("/");
        let index_url = index_url(&url, name)?;

        tracing::debug!(
            "Parsed address {}: name={} version={:?} file={}",
            address,
            name,
            version,
            file_path
        );

        Ok(Address {
            name: name.to_string(),
            version,
            file_path,
            index_url,
        })
    }

    /// The specifier as an exact semantic version, if it is one.
    pub fn exact_version(&self) -> Option<semver::Version> {
        self.version
            .as_deref()
            .and_then(|v| semver::Version::parse(v).ok())
    }

    /// Whether the specifier is already an exact version.
    pub fn is_exact(&self) -> bool {
        self.exact_version().is_some()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{}/{}", self.name, version, self.file_path),
            None => write!(f, "{}/{}", self.name, self.file_path),
        }
    }
}

/// Split `name@version`, keeping the scope marker of `@scope/name@version`.
fn split_name_and_version(s: &str) -> (&str, Option<&str>) {
    let (offset, rest) = match s.strip_prefix('@') {
        Some(rest) => (1, rest),
        None => (0, s),
    };

    match rest.split_once('@') {
        Some((name, version)) => {
            let name = &s[..offset + name.len()];
            let version = if version.is_empty() {
                None
            } else {
                Some(version)
            };
            (name, version)
        }
        None => (s, None),
    }
}

fn decode(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

fn validate_name(name: &str, address: &str) -> Result<()> {
    let bare = name.strip_prefix('@').unwrap_or(name);
    let valid = !bare.is_empty()
        && bare
            .split('/')
            .all(|part| !part.is_empty() && part != "." && part != "..");

    if valid {
        Ok(())
    } else {
        Err(Error::bad_request(format!(
            "address `{}` has an invalid package name `{}`",
            address, name
        )))
    }
}

/// Build the registry index URL for `name` on the registry of `address`.
fn index_url(address: &Url, name: &str) -> Result<Url> {
    let encoded = utf8_percent_encode(name, URI_COMPONENT_SET).to_string();
    let encoded = match encoded.strip_prefix("%40") {
        Some(rest) => format!("@{}", rest),
        None => encoded,
    };

    let base = registry_base(address);
    Url::parse(&format!("{}{}", base, encoded))
        .map_err(|e| Error::bad_request(format!("invalid index url for `{}`: {}", name, e)))
}

/// The origin of `url`, with a trailing slash.
pub fn registry_base(url: &Url) -> String {
    let origin = url.origin().ascii_serialization();
    if origin.ends_with('/') {
        origin
    } else {
        format!("{}/", origin)
    }
}
