//! Package index documents.
//!
//! The registry serves one JSON document per package listing every
//! published version, its tarball, and the dist-tags pointing into it.
//! Only the fields needed for retrieval are modelled; the raw document is
//! cached verbatim.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A package's full registry record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageIndex {
    /// Package name as reported by the registry.
    #[serde(default)]
    pub name: Option<String>,

    /// Dist-tag name to exact version.
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: BTreeMap<String, String>,

    /// Exact version to version record.
    #[serde(default)]
    pub versions: BTreeMap<String, VersionRecord>,

    /// Error message reported in place of a document (e.g. `"Not found"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One published version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRecord {
    #[serde(default)]
    pub version: Option<String>,

    pub dist: Dist,
}

/// Distribution info of a version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dist {
    /// Tarball URL.
    pub tarball: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shasum: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
}

impl PackageIndex {
    /// Parse a document from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Target of a dist-tag.
    pub fn dist_tag(&self, tag: &str) -> Option<&str> {
        self.dist_tags.get(tag).map(String::as_str)
    }

    /// Record of an exact version.
    pub fn version(&self, version: &str) -> Option<&VersionRecord> {
        self.versions.get(version)
    }

    /// All published versions that are valid semantic versions.
    pub fn semver_versions(&self) -> impl Iterator<Item = semver::Version> + '_ {
        self.versions
            .keys()
            .filter_map(|v| semver::Version::parse(v).ok())
    }
}
