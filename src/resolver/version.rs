//! Version specifier resolution.
//!
//! A specifier is resolved against a package index in this order:
//!
//! 1. a dist-tag name resolves to the tag's target
//! 2. a published exact version resolves to itself
//! 3. anything else is an npm range; the highest satisfying published
//!    version wins (semver ordering, not document order)

use semver::Version;

use crate::core::error::{Error, Result};
use crate::core::package_index::{PackageIndex, VersionRecord};
use crate::resolver::range::VersionRange;

/// How a specifier was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    DistTag(String),
    Exact,
    Range,
}

/// An exact version picked from a package index.
#[derive(Debug, Clone)]
pub struct ResolvedVersion<'a> {
    pub version: Version,
    pub record: &'a VersionRecord,
    pub resolution: Resolution,
}

impl ResolvedVersion<'_> {
    /// Tarball URL of the resolved version.
    pub fn tarball(&self) -> &str {
        &self.record.dist.tarball
    }
}

/// Resolve `specifier` against `index` into one exact version.
pub fn resolve<'a>(
    index: &'a PackageIndex,
    name: &str,
    specifier: Option<&str>,
) -> Result<ResolvedVersion<'a>> {
    let specifier = match specifier.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => {
            return Err(Error::bad_request(format!(
                "a version or dist-tag is required for `{}`",
                name
            )))
        }
    };

    if let Some(target) = index.dist_tag(specifier) {
        let version = Version::parse(target).map_err(|e| {
            Error::Upstream(anyhow::anyhow!(
                "dist-tag `{}` of `{}` points at invalid version `{}`: {}",
                specifier,
                name,
                target,
                e
            ))
        })?;
        let record = index.version(target).ok_or_else(|| Error::VersionNotFound {
            package: name.to_string(),
            version: target.to_string(),
        })?;

        tracing::debug!("Resolved {}@{} via dist-tag to {}", name, specifier, version);
        return Ok(ResolvedVersion {
            version,
            record,
            resolution: Resolution::DistTag(specifier.to_string()),
        });
    }

    if let Ok(version) = Version::parse(specifier) {
        // Exact versions never fall back to range matching.
        let record = index
            .version(specifier)
            .ok_or_else(|| Error::VersionNotFound {
                package: name.to_string(),
                version: specifier.to_string(),
            })?;

        return Ok(ResolvedVersion {
            version,
            record,
            resolution: Resolution::Exact,
        });
    }

    let range = VersionRange::parse(specifier).map_err(|e| {
        tracing::debug!("{}", e);
        Error::VersionNotFound {
            package: name.to_string(),
            version: specifier.to_string(),
        }
    })?;

    let (version, record) = index
        .versions
        .iter()
        .filter_map(|(key, record)| Version::parse(key).ok().map(|v| (v, record)))
        .filter(|(v, _)| range.matches(v))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .ok_or_else(|| Error::NoMatchingVersion {
            package: name.to_string(),
            range: specifier.to_string(),
        })?;

    tracing::debug!("Resolved {}@{} via range to {}", name, specifier, version);
    Ok(ResolvedVersion {
        version,
        record,
        resolution: Resolution::Range,
    })
}
