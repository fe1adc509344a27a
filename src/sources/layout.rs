//! On-disk cache layout.
//!
//! ```text
//! <root>/index/<package-name>/index.json      # cached package index document
//! <root>/files/<package-name>/<exactVersion>/  # extracted package contents
//! ```
//!
//! Scoped names (`@scope/name`) nest one level deeper. Exact versions are
//! immutable, so an extracted version directory never goes stale.

use std::path::{Path, PathBuf};

use crate::core::error::{Error, Result};
use crate::util::fs::{is_inside, normalize_path};

/// Maps packages and versions to cache paths.
#[derive(Debug, Clone)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        CacheLayout { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the extracted contents of `name@version`.
    pub fn download_dir(&self, name: &str, version: &str) -> PathBuf {
        self.root.join("files").join(name).join(version)
    }

    /// Cached index document of `name`.
    pub fn index_file(&self, name: &str) -> PathBuf {
        self.root.join("index").join(name).join("index.json")
    }

    /// Join `relative` onto `dir`, refusing results outside `dir`.
    pub fn resolve_file(&self, dir: &Path, relative: &str) -> Result<PathBuf> {
        let dir = normalize_path(dir);
        let full = normalize_path(&dir.join(relative));

        if is_inside(&full, &dir) {
            Ok(full)
        } else {
            tracing::warn!(
                "Refusing path {} outside of {}",
                relative,
                dir.display()
            );
            Err(Error::Forbidden {
                path: relative.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    fn layout() -> CacheLayout {
        CacheLayout::new("/cache")
    }

    #[test]
    fn test_paths() {
        let layout = layout();
        assert_eq!(
            layout.download_dir("pkg", "1.0.0"),
            PathBuf::from("/cache/files/pkg/1.0.0")
        );
        assert_eq!(
            layout.download_dir("@scope/pkg", "2.1.0"),
            PathBuf::from("/cache/files/@scope/pkg/2.1.0")
        );
        assert_eq!(
            layout.index_file("@scope/pkg"),
            PathBuf::from("/cache/index/@scope/pkg/index.json")
        );
    }

    #[test]
    fn test_resolve_file_inside() {
        let layout = layout();
        let dir = layout.download_dir("pkg", "1.0.0");

        assert_eq!(
            layout.resolve_file(&dir, "lib/x.js").unwrap(),
            PathBuf::from("/cache/files/pkg/1.0.0/lib/x.js")
        );
        assert_eq!(
            layout.resolve_file(&dir, "lib/../README.md").unwrap(),
            PathBuf::from("/cache/files/pkg/1.0.0/README.md")
        );
        assert_eq!(layout.resolve_file(&dir, "").unwrap(), dir);
    }

    #[test]
    fn test_resolve_file_rejects_traversal() {
        let layout = layout();

        for (name, version) in [("pkg", "1.0.0"), ("@scope/pkg", "2.0.0-rc.1")] {
            let dir = layout.download_dir(name, version);
            for path in [
                "..",
                "../2.0.0/index.js",
                "lib/../../..",
                "../../../../etc/passwd",
                "/etc/passwd",
            ] {
                let err = layout.resolve_file(&dir, path).unwrap_err();
                assert_eq!(err.kind(), ErrorKind::Forbidden, "{} escaped", path);
            }
        }
    }
}
