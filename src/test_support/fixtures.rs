//! Test fixtures for registry documents and package tarballs.

use std::io::Cursor;

use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::json;

/// Registry host used by fixtures.
pub const REGISTRY: &str = "https://registry.example";

/// Tarball URL of `name@version` on the fixture registry.
pub fn tarball_url(name: &str, version: &str) -> String {
    let base = name.rsplit('/').next().unwrap_or(name);
    format!("{}/{}/-/{}-{}.tgz", REGISTRY, name, base, version)
}

/// Index URL of `name` on the fixture registry.
pub fn index_url(name: &str) -> String {
    let encoded = match name.strip_prefix('@') {
        Some(scoped) => format!("@{}", scoped.replace('/', "%2F")),
        None => name.to_string(),
    };
    format!("{}/{}", REGISTRY, encoded)
}

/// Address of `file` inside `name@spec` on the fixture registry.
pub fn address(name: &str, spec: &str, file: &str) -> String {
    format!("{}/{}@{}/{}", REGISTRY, name, spec, file)
}

/// A registry index document listing `versions` and `tags`.
pub fn index_json(name: &str, versions: &[&str], tags: &[(&str, &str)]) -> String {
    let versions: serde_json::Map<String, serde_json::Value> = versions
        .iter()
        .map(|v| {
            (
                v.to_string(),
                json!({
                    "name": name,
                    "version": v,
                    "dist": { "tarball": tarball_url(name, v) }
                }),
            )
        })
        .collect();

    let tags: serde_json::Map<String, serde_json::Value> = tags
        .iter()
        .map(|(tag, v)| (tag.to_string(), json!(v)))
        .collect();

    json!({
        "name": name,
        "dist-tags": tags,
        "versions": versions,
    })
    .to_string()
}

/// A gzip-compressed tarball with every file under a `package/` wrapper
/// directory, the way published packages are laid out.
pub fn package_tarball(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut entries = vec![("package/".to_string(), None)];
    for (path, contents) in files {
        entries.push((format!("package/{}", path), Some(*contents)));
    }
    raw_tarball(
        &entries
            .iter()
            .map(|(p, c)| (p.as_str(), *c))
            .collect::<Vec<_>>(),
    )
}

/// A gzip-compressed tarball with entries exactly as given. `None`
/// contents produce a directory entry.
pub fn raw_tarball(entries: &[(&str, Option<&[u8]>)]) -> Vec<u8> {
    let mut tar_data = Vec::new();
    {
        let encoder = GzEncoder::new(&mut tar_data, Compression::default());
        let mut builder = tar::Builder::new(encoder);

        for (path, contents) in entries {
            let mut header = tar::Header::new_gnu();
            // Written by hand so fixtures can carry `..` and absolute names.
            header.as_old_mut().name[..path.len()].copy_from_slice(path.as_bytes());
            match contents {
                Some(contents) => {
                    header.set_size(contents.len() as u64);
                    header.set_mode(0o644);
                    header.set_entry_type(tar::EntryType::Regular);
                    header.set_cksum();
                    builder.append(&header, Cursor::new(*contents)).unwrap();
                }
                None => {
                    header.set_size(0);
                    header.set_mode(0o755);
                    header.set_entry_type(tar::EntryType::Directory);
                    header.set_cksum();
                    builder.append(&header, std::io::empty()).unwrap();
                }
            }
        }

        builder.into_inner().unwrap().finish().unwrap();
    }
    tar_data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_json_shape() {
        let doc: serde_json::Value =
            serde_json::from_str(&index_json("@s/pkg", &["1.0.0"], &[("latest", "1.0.0")]))
                .unwrap();
        assert_eq!(doc["dist-tags"]["latest"], "1.0.0");
        assert_eq!(
            doc["versions"]["1.0.0"]["dist"]["tarball"],
            "https://registry.example/@s/pkg/-/pkg-1.0.0.tgz"
        );
    }

    #[test]
    fn test_index_url() {
        assert_eq!(index_url("pkg"), "https://registry.example/pkg");
        assert_eq!(index_url("@s/pkg"), "https://registry.example/@s%2Fpkg");
    }
}
