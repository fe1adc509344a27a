//! Path utilities.

use std::path::{Component, Path, PathBuf};

/// Normalize a path lexically, without touching the filesystem.
///
/// `.` components are dropped and `..` pops the previous normal component.
/// A `..` that would climb above the root is dropped.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            Component::Normal(part) => out.push(part),
        }
    }

    out
}

/// Check if a path is inside another path.
///
/// Both paths are normalized lexically first.
pub fn is_inside(path: &Path, parent: &Path) -> bool {
    normalize_path(path).starts_with(normalize_path(parent))
}
