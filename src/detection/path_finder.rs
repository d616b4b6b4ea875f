//! Executable lookup and probe target normalization.

use std::path::{Component, Path, PathBuf};

/// System locations checked when an executable is not on PATH.
const FALLBACK_PATHS: &[&str] = &["/usr/local/bin", "/usr/bin"];

/// Find an executable by bare name.
///
/// PATH is searched first through the `which` crate; after that a few common
/// system and per-user directories that are often missing from PATH in
/// non-interactive shells.
pub(crate) fn find_executable(name: &str) -> Option<PathBuf> {
    if let Ok(path) = which::which(name) {
        return Some(path);
    }

    for dir in FALLBACK_PATHS {
        let path = PathBuf::from(dir).join(name);
        if path.is_file() {
            return Some(path);
        }
    }

    if let Some(home) = std::env::var_os("HOME") {
        let home = PathBuf::from(home);
        for dir in [".local/bin", "bin"] {
            let path = home.join(dir).join(name);
            if path.is_file() {
                return Some(path);
            }
        }
    }

    None
}

/// Resolve `target` against `root` into an absolute, lexically normalized path.
///
/// `.` and `..` components are folded without touching the filesystem, so
/// paths that do not exist normalize the same way as ones that do, and
/// `./yarn.lock`, `yarn.lock` and `sub/../yarn.lock` all map to one path.
/// The result names cache entries only. Folding `..` lexically differs from
/// the OS when a component is a symlink, so checks use the unfolded path.
pub(crate) fn normalize_path(root: &Path, target: &str) -> PathBuf {
    let joined = root.join(target);
    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Never climb above the filesystem root.
                if !matches!(
                    normalized.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                ) {
                    normalized.pop();
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
