//! Lexical path helpers shared by the journal, validation and scope checks.
use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path: drop `.` and trailing separators, fold `..`
/// against preceding normal components. No filesystem access.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for seg in path.components() {
        match seg {
            Component::CurDir => {}
            Component::ParentDir => {
                let last_is_normal =
                    matches!(out.components().next_back(), Some(Component::Normal(_)));
                if last_is_normal {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Whether one normalized path equals or contains the other.
#[must_use]
pub fn overlaps(a: &Path, b: &Path) -> bool {
    let a = normalize(a);
    let b = normalize(b);
    a.starts_with(&b) || b.starts_with(&a)
}
