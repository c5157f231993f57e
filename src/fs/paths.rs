//! Path utilities for organized folders.

use std::path::{Component, Path, PathBuf};

use crate::types::errors::{Error, ErrorKind, Result};

/// Validate path to prevent directory traversal.
#[must_use]
pub fn is_safe_path(path: &Path) -> bool {
    !path
        .components()
        .any(|c| matches!(c, Component::ParentDir))
}

/// Whether `path` is a protected system location.
///
/// A path is protected when it equals a protected root, or sits beneath one
/// (other than `/`) without also sitting beneath an allowed prefix.
#[must_use]
pub fn is_protected(path: &Path, protected: &[PathBuf], allowed: &[PathBuf]) -> bool {
    if protected.iter().any(|p| p == path) {
        return true;
    }
    if allowed.iter().any(|a| path.starts_with(a)) {
        return false;
    }
    protected
        .iter()
        .filter(|p| p.parent().is_some())
        .any(|p| path.starts_with(p))
}

/// Canonicalize a folder that is about to be organized or looked up in history.
///
/// # Errors
/// `InvalidPath` for traversal components or a path that does not resolve,
/// `Policy` for protected locations.
pub fn validate_folder(path: &Path, protected: &[PathBuf], allowed: &[PathBuf]) -> Result<PathBuf> {
    if !is_safe_path(path) {
        return Err(Error::new(
            ErrorKind::InvalidPath,
            format!("path traversal not allowed: {}", path.display()),
        ));
    }
    let canonical = std::fs::canonicalize(path).map_err(|e| {
        Error::new(
            ErrorKind::InvalidPath,
            format!("cannot resolve {}: {e}", path.display()),
        )
    })?;
    if is_protected(&canonical, protected, allowed) {
        return Err(Error::new(
            ErrorKind::Policy,
            format!("protected path: {}", canonical.display()),
        ));
    }
    Ok(canonical)
}
