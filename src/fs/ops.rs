//! Mutation primitives for the six operation kinds.
//!
//! `precheck` is pure inspection and runs right before every mutation, so a
//! plan that went stale since review fails with a `PreconditionError` instead
//! of clobbering data. `execute` performs the mutation.
use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::types::errors::PreconditionError;
use crate::types::Operation;

fn exists(p: &Path) -> bool {
    fs::symlink_metadata(p).is_ok()
}

fn require_parent(p: &Path) -> Result<(), PreconditionError> {
    match p.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
            Err(PreconditionError::ParentMissing(parent.to_path_buf()))
        }
        _ => Ok(()),
    }
}

fn require_source(p: &Path) -> Result<(), PreconditionError> {
    match fs::symlink_metadata(p) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(PreconditionError::PermissionDenied(p.to_path_buf()))
        }
        Err(e) if e.raw_os_error() == Some(libc::ELOOP) => {
            Err(PreconditionError::SymlinkLoop(p.to_path_buf()))
        }
        Err(_) => Err(PreconditionError::SourceMissing(p.to_path_buf())),
    }
}

fn require_vacant(p: &Path) -> Result<(), PreconditionError> {
    if exists(p) {
        Err(PreconditionError::DestinationExists(p.to_path_buf()))
    } else {
        Ok(())
    }
}

fn require_no_cycle(source: &Path, destination: &Path) -> Result<(), PreconditionError> {
    if destination.starts_with(source) {
        Err(PreconditionError::Cycle {
            from: source.to_path_buf(),
            destination: destination.to_path_buf(),
        })
    } else {
        Ok(())
    }
}

/// Whether `name` is usable as a single path component.
#[must_use]
pub fn valid_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains('/') && !name.contains('\0')
}

/// Check that `op` can run against the current disk state.
///
/// # Errors
/// The first failed precondition.
pub fn precheck(op: &Operation) -> Result<(), PreconditionError> {
    match op {
        Operation::CreateFolder { path } => match fs::symlink_metadata(path) {
            Ok(md) if md.is_dir() => Ok(()),
            Ok(_) => Err(PreconditionError::DestinationExists(path.clone())),
            Err(_) => Ok(()),
        },
        Operation::Move {
            source,
            destination,
        }
        | Operation::Copy {
            source,
            destination,
        } => {
            require_source(source)?;
            require_no_cycle(source, destination)?;
            require_vacant(destination)?;
            require_parent(destination)
        }
        Operation::Rename { path, new_name } => {
            if !valid_name(new_name) {
                return Err(PreconditionError::InvalidName(new_name.clone()));
            }
            require_source(path)?;
            let target = path
                .parent()
                .map(|p| p.join(new_name))
                .ok_or_else(|| PreconditionError::ParentMissing(path.clone()))?;
            require_vacant(&target)
        }
        Operation::Quarantine {
            path,
            quarantine_path,
        } => {
            require_source(path)?;
            require_vacant(quarantine_path)
        }
        Operation::DeleteFolder { .. } => Ok(()),
    }
}

/// Perform `op`. Callers run `precheck` first.
///
/// # Errors
/// Any IO error from the underlying syscalls.
pub fn execute(op: &Operation) -> std::io::Result<()> {
    match op {
        Operation::CreateFolder { path } => fs::create_dir_all(path),
        Operation::Move {
            source,
            destination,
        } => move_entry(source, destination),
        Operation::Rename { path, new_name } => {
            let parent = path.parent().unwrap_or_else(|| Path::new("."));
            fs::rename(path, parent.join(new_name))
        }
        Operation::Quarantine {
            path,
            quarantine_path,
        } => {
            if let Some(parent) = quarantine_path.parent() {
                fs::create_dir_all(parent)?;
            }
            move_entry(path, quarantine_path)
        }
        Operation::Copy {
            source,
            destination,
        } => copy_entry(source, destination),
        Operation::DeleteFolder { path } => remove_entry(path),
    }
}

/// Rename, falling back to copy-then-delete across filesystems.
///
/// # Errors
/// IO errors from rename, copy or removal.
pub fn move_entry(source: &Path, destination: &Path) -> std::io::Result<()> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(libc::EXDEV) => {
            log::debug!(
                "cross-device move {} -> {}, copying",
                source.display(),
                destination.display()
            );
            copy_entry(source, destination)?;
            remove_entry(source)
        }
        Err(e) => Err(e),
    }
}

/// Copy a file or a whole directory tree. Symlinks are recreated, not followed.
///
/// # Errors
/// IO errors from directory creation or file copies.
pub fn copy_entry(source: &Path, destination: &Path) -> std::io::Result<()> {
    let md = fs::symlink_metadata(source)?;
    if !md.is_dir() {
        return copy_leaf(source, destination, &md);
    }
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(std::io::Error::other)?;
        let rel = entry
            .path()
            .strip_prefix(source)
            .map_err(std::io::Error::other)?;
        let target = destination.join(rel);
        let emd = entry.path().symlink_metadata()?;
        if emd.is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            copy_leaf(entry.path(), &target, &emd)?;
        }
    }
    Ok(())
}

fn copy_leaf(source: &Path, destination: &Path, md: &fs::Metadata) -> std::io::Result<()> {
    if md.file_type().is_symlink() {
        let link = fs::read_link(source)?;
        std::os::unix::fs::symlink(link, destination)
    } else {
        fs::copy(source, destination).map(|_| ())
    }
}

/// Remove a file or directory tree. A path that is already gone counts as removed.
///
/// # Errors
/// IO errors other than `NotFound`.
pub fn remove_entry(path: &Path) -> std::io::Result<()> {
    let md = match fs::symlink_metadata(path) {
        Ok(md) => md,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if md.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}
