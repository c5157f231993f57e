//! Durable record writes.
//!
//! Every journal and history file goes through the same sequence:
//! write to a sibling temp file → `fsync(file)` → `renameat(tmp, final)` → `fsync(dirfd)`.
//! A reader therefore sees either the previous record or the new one, never a torn write.
use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use rustix::fd::OwnedFd;
use rustix::fs::{openat, renameat, unlinkat, AtFlags, Mode, OFlags, CWD};
use rustix::io::Errno;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::constants::TMP_SUFFIX;

pub(crate) fn errno_to_io(e: Errno) -> std::io::Error {
    std::io::Error::from_raw_os_error(e.raw_os_error())
}

// Global counter to produce unique temporary names within a process.
static NEXT_TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

fn cstr(bytes: &[u8]) -> std::io::Result<std::ffi::CString> {
    std::ffi::CString::new(bytes)
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid cstring"))
}

/// Open a directory with `O_DIRECTORY` | `O_NOFOLLOW`.
///
/// # Errors
///
/// Returns an IO error if the directory cannot be opened.
pub fn open_dir_nofollow(dir: &Path) -> std::io::Result<OwnedFd> {
    use std::os::unix::ffi::OsStrExt;
    let c = cstr(dir.as_os_str().as_bytes())?;
    openat(
        CWD,
        c.as_c_str(),
        OFlags::RDONLY | OFlags::DIRECTORY | OFlags::CLOEXEC | OFlags::NOFOLLOW,
        Mode::empty(),
    )
    .map_err(errno_to_io)
}

/// Fsync the parent directory of `path`.
///
/// # Errors
///
/// Returns an IO error if the parent directory cannot be opened or fsynced.
pub fn fsync_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        let dirfd = open_dir_nofollow(parent)?;
        fsync_dirfd(&dirfd)?;
    }
    Ok(())
}

fn fsync_dirfd(dirfd: &OwnedFd) -> std::io::Result<()> {
    rustix::fs::fsync(dirfd).map_err(errno_to_io)
}

/// Serialize `value` as pretty JSON and replace `path` durably.
///
/// With `sync == false` the fsync calls are skipped; the rename stays atomic.
///
/// # Errors
///
/// Returns an IO error when serialization, the temp write, the rename or an fsync fails.
pub fn write_json_durable<T: Serialize>(path: &Path, value: &T, sync: bool) -> std::io::Result<()> {
    use std::os::unix::ffi::OsStrExt;
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let fname = path
        .file_name()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "no file name"))?;
    fs::create_dir_all(parent)?;
    let pid = std::process::id();
    let ctr = NEXT_TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(".{}.{pid}.{ctr}{TMP_SUFFIX}", fname.to_string_lossy());
    let tmp_path = parent.join(&tmp_name);

    {
        let mut f = fs::File::create(&tmp_path)?;
        f.write_all(&bytes)?;
        if sync {
            f.sync_all()?;
        }
    }

    let dirfd = open_dir_nofollow(parent)?;
    let tmp_c = cstr(tmp_name.as_bytes())?;
    let new_c = cstr(fname.as_bytes())?;
    if let Err(e) = renameat(&dirfd, tmp_c.as_c_str(), &dirfd, new_c.as_c_str()) {
        let _ = unlinkat(&dirfd, tmp_c.as_c_str(), AtFlags::empty());
        return Err(errno_to_io(e));
    }
    if sync {
        fsync_dirfd(&dirfd)?;
    }
    Ok(())
}

/// Read a JSON record. `Ok(None)` when the file does not exist.
///
/// # Errors
///
/// IO failures, or `InvalidData` when the content does not parse.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> std::io::Result<Option<T>> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

/// Remove a record and make the removal durable. Missing files are fine.
///
/// # Errors
///
/// Returns an IO error if unlinking or the directory fsync fails.
pub fn remove_durable(path: &Path, sync: bool) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    }
    if sync {
        fsync_parent_dir(path)?;
    }
    Ok(())
}

/// Delete leftover temp files from interrupted writes in `dir`. Returns how many were removed.
pub fn cleanup_stale_tmp(dir: &Path) -> usize {
    let Ok(rd) = fs::read_dir(dir) else {
        return 0;
    };
    let mut removed = 0;
    for entry in rd.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') && name.ends_with(TMP_SUFFIX) && fs::remove_file(entry.path()).is_ok()
        {
            removed += 1;
        }
    }
    removed
}
