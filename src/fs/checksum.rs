//! Checksum and integrity layer.
//!
//! - `checksum(path)`: streamed SHA-256 for files, identity digest for directories.
//! - `compare(expected, path)`: `unchanged | modified | missing`.
//!
//! Directory identity is `dev:ino`, so a directory keeps its checksum across
//! renames within one filesystem and changes when it is recreated.
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::os::unix::fs::MetadataExt as _;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::constants::CHECKSUM_BUF_SIZE;
use crate::types::errors::{Error, ErrorKind, Result};
use crate::types::{ChecksumStatus, FileChecksum};

fn hash_reader<R: Read>(r: R) -> std::io::Result<String> {
    let mut reader = BufReader::with_capacity(CHECKSUM_BUF_SIZE, r);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHECKSUM_BUF_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn dir_identity(md: &fs::Metadata) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("dir:{}:{}", md.dev(), md.ino()).as_bytes());
    hex::encode(hasher.finalize())
}

/// Fingerprint `path`.
///
/// # Errors
/// `NotFound` when the path vanished, `Io` for any other read failure.
pub fn checksum(path: &Path) -> Result<FileChecksum> {
    let md = fs::metadata(path).map_err(|e| with_path(e, path))?;
    let mtime = md.mtime();
    if md.is_dir() {
        return Ok(FileChecksum {
            sha256: dir_identity(&md),
            size: 0,
            mtime,
            is_directory: true,
        });
    }
    let f = File::open(path).map_err(|e| with_path(e, path))?;
    let sha256 = hash_reader(f).map_err(|e| with_path(e, path))?;
    Ok(FileChecksum {
        sha256,
        size: md.len(),
        mtime,
        is_directory: false,
    })
}

fn with_path(e: std::io::Error, path: &Path) -> Error {
    let kind = if e.kind() == std::io::ErrorKind::NotFound {
        ErrorKind::NotFound
    } else {
        ErrorKind::Io
    };
    Error::new(kind, format!("{}: {e}", path.display()))
}

/// Compare a recorded fingerprint against the live path.
///
/// Only content identity decides; `mtime` differences alone never report `Modified`.
#[must_use]
pub fn compare(expected: &FileChecksum, path: &Path) -> ChecksumStatus {
    match checksum(path) {
        Ok(current) => {
            if current.is_directory != expected.is_directory
                || current.size != expected.size
                || current.sha256 != expected.sha256
            {
                ChecksumStatus::Modified
            } else {
                ChecksumStatus::Unchanged
            }
        }
        Err(e) if e.kind == ErrorKind::NotFound => ChecksumStatus::Missing,
        Err(_) => ChecksumStatus::Modified,
    }
}

/// Fingerprint several paths, skipping the ones that cannot be read.
pub fn checksum_many<'a, I>(paths: I) -> BTreeMap<PathBuf, FileChecksum>
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut out = BTreeMap::new();
    for p in paths {
        match checksum(p) {
            Ok(c) => {
                out.insert(p.to_path_buf(), c);
            }
            Err(e) => log::warn!("checksum skipped for {}: {e}", p.display()),
        }
    }
    out
}
