//! Quarantine store: a flat directory of `<millis>_<name>` entries.
//!
//! Quarantined items are moved, never deleted, so undo can bring them back.
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarantineItem {
    pub path: PathBuf,
    pub original_name: String,
    pub quarantined_at_ms: u128,
    pub size: u64,
    pub is_directory: bool,
}

/// Free quarantine path for `source` under `base`.
#[must_use]
pub fn quarantine_path_for(base: &Path, source: &Path) -> PathBuf {
    let name = source
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("item");
    let mut ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    loop {
        let candidate = base.join(format!("{ts}_{name}"));
        if fs::symlink_metadata(&candidate).is_err() {
            return candidate;
        }
        ts = ts.saturating_add(1);
    }
}

fn parse_name(file_name: &str) -> Option<(u128, String)> {
    let (ts, rest) = file_name.split_once('_')?;
    let ts = ts.parse::<u128>().ok()?;
    if rest.is_empty() {
        return None;
    }
    Some((ts, rest.to_string()))
}

/// Items in the quarantine store, newest first. Foreign files are ignored.
///
/// # Errors
/// Returns an IO error if `base` exists but cannot be read.
pub fn list(base: &Path) -> std::io::Result<Vec<QuarantineItem>> {
    let rd = match fs::read_dir(base) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut out = Vec::new();
    for entry in rd.flatten() {
        let fname = entry.file_name();
        let Some((ts, original)) = parse_name(&fname.to_string_lossy()) else {
            continue;
        };
        let Ok(md) = entry.path().symlink_metadata() else {
            continue;
        };
        out.push(QuarantineItem {
            path: entry.path(),
            original_name: original,
            quarantined_at_ms: ts,
            size: if md.is_dir() { 0 } else { md.len() },
            is_directory: md.is_dir(),
        });
    }
    out.sort_by(|a, b| {
        b.quarantined_at_ms
            .cmp(&a.quarantined_at_ms)
            .then_with(|| a.path.cmp(&b.path))
    });
    Ok(out)
}
