//! Moving blockers aside before an undo writes over their path.
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Backup name for `target`: `.<name>.<tag>.<millis>.bak` in the same directory.
#[must_use]
pub fn backup_path_with_tag(target: &Path, tag: &str) -> PathBuf {
    let name = target
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("backup");
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    parent.join(format!(".{name}.{tag}.{ts}.bak"))
}

/// Like `backup_path_with_tag`, bumping the timestamp until the name is free.
#[must_use]
pub fn unique_backup_path(target: &Path, tag: &str) -> PathBuf {
    let mut backup = backup_path_with_tag(target, tag);
    while std::fs::symlink_metadata(&backup).is_ok() {
        let Some(bumped) = bump(&backup) else { break };
        backup = bumped;
    }
    backup
}

fn bump(backup: &Path) -> Option<PathBuf> {
    let stem = backup.file_name()?.to_str()?;
    let prefix = stem.strip_suffix(".bak")?;
    let (pre, ts_s) = prefix.rsplit_once('.')?;
    let ts = ts_s.parse::<u128>().ok()?;
    let parent = backup.parent().unwrap_or_else(|| Path::new("."));
    Some(parent.join(format!("{pre}.{}.bak", ts.saturating_add(1))))
}

/// Rename whatever sits at `target` to a fresh backup name and return that name.
///
/// # Errors
/// Returns an IO error if the rename fails.
pub fn move_aside(target: &Path, tag: &str) -> std::io::Result<PathBuf> {
    let backup = unique_backup_path(target, tag);
    std::fs::rename(target, &backup)?;
    Ok(backup)
}
