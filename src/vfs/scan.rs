use std::fs;
use std::path::Path;

use time::OffsetDateTime;
use walkdir::WalkDir;

use crate::adapters::{CancelToken, EngineEvent, EventSink};
use crate::constants::INDEX_PROGRESS_EVERY;
use crate::types::{FileEntry, IndexReport};

fn entry_of(path: &Path, md: &fs::Metadata) -> FileEntry {
    FileEntry {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        path: path.to_path_buf(),
        is_directory: md.is_dir(),
        size: if md.is_dir() { 0 } else { md.len() },
        modified_at: md.modified().ok().map(OffsetDateTime::from),
    }
}

/// One level of `dir`, sorted by name. Symlinks are reported, not followed.
///
/// # Errors
/// When `dir` cannot be read. Entries that vanish mid-listing are skipped.
pub fn list_dir(dir: &Path) -> std::io::Result<Vec<FileEntry>> {
    let mut out = Vec::new();
    for ent in fs::read_dir(dir)? {
        let Ok(ent) = ent else { continue };
        let path = ent.path();
        if let Ok(md) = fs::symlink_metadata(&path) {
            out.push(entry_of(&path, &md));
        }
    }
    out.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(out)
}

/// Walk `root` and count what is under it, emitting `indexing_progress`
/// every few entries and once more when done.
///
/// # Errors
/// When `root` itself cannot be read.
pub fn index_tree(
    root: &Path,
    events: &dyn EventSink,
    cancel: Option<&CancelToken>,
) -> std::io::Result<IndexReport> {
    if !fs::metadata(root)?.is_dir() {
        return Err(std::io::Error::other(format!("not a folder: {}", root.display())));
    }
    let mut report = IndexReport::default();
    let mut scanned = 0usize;
    for ent in WalkDir::new(root).min_depth(1).follow_links(false) {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            break;
        }
        let ent = match ent {
            Ok(e) => e,
            Err(e) => {
                log::debug!("index: skipping entry under {}: {e}", root.display());
                report.skipped += 1;
                continue;
            }
        };
        match ent.metadata() {
            Ok(md) if md.is_dir() => report.directories += 1,
            Ok(md) => {
                report.files += 1;
                report.total_bytes += md.len();
            }
            Err(_) => report.skipped += 1,
        }
        scanned += 1;
        if scanned % INDEX_PROGRESS_EVERY == 0 {
            events.emit(&EngineEvent::IndexingProgress {
                root: root.to_path_buf(),
                scanned,
                done: false,
            });
        }
    }
    events.emit(&EngineEvent::IndexingProgress {
        root: root.to_path_buf(),
        scanned,
        done: true,
    });
    log::info!(
        "index: {} files, {} folders, {} bytes under {}",
        report.files,
        report.directories,
        report.total_bytes,
        root.display()
    );
    Ok(report)
}
