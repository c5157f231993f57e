use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::constants::{HISTORY_FILE_SUFFIX, HISTORY_INDEX_FILE, HISTORY_SCHEMA_VERSION};
use crate::fs::atomic::{read_json, remove_durable, write_json_durable};
use crate::fs::paths::validate_folder;
use crate::policy::Policy;
use crate::types::errors::{Error, ErrorKind, Result};
use crate::types::{
    FolderHistory, FolderIndexEntry, HistoryIndex, HistorySession, HistorySummary, SessionSummary,
};

#[derive(Clone, Debug)]
pub struct HistoryStore {
    dir: PathBuf,
    protected: Vec<PathBuf>,
    allowed: Vec<PathBuf>,
    max_sessions: usize,
    sync: bool,
}

impl HistoryStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_policy(dir, &Policy::default())
    }

    #[must_use]
    pub fn with_policy(dir: impl Into<PathBuf>, policy: &Policy) -> Self {
        Self {
            dir: dir.into(),
            protected: policy.scope.protected_roots.clone(),
            allowed: policy.scope.allowed_prefixes.clone(),
            max_sessions: policy.retention.max_sessions_per_folder.max(1),
            sync: policy.durability.fsync,
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// First 8 bytes of the SHA-256 of the canonical folder path, hex encoded.
    #[must_use]
    pub fn folder_hash(folder: &Path) -> String {
        let mut hasher = Sha256::new();
        hasher.update(folder.as_os_str().as_encoded_bytes());
        hex::encode(&hasher.finalize()[..8])
    }

    fn file_for(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{hash}{HISTORY_FILE_SUFFIX}"))
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join(HISTORY_INDEX_FILE)
    }

    fn canonical(&self, folder: &Path) -> Result<PathBuf> {
        validate_folder(folder, &self.protected, &self.allowed)
    }

    fn write<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        write_json_durable(path, value, self.sync).map_err(Error::from)
    }

    fn load_canonical(&self, canonical: &Path) -> Result<Option<FolderHistory>> {
        read_json(&self.file_for(&Self::folder_hash(canonical))).map_err(Error::from)
    }

    /// History file for `folder`, if any.
    ///
    /// # Errors
    /// `InvalidPath`/`Policy` from folder validation, `Corrupt` for unreadable files.
    pub fn load(&self, folder: &Path) -> Result<Option<FolderHistory>> {
        let canonical = self.canonical(folder)?;
        self.load_canonical(&canonical)
    }

    /// Add a committed session to its folder's history and update the index.
    ///
    /// Returns the session id.
    ///
    /// # Errors
    /// Folder validation or write failures.
    pub fn archive_session(&self, mut session: HistorySession) -> Result<String> {
        let canonical = self.canonical(&session.target_folder)?;
        let hash = Self::folder_hash(&canonical);
        let mut history = self.load_canonical(&canonical)?.unwrap_or_else(|| FolderHistory {
            version: HISTORY_SCHEMA_VERSION,
            folder_path: canonical.clone(),
            folder_hash: hash.clone(),
            sessions: Vec::new(),
            last_updated: OffsetDateTime::now_utc(),
        });
        session.target_folder.clone_from(&canonical);
        let id = session.session_id.clone();
        history.sessions.retain(|s| s.session_id != id);
        history.sessions.insert(0, session);
        history.sessions.truncate(self.max_sessions);
        history.version = HISTORY_SCHEMA_VERSION;
        history.last_updated = OffsetDateTime::now_utc();

        self.write(&self.file_for(&hash), &history)?;
        self.upsert_index(&history)?;
        log::info!(
            "history: archived session {id} for {} ({} kept)",
            canonical.display(),
            history.sessions.len()
        );
        Ok(id)
    }

    /// Session summaries, newest first. Empty when the folder has no history.
    ///
    /// # Errors
    /// Folder validation or read failures.
    pub fn list_sessions(&self, folder: &Path) -> Result<Vec<SessionSummary>> {
        Ok(self
            .load(folder)?
            .map(|h| h.sessions.iter().map(SessionSummary::from).collect())
            .unwrap_or_default())
    }

    /// # Errors
    /// Folder validation or read failures.
    pub fn get_summary(&self, folder: &Path) -> Result<Option<HistorySummary>> {
        Ok(self.load(folder)?.map(|h| HistorySummary {
            folder_path: h.folder_path.clone(),
            session_count: h.sessions.len(),
            total_operations: h.sessions.iter().map(|s| s.operations.len()).sum(),
            last_organized: h.sessions.first().map(|s| s.executed_at),
        }))
    }

    /// # Errors
    /// Folder validation or read failures.
    pub fn get_session_detail(&self, folder: &Path, session_id: &str) -> Result<Option<HistorySession>> {
        Ok(self
            .load(folder)?
            .and_then(|h| h.sessions.into_iter().find(|s| s.session_id == session_id)))
    }

    /// False for invalid or protected folders as well as folders without history.
    #[must_use]
    pub fn has_history(&self, folder: &Path) -> bool {
        self.canonical(folder)
            .map(|c| self.file_for(&Self::folder_hash(&c)).exists())
            .unwrap_or(false)
    }

    /// Remove a folder's history file and its index entry.
    ///
    /// # Errors
    /// Folder validation or write failures.
    pub fn delete_history(&self, folder: &Path) -> Result<()> {
        let canonical = self.canonical(folder)?;
        let hash = Self::folder_hash(&canonical);
        remove_durable(&self.file_for(&hash), self.sync)?;
        let mut index = self.load_index()?;
        index.folders.retain(|f| f.folder_hash != hash);
        self.write(&self.index_path(), &index)?;
        log::info!("history: deleted history for {}", canonical.display());
        Ok(())
    }

    /// Flag a session as undone. Returns false when it already was.
    ///
    /// # Errors
    /// `NotFound` when the folder has no such session.
    pub fn mark_undone(&self, folder: &Path, session_id: &str) -> Result<bool> {
        let canonical = self.canonical(folder)?;
        let mut history = self
            .load_canonical(&canonical)?
            .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("no history for {}", canonical.display())))?;
        let session = history
            .sessions
            .iter_mut()
            .find(|s| s.session_id == session_id)
            .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("no session {session_id}")))?;
        if session.undone {
            return Ok(false);
        }
        session.undone = true;
        session.undone_at = Some(OffsetDateTime::now_utc());
        history.last_updated = OffsetDateTime::now_utc();
        self.write(&self.file_for(&history.folder_hash), &history)?;
        self.upsert_index(&history)?;
        Ok(true)
    }

    /// Flag `up_to` and every newer session as undone, the way a multi-level
    /// undo to `up_to` leaves them. Returns how many changed.
    ///
    /// # Errors
    /// `NotFound` when the folder has no such session.
    pub fn mark_sessions_undone(&self, folder: &Path, up_to: &str) -> Result<usize> {
        let canonical = self.canonical(folder)?;
        let mut history = self
            .load_canonical(&canonical)?
            .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("no history for {}", canonical.display())))?;
        let idx = history
            .sessions
            .iter()
            .position(|s| s.session_id == up_to)
            .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("no session {up_to}")))?;
        let now = OffsetDateTime::now_utc();
        let mut changed = 0;
        for session in history.sessions[..=idx].iter_mut().filter(|s| !s.undone) {
            session.undone = true;
            session.undone_at = Some(now);
            changed += 1;
        }
        if changed > 0 {
            history.last_updated = now;
            self.write(&self.file_for(&history.folder_hash), &history)?;
            self.upsert_index(&history)?;
        }
        Ok(changed)
    }

    /// # Errors
    /// `Corrupt` when the index cannot be parsed.
    pub fn load_index(&self) -> Result<HistoryIndex> {
        Ok(read_json(&self.index_path())?.unwrap_or(HistoryIndex {
            version: HISTORY_SCHEMA_VERSION,
            folders: Vec::new(),
        }))
    }

    /// Every folder with history, most recently updated first.
    ///
    /// # Errors
    /// `Corrupt` when the index cannot be parsed.
    pub fn list_folders(&self) -> Result<Vec<FolderIndexEntry>> {
        let mut folders = self.load_index()?.folders;
        folders.sort_by(|a, b| {
            b.last_updated
                .cmp(&a.last_updated)
                .then_with(|| a.folder_path.cmp(&b.folder_path))
        });
        Ok(folders)
    }

    fn upsert_index(&self, history: &FolderHistory) -> Result<()> {
        let mut index = self.load_index()?;
        index.version = HISTORY_SCHEMA_VERSION;
        index.folders.retain(|f| f.folder_hash != history.folder_hash);
        index.folders.push(index_entry(history));
        self.write(&self.index_path(), &index)
    }

    /// Upgrade old history files in place and rebuild the index from them.
    ///
    /// Returns how many files were rewritten. Unreadable files are left alone.
    ///
    /// # Errors
    /// When the history directory exists but cannot be read, or a write fails.
    pub fn migrate(&self) -> Result<usize> {
        let rd = match std::fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let mut upgraded = 0usize;
        let mut index = HistoryIndex {
            version: HISTORY_SCHEMA_VERSION,
            folders: Vec::new(),
        };
        for ent in rd.flatten() {
            let path = ent.path();
            let is_history = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(HISTORY_FILE_SUFFIX));
            if !is_history {
                continue;
            }
            let mut history: FolderHistory = match read_json(&path) {
                Ok(Some(h)) => h,
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("history: skipping unreadable {}: {e}", path.display());
                    continue;
                }
            };
            if history.version < HISTORY_SCHEMA_VERSION {
                history.version = HISTORY_SCHEMA_VERSION;
                history.sessions.sort_by(|a, b| b.executed_at.cmp(&a.executed_at));
                self.write(&path, &history)?;
                upgraded += 1;
            }
            index.folders.push(index_entry(&history));
        }
        self.write(&self.index_path(), &index)?;
        if upgraded > 0 {
            log::info!("history: upgraded {upgraded} file(s) to schema {HISTORY_SCHEMA_VERSION}");
        }
        Ok(upgraded)
    }
}

fn index_entry(history: &FolderHistory) -> FolderIndexEntry {
    FolderIndexEntry {
        folder_path: history.folder_path.clone(),
        folder_hash: history.folder_hash.clone(),
        session_count: history.sessions.len(),
        last_updated: history.last_updated,
    }
}
