use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Why an undo step cannot be applied cleanly against the live disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Content at the operation's result path differs from what was archived.
    Modified,
    /// The path the undo would read from is gone.
    Missing,
    /// Something occupies the path the undo would write to.
    Blocking,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictInfo {
    pub op_id: String,
    pub path: PathBuf,
    pub kind: ConflictKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_sha256: Option<String>,
}

/// Read-only classification of every operation an undo to `session_id`
/// would revert: that session plus every newer one not yet undone.
///
/// `safe_operations + conflicted_operations == total_operations` always holds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoPreflightResult {
    pub session_id: String,
    pub can_proceed: bool,
    pub total_operations: usize,
    pub safe_operations: usize,
    pub conflicted_operations: usize,
    pub modified_files: Vec<ConflictInfo>,
    pub missing_files: Vec<PathBuf>,
    pub blocking_files: Vec<PathBuf>,
}

impl UndoPreflightResult {
    /// All conflicts, one per conflicted operation.
    #[must_use]
    pub fn conflict_count(&self) -> usize {
        self.modified_files.len() + self.missing_files.len() + self.blocking_files.len()
    }
}

/// How undo treats a conflicted operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    /// Any conflict halts the whole undo before touching disk.
    #[default]
    Abort,
    /// Conflicted operations are left alone and counted as skipped.
    Skip,
    /// Blockers are removed and the inverse is applied.
    Force,
    /// Blockers are renamed aside and the inverse is applied.
    Backup,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoResult {
    pub success: bool,
    pub operations_undone: usize,
    pub operations_skipped: usize,
    /// Sessions flagged undone, the target plus any newer ones.
    #[serde(default)]
    pub sessions_undone: usize,
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub backups: Vec<PathBuf>,
    /// Undo job kept in the journal after a step failed under `abort`, for resume or rollback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interrupted_job: Option<String>,
}
