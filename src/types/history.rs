use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::plan::{EntryKind, Operation};
use super::wal::ChecksumMap;

/// An executed operation as archived in history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryOperation {
    pub id: String,
    pub sequence: usize,
    pub operation: Operation,
    pub undo_operation: Operation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EntryKind>,
    #[serde(default)]
    pub source_checksums: ChecksumMap,
    #[serde(default)]
    pub result_checksums: ChecksumMap,
}

/// One committed batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySession {
    pub session_id: String,
    #[serde(default)]
    pub user_instruction: String,
    #[serde(default)]
    pub plan_description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub executed_at: OffsetDateTime,
    pub target_folder: PathBuf,
    pub operations: Vec<HistoryOperation>,
    pub files_affected: usize,
    #[serde(default)]
    pub undone: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub undone_at: Option<OffsetDateTime>,
}

/// On-disk history file for one organized folder. Sessions are kept newest first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderHistory {
    #[serde(default)]
    pub version: u32,
    pub folder_path: PathBuf,
    pub folder_hash: String,
    #[serde(default)]
    pub sessions: Vec<HistorySession>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderIndexEntry {
    pub folder_path: PathBuf,
    pub folder_hash: String,
    pub session_count: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

/// List of organized folders, used to find history files without scanning.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryIndex {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub folders: Vec<FolderIndexEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub folder_path: PathBuf,
    pub session_count: usize,
    pub total_operations: usize,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_organized: Option<OffsetDateTime>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub user_instruction: String,
    pub plan_description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub executed_at: OffsetDateTime,
    pub operation_count: usize,
    pub files_affected: usize,
    pub undone: bool,
}

impl From<&HistorySession> for SessionSummary {
    fn from(s: &HistorySession) -> Self {
        Self {
            session_id: s.session_id.clone(),
            user_instruction: s.user_instruction.clone(),
            plan_description: s.plan_description.clone(),
            executed_at: s.executed_at,
            operation_count: s.operations.len(),
            files_affected: s.files_affected,
            undone: s.undone,
        }
    }
}
