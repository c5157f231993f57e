use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A directory listing row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_directory: bool,
    pub size: u64,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub modified_at: Option<OffsetDateTime>,
}

/// How a listing row relates to the plan being previewed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostState {
    Normal,
    Creating,
    Destination,
    Source,
    Deleting,
}

/// A listing row decorated with its preview state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GhostFileEntry {
    #[serde(flatten)]
    pub entry: FileEntry,
    pub ghost_state: GhostState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_path: Option<PathBuf>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub ghost_since: Option<OffsetDateTime>,
    pub is_virtual: bool,
}

impl GhostFileEntry {
    #[must_use]
    pub fn normal(entry: FileEntry) -> Self {
        Self {
            entry,
            ghost_state: GhostState::Normal,
            operation_id: None,
            linked_path: None,
            ghost_since: None,
            is_virtual: false,
        }
    }
}

/// A real path that the plan moves away.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovedEntry {
    pub operation_id: String,
    pub destination: PathBuf,
}

/// Virtual view of the tree after a plan, without touching disk.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Simulation {
    /// Paths that would exist only after the plan, keyed by path.
    pub virtual_entries: BTreeMap<PathBuf, GhostFileEntry>,
    /// Paths deleted by `delete_folder`, with the operation id.
    pub removed_paths: BTreeMap<PathBuf, String>,
    /// Paths moved or renamed away, with where they went.
    pub moved_entries: BTreeMap<PathBuf, MovedEntry>,
    /// Paths sent to quarantine, with the operation id.
    pub trashed_paths: BTreeMap<PathBuf, String>,
}

/// Stable code of a plan validation finding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    SourceMissing,
    DestinationExists,
    ParentMissing,
    Cycle,
    ProtectedPath,
    OutsideTarget,
    OrphanedMove,
    DuplicateDestination,
    InvalidPath,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub code: IssueCode,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op_id: Option<String>,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanValidation {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub plan_hash: String,
    pub plan_id: String,
}

/// Operations sharing one destination folder, for review screens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationGroup {
    pub folder: PathBuf,
    pub name: String,
    pub has_create: bool,
    /// In plan order, not sorted.
    pub op_ids: Vec<String>,
    pub total_count: usize,
}
