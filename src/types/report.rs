use serde::{Deserialize, Serialize};

/// Identifies the job a commit runs under.
///
/// `durable == false` means no WAL record backs the job; a crash during it
/// cannot be recovered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobHandle {
    pub job_id: String,
    pub durable: bool,
    /// Kept on the handle so non-durable jobs still archive it.
    #[serde(default)]
    pub instruction: String,
}

/// One operation that stopped a commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedOperation {
    pub op_id: String,
    pub sequence: usize,
    pub error: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitReport {
    pub job_id: String,
    pub plan_id: String,
    pub durable: bool,
    /// Operation ids in execution order.
    pub executed: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed: Option<FailedOperation>,
    pub cancelled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub duration_ms: u64,
    pub errors: Vec<String>,
}

impl CommitReport {
    #[must_use]
    pub fn success(&self) -> bool {
        self.failed.is_none() && !self.cancelled && self.errors.is_empty()
    }
}

/// Result of walking a folder tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexReport {
    pub files: usize,
    pub directories: usize,
    pub total_bytes: u64,
    pub skipped: usize,
}

/// What `run_startup_migration` changed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub history_files_upgraded: usize,
    pub index_rebuilt: bool,
    pub stale_temp_files_removed: usize,
    pub corrupt_journals_quarantined: usize,
}
