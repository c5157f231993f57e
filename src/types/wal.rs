use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::checksum::FileChecksum;
use super::plan::{EntryKind, Operation};

/// Checksums keyed by the path they were taken from.
pub type ChecksumMap = BTreeMap<PathBuf, FileChecksum>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Executing,
    Complete,
    Interrupted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Pending,
    InProgress,
    Complete,
    Failed,
    RolledBack,
}

/// One journaled operation with its precomputed inverse.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalEntry {
    pub op_id: String,
    pub sequence: usize,
    pub operation: Operation,
    pub undo_operation: Operation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EntryKind>,
    pub status: EntryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub source_checksums: ChecksumMap,
    #[serde(default)]
    pub result_checksums: ChecksumMap,
}

/// Durable record of one in-flight batch.
///
/// Entries `[0, completed_count)` are complete; the rest are still owed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub version: u32,
    pub job_id: String,
    pub target_folder: PathBuf,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub instruction: String,
    /// Set when the job reverts a history session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub undo_of: Option<String>,
    #[serde(default)]
    pub entries: Vec<WalEntry>,
    #[serde(default)]
    pub completed_count: usize,
}

impl Job {
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.entries.len().saturating_sub(self.completed_count)
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status == EntryStatus::Failed)
            .count()
    }

    /// Open jobs block new jobs on overlapping folders and are offered for recovery.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status != JobStatus::Complete
    }

    #[must_use]
    pub fn entry(&self, op_id: &str) -> Option<&WalEntry> {
        self.entries.iter().find(|e| e.op_id == op_id)
    }

    fn next_entry(&mut self, op_id: &str) -> Result<&mut WalEntry, String> {
        let idx = self.completed_count;
        match self.entries.get_mut(idx) {
            Some(e) if e.op_id == op_id => Ok(e),
            Some(e) => Err(format!(
                "out of order: expected {} at {idx}, got {op_id}",
                e.op_id
            )),
            None => Err(format!("no pending entry for {op_id}")),
        }
    }

    /// Mark the next entry as running with its pre-mutation checksums.
    ///
    /// # Errors
    /// When `op_id` is not the next pending entry.
    pub fn begin_entry(&mut self, op_id: &str, source_checksums: ChecksumMap) -> Result<(), String> {
        let e = self.next_entry(op_id)?;
        e.status = EntryStatus::InProgress;
        e.error = None;
        e.source_checksums = source_checksums;
        self.status = JobStatus::Executing;
        Ok(())
    }

    /// Mark the next entry complete and advance `completed_count`.
    ///
    /// # Errors
    /// When `op_id` is not the next pending entry.
    pub fn complete_entry(
        &mut self,
        op_id: &str,
        source_checksums: ChecksumMap,
        result_checksums: ChecksumMap,
    ) -> Result<(), String> {
        let e = self.next_entry(op_id)?;
        e.status = EntryStatus::Complete;
        e.error = None;
        if !source_checksums.is_empty() {
            e.source_checksums = source_checksums;
        }
        e.result_checksums = result_checksums;
        self.completed_count += 1;
        Ok(())
    }

    /// Record a failure on an entry and mark the job interrupted.
    ///
    /// # Errors
    /// When the job has no entry `op_id`.
    pub fn fail_entry(&mut self, op_id: &str, error: &str) -> Result<(), String> {
        let e = self
            .entries
            .iter_mut()
            .find(|e| e.op_id == op_id)
            .ok_or_else(|| format!("no entry {op_id}"))?;
        e.status = EntryStatus::Failed;
        e.error = Some(error.to_string());
        self.status = JobStatus::Interrupted;
        Ok(())
    }
}

/// What the recovery prompt shows for an unfinished job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryInfo {
    pub job_id: String,
    pub target_folder: PathBuf,
    pub description: String,
    pub completed_count: usize,
    pub pending_count: usize,
    pub failed_count: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    pub pending_operations: Vec<Operation>,
}

impl From<&Job> for RecoveryInfo {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.job_id.clone(),
            target_folder: job.target_folder.clone(),
            description: job.description.clone(),
            completed_count: job.completed_count,
            pending_count: job.pending_count(),
            failed_count: job.failed_count(),
            started_at: job.started_at,
            pending_operations: job
                .entries
                .iter()
                .skip(job.completed_count)
                .map(|e| e.operation.clone())
                .collect(),
        }
    }
}

/// Outcome of resume or rollback.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryResult {
    pub success: bool,
    pub completed_count: usize,
    pub failed_count: usize,
    #[serde(default)]
    pub skipped_count: usize,
    pub errors: Vec<String>,
}
