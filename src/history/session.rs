use std::collections::BTreeSet;
use std::path::PathBuf;

use time::OffsetDateTime;

use crate::types::{EntryStatus, HistoryOperation, HistorySession, Job};

/// Build the archived form of a job from its completed entries.
///
/// The session id is the job id, so facts for the commit and the later undo line up.
#[must_use]
pub fn session_from_job(job: &Job) -> HistorySession {
    let operations: Vec<HistoryOperation> = job
        .entries
        .iter()
        .filter(|e| e.status == EntryStatus::Complete)
        .map(|e| HistoryOperation {
            id: e.op_id.clone(),
            sequence: e.sequence,
            operation: e.operation.clone(),
            undo_operation: e.undo_operation.clone(),
            kind: e.kind,
            source_checksums: e.source_checksums.clone(),
            result_checksums: e.result_checksums.clone(),
        })
        .collect();
    let files_affected = operations
        .iter()
        .flat_map(|o| o.operation.source_path().map(PathBuf::from))
        .collect::<BTreeSet<_>>()
        .len();
    HistorySession {
        session_id: job.job_id.clone(),
        user_instruction: job.instruction.clone(),
        plan_description: job.description.clone(),
        executed_at: OffsetDateTime::now_utc(),
        target_folder: job.target_folder.clone(),
        operations,
        files_affected,
        undone: false,
        undone_at: None,
    }
}
