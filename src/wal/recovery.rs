//! Forward replay and reverse rollback of journaled jobs.
//!
//! `run` is the single execution loop: a fresh commit runs it from entry 0,
//! resume runs it from `completed_count`. Each step re-validates its
//! preconditions right before mutating, and the first failure halts the loop.
use std::path::Path;

use super::{Journal, Result, WalError};
use crate::adapters::{CancelToken, EngineEvent, EventSink, Mutator};
use crate::fs::checksum::{checksum_many, compare};
use crate::fs::ops::precheck;
use crate::fs::restore::{classify, revert, ReverseStep, StepOutcome};
use crate::types::{
    ChecksumMap, ChecksumStatus, ConflictResolution, EntryStatus, FailedOperation, Job, JobStatus,
    Operation, RecoveryResult, WalEntry,
};

/// Collaborators needed to replay a job.
pub struct Replay<'a> {
    pub journal: &'a Journal,
    pub mutator: &'a dyn Mutator,
    pub events: &'a dyn EventSink,
    pub backup_tag: &'a str,
}

/// What one pass of the execution loop did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunOutcome {
    pub executed: Vec<String>,
    pub failed: Option<FailedOperation>,
    pub cancelled: bool,
}

impl RunOutcome {
    #[must_use]
    pub fn finished(&self) -> bool {
        self.failed.is_none() && !self.cancelled
    }
}

fn exists(p: &Path) -> bool {
    std::fs::symlink_metadata(p).is_ok()
}

fn source_sums(op: &Operation) -> ChecksumMap {
    checksum_many(op.source_path())
}

fn result_sums(op: &Operation) -> ChecksumMap {
    let res = op.result_path();
    checksum_many(res.as_deref())
}

/// Whether an entry that was running at crash time already took effect.
fn already_applied(e: &WalEntry) -> bool {
    let op = &e.operation;
    let Some(res) = op.result_path() else {
        return op.source_path().is_some_and(|p| !exists(p));
    };
    if !exists(&res) {
        return false;
    }
    if op.removes_source() && op.source_path().is_some_and(exists) {
        return false;
    }
    match op.source_path().and_then(|src| e.source_checksums.get(src)) {
        Some(expected) => compare(expected, &res) == ChecksumStatus::Unchanged,
        None => matches!(op, Operation::CreateFolder { .. }),
    }
}

impl Replay<'_> {
    fn persist(&self, job: &mut Job, durable: bool) -> Result<()> {
        if durable {
            self.journal.store(job)
        } else {
            Ok(())
        }
    }

    fn halt(
        &self,
        job: &mut Job,
        durable: bool,
        idx: usize,
        error: String,
        out: &mut RunOutcome,
    ) -> Result<()> {
        let entry = &job.entries[idx];
        let failed = FailedOperation {
            op_id: entry.op_id.clone(),
            sequence: entry.sequence,
            error: error.clone(),
        };
        log::warn!("job {}: {} failed: {error}", job.job_id, failed.op_id);
        job.fail_entry(&failed.op_id, &error)
            .map_err(WalError::Invalid)?;
        out.failed = Some(failed);
        self.persist(job, durable)
    }

    /// Execute entries `[completed_count, n)` in order.
    ///
    /// With `durable == false` the job lives only in memory and nothing is journaled.
    ///
    /// # Errors
    /// Journal write failures. Operation failures are reported in the outcome.
    pub fn run(&self, job: &mut Job, durable: bool, cancel: Option<&CancelToken>) -> Result<RunOutcome> {
        let mut out = RunOutcome::default();
        let total = job.entries.len();
        job.status = JobStatus::Executing;
        self.persist(job, durable)?;

        while job.completed_count < total {
            if cancel.is_some_and(CancelToken::is_cancelled) {
                out.cancelled = true;
                job.status = JobStatus::Interrupted;
                self.persist(job, durable)?;
                log::info!("job {}: cancelled at {}/{total}", job.job_id, job.completed_count);
                return Ok(out);
            }
            let idx = job.completed_count;
            let entry = job.entries[idx].clone();

            if let Err(pre) = precheck(&entry.operation) {
                if entry.status == EntryStatus::InProgress && already_applied(&entry) {
                    log::info!("job {}: {} already applied before interruption", job.job_id, entry.op_id);
                    job.complete_entry(&entry.op_id, ChecksumMap::new(), result_sums(&entry.operation))
                        .map_err(WalError::Invalid)?;
                    self.persist(job, durable)?;
                    out.executed.push(entry.op_id);
                    continue;
                }
                self.halt(job, durable, idx, pre.to_string(), &mut out)?;
                return Ok(out);
            }

            job.begin_entry(&entry.op_id, source_sums(&entry.operation))
                .map_err(WalError::Invalid)?;
            self.persist(job, durable)?;

            if let Err(e) = self.mutator.apply(&entry.operation) {
                self.halt(job, durable, idx, format!("{} failed: {e}", entry.operation.label()), &mut out)?;
                return Ok(out);
            }

            job.complete_entry(&entry.op_id, ChecksumMap::new(), result_sums(&entry.operation))
                .map_err(WalError::Invalid)?;
            self.persist(job, durable)?;
            out.executed.push(entry.op_id.clone());
            self.events.emit(&EngineEvent::ExecutionProgress {
                job_id: job.job_id.clone(),
                op_id: entry.op_id,
                completed: job.completed_count,
                total,
            });
        }

        job.status = JobStatus::Complete;
        self.persist(job, durable)?;
        Ok(out)
    }

    /// Continue an interrupted job from `completed_count`.
    ///
    /// Returns the job in its final state so the caller can archive it once complete.
    ///
    /// # Errors
    /// `NotFound`, `Corrupt` or journal write failures.
    pub fn resume(&self, job_id: &str) -> Result<(RecoveryResult, Job)> {
        let mut job = self.journal.load(job_id)?;
        let out = self.run(&mut job, true, None)?;
        let result = RecoveryResult {
            success: out.finished(),
            completed_count: job.completed_count,
            failed_count: usize::from(out.failed.is_some()),
            skipped_count: 0,
            errors: out.failed.into_iter().map(|f| f.error).collect(),
        };
        Ok((result, job))
    }

    /// Revert the completed entries of a job in reverse order.
    ///
    /// The job record is deleted only when nothing failed.
    ///
    /// # Errors
    /// `NotFound`, `Corrupt` or journal write failures.
    pub fn rollback(&self, job_id: &str, resolution: ConflictResolution) -> Result<RecoveryResult> {
        let mut job = self.journal.load(job_id)?;

        // An entry that was running at crash time counts as done when its effect is on disk.
        if let Some(e) = job.entries.get(job.completed_count).cloned() {
            if e.status == EntryStatus::InProgress && already_applied(&e) {
                job.complete_entry(&e.op_id, ChecksumMap::new(), result_sums(&e.operation))
                    .map_err(WalError::Invalid)?;
                self.journal.store(&mut job)?;
            }
        }

        let done: Vec<usize> = (0..job.completed_count)
            .rev()
            .filter(|&i| job.entries[i].status == EntryStatus::Complete)
            .collect();
        let total = done.len();
        let mut result = RecoveryResult::default();

        if resolution == ConflictResolution::Abort {
            let conflicts: Vec<String> = done
                .iter()
                .filter_map(|&i| {
                    let e = &job.entries[i];
                    classify(&step_of(e))
                        .map(|c| format!("{:?}: {}", c.kind, c.path.display()))
                })
                .collect();
            if !conflicts.is_empty() {
                result.failed_count = conflicts.len();
                result.errors = conflicts;
                return Ok(result);
            }
        }

        for (n, &i) in done.iter().enumerate() {
            let r = revert(&step_of(&job.entries[i]), resolution, self.mutator, self.backup_tag);
            match r.outcome {
                StepOutcome::Undone => {
                    job.entries[i].status = EntryStatus::RolledBack;
                    result.completed_count += 1;
                }
                StepOutcome::Skipped(c) => {
                    log::info!("rollback {job_id}: skipped {:?} {}", c.kind, c.path.display());
                    result.skipped_count += 1;
                }
                StepOutcome::Failed(msg) => {
                    result.failed_count += 1;
                    result.errors.push(msg);
                }
            }
            if let Some(b) = r.backup {
                log::info!("rollback {job_id}: blocker kept at {}", b.display());
            }
            self.journal.store(&mut job)?;
            self.events.emit(&EngineEvent::RollbackProgress {
                job_id: job_id.to_string(),
                completed: n + 1,
                total,
            });
        }

        result.success = result.failed_count == 0;
        if result.success {
            self.journal.delete(job_id)?;
        } else {
            job.status = JobStatus::Interrupted;
            self.journal.store(&mut job)?;
        }
        Ok(result)
    }

    /// Forget a job without touching the files it changed.
    ///
    /// # Errors
    /// `NotFound` when there is no such job, or the delete fails.
    pub fn discard(&self, job_id: &str) -> Result<()> {
        self.journal.load(job_id)?;
        self.journal.delete(job_id)
    }
}

fn step_of(e: &WalEntry) -> ReverseStep<'_> {
    ReverseStep {
        op_id: &e.op_id,
        forward: &e.operation,
        inverse: &e.undo_operation,
        result_checksums: &e.result_checksums,
    }
}
