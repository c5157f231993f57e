// Facade for the engine; delegates to submodules under src/api/

use std::path::Path;

use crate::adapters::{CancelToken, EventSink, LockManager, Mutator, NoopEvents, StdMutator};
use crate::history::HistoryStore;
use crate::logging::audit::AuditCtx;
use crate::logging::{now_iso, AuditSink, FactsEmitter};
use crate::policy::{Policy, StorePaths};
use crate::types::{
    CommitReport, ConflictResolution, FileEntry, FolderIndexEntry, GhostFileEntry, HistorySession,
    HistorySummary, IndexReport, JobHandle, MigrationReport, OperationGroup, OrganizePlan,
    PlanValidation, PlannedOperation, RecoveryInfo, RecoveryResult, SessionSummary, Simulation,
    UndoPreflightResult, UndoResult, ValidationIssue,
};
use crate::wal::Journal;

pub mod boundary;
mod commit;
pub mod errors;
mod history;
mod migrate;
mod quarantine;
mod recovery;
mod undo;
mod vfs;

use errors::ApiError;

pub use crate::fs::quarantine::QuarantineItem;

pub struct Tidyard<E: FactsEmitter, A: AuditSink> {
    facts: E,
    audit: A,
    policy: Policy,
    store: StorePaths,
    journal: Journal,
    history: HistoryStore,
    mutator: Box<dyn Mutator>,
    events: Box<dyn EventSink>,
    redact: bool,
}

impl<E: FactsEmitter, A: AuditSink> Tidyard<E, A> {
    pub fn new(facts: E, audit: A, policy: Policy, store: StorePaths) -> Self {
        let journal = Journal::new(&store.wal_dir)
            .with_lock_timeout_ms(policy.governance.lock_timeout_ms)
            .with_sync(policy.durability.fsync);
        let history = HistoryStore::with_policy(&store.history_dir, &policy);
        Self {
            facts,
            audit,
            policy,
            store,
            journal,
            history,
            mutator: Box::new(StdMutator),
            events: Box::new(NoopEvents),
            redact: false,
        }
    }

    #[must_use]
    pub fn with_mutator(mut self, mutator: Box<dyn Mutator>) -> Self {
        self.mutator = mutator;
        self
    }

    #[must_use]
    pub fn with_events(mut self, events: Box<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    #[must_use]
    pub fn with_lock_manager(mut self, lock: Box<dyn LockManager>) -> Self {
        self.journal = self.journal.with_lock_manager(lock);
        self
    }

    #[must_use]
    pub fn with_lock_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.policy.governance.lock_timeout_ms = timeout_ms;
        self.journal = self.journal.with_lock_timeout_ms(timeout_ms);
        self
    }

    /// Zero timestamps and mask volatile fields in emitted facts.
    #[must_use]
    pub fn with_redacted_facts(mut self, redact: bool) -> Self {
        self.redact = redact;
        self
    }

    #[must_use]
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    #[must_use]
    pub fn store(&self) -> &StorePaths {
        &self.store
    }

    fn audit_ctx(&self, job_id: &str, plan_id: &str) -> AuditCtx<'_> {
        let mut ctx = AuditCtx::new(&self.facts as &dyn FactsEmitter, job_id, plan_id, now_iso());
        ctx.redact = self.redact;
        ctx
    }

    // Organize

    /// Open a durable job for `target`.
    ///
    /// # Errors
    /// `ConcurrentJob`, `LockingTimeout`, `Durability`, or `Policy` for protected folders.
    pub fn start_organize_job(&self, target: &Path, description: &str, instruction: &str) -> Result<JobHandle, ApiError> {
        commit::start_job(self, target, description, instruction)
    }

    /// Like `start_organize_job`, but falls back to a non-durable `local-` job
    /// when the journal cannot be written and the policy allows it.
    ///
    /// # Errors
    /// `ConcurrentJob` and policy errors are never downgraded.
    pub fn start_organize_job_or_local(
        &self,
        target: &Path,
        description: &str,
        instruction: &str,
    ) -> Result<JobHandle, ApiError> {
        commit::start_job_or_local(self, target, description, instruction)
    }

    /// Execute `plan` under `job`.
    ///
    /// Operation failures come back in the report; the job stays in the WAL
    /// for resume or rollback.
    ///
    /// # Errors
    /// `StalePlan` when `expected_hash` no longer matches, `Policy` for paths
    /// outside scope, `Durability` when the journal cannot be written.
    pub fn commit_plan(
        &self,
        job: &JobHandle,
        plan: &OrganizePlan,
        expected_hash: Option<&str>,
        cancel: Option<&CancelToken>,
    ) -> Result<CommitReport, ApiError> {
        commit::run(self, job, plan, expected_hash, cancel)
    }

    // Recovery

    /// # Errors
    /// `Durability` when the WAL directory cannot be read.
    pub fn wal_check_recovery(&self) -> Result<Option<RecoveryInfo>, ApiError> {
        Ok(self.journal.check_recovery()?)
    }

    /// # Errors
    /// `NotFound`, `Durability`, or history archive failures.
    pub fn wal_resume_job(&self, job_id: &str) -> Result<RecoveryResult, ApiError> {
        recovery::resume(self, job_id)
    }

    /// # Errors
    /// `NotFound` or `Durability`.
    pub fn wal_rollback_job(&self, job_id: &str, resolution: ConflictResolution) -> Result<RecoveryResult, ApiError> {
        recovery::rollback(self, job_id, resolution)
    }

    /// # Errors
    /// `NotFound` or `Durability`.
    pub fn wal_discard_job(&self, job_id: &str) -> Result<(), ApiError> {
        recovery::discard(self, job_id)
    }

    // History

    /// # Errors
    /// Folder validation or read failures.
    pub fn history_get_summary(&self, folder: &Path) -> Result<Option<HistorySummary>, ApiError> {
        Ok(self.history.get_summary(folder)?)
    }

    /// # Errors
    /// Folder validation or read failures.
    pub fn history_get_sessions(&self, folder: &Path) -> Result<Vec<SessionSummary>, ApiError> {
        Ok(self.history.list_sessions(folder)?)
    }

    /// # Errors
    /// Folder validation or read failures.
    pub fn history_get_session_detail(&self, folder: &Path, session_id: &str) -> Result<Option<HistorySession>, ApiError> {
        Ok(self.history.get_session_detail(folder, session_id)?)
    }

    #[must_use]
    pub fn history_has_history(&self, folder: &Path) -> bool {
        self.history.has_history(folder)
    }

    /// # Errors
    /// Folder validation or write failures.
    pub fn history_delete(&self, folder: &Path) -> Result<(), ApiError> {
        history::delete(self, folder)
    }

    /// # Errors
    /// `Filesystem` when the index cannot be read.
    pub fn history_list_folders(&self) -> Result<Vec<FolderIndexEntry>, ApiError> {
        Ok(self.history.list_folders()?)
    }

    /// Classify every operation of a session against the live disk.
    ///
    /// # Errors
    /// `NotFound` for an unknown session, folder validation failures.
    pub fn history_undo_preflight(&self, folder: &Path, session_id: &str) -> Result<UndoPreflightResult, ApiError> {
        undo::preflight(self, folder, session_id)
    }

    /// Revert a session under `resolution`.
    ///
    /// # Errors
    /// `AlreadyUndone`, `NotFound`, `ConcurrentJob` when the folder is busy.
    pub fn history_undo_execute(
        &self,
        folder: &Path,
        session_id: &str,
        resolution: ConflictResolution,
    ) -> Result<UndoResult, ApiError> {
        undo::execute(self, folder, session_id, resolution)
    }

    // Preview

    #[must_use]
    pub fn vfs_validate_plan(&self, plan: &OrganizePlan) -> PlanValidation {
        vfs::validate(self, plan)
    }

    #[must_use]
    pub fn vfs_simulate(&self, plan: &OrganizePlan) -> Simulation {
        vfs::simulate(self, plan)
    }

    #[must_use]
    pub fn vfs_merged_entries(&self, real: &[FileEntry], current: &Path, sim: &Simulation) -> Vec<GhostFileEntry> {
        crate::vfs::get_merged_entries(real, current, sim)
    }

    #[must_use]
    pub fn vfs_operation_groups(&self, ops: &[PlannedOperation]) -> Vec<OperationGroup> {
        crate::vfs::build_operation_groups(ops)
    }

    /// Edit-time checks against the live disk.
    #[must_use]
    pub fn vfs_validate_edits(&self, ops: &[PlannedOperation]) -> Vec<ValidationIssue> {
        crate::vfs::validate_plan_edits(ops, |p| std::fs::symlink_metadata(p).is_ok())
    }

    /// One level of `folder`.
    ///
    /// # Errors
    /// `Filesystem` when the folder cannot be read.
    pub fn vfs_list_dir(&self, folder: &Path) -> Result<Vec<FileEntry>, ApiError> {
        crate::vfs::scan::list_dir(folder).map_err(|e| ApiError::Filesystem(format!("{}: {e}", folder.display())))
    }

    /// # Errors
    /// `Policy` for protected folders, `Filesystem` when the folder cannot be read.
    pub fn index_folder(&self, folder: &Path, cancel: Option<&CancelToken>) -> Result<IndexReport, ApiError> {
        vfs::index(self, folder, cancel)
    }

    // Quarantine

    /// Move `path` into the quarantine store.
    ///
    /// # Errors
    /// `Precondition` when the item is gone, `Filesystem` when the move fails.
    pub fn quarantine_item(&self, path: &Path) -> Result<QuarantineItem, ApiError> {
        quarantine::put(self, path)
    }

    /// # Errors
    /// `Filesystem` when the store cannot be read.
    pub fn quarantine_list(&self) -> Result<Vec<QuarantineItem>, ApiError> {
        quarantine::list(self)
    }

    // Startup

    /// One-time housekeeping: upgrade history files, rebuild the index, clean journals.
    ///
    /// # Errors
    /// `Filesystem` when the store directories cannot be created or read.
    pub fn run_startup_migration(&self) -> Result<MigrationReport, ApiError> {
        migrate::run(self)
    }
}
