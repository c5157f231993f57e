use std::path::{Path, PathBuf};

use time::OffsetDateTime;
use uuid::Uuid;

use super::{Result, WalError};
use crate::adapters::{FileLockManager, LockManager};
use crate::constants::{DEFAULT_LOCK_TIMEOUT_MS, WAL_FILE_SUFFIX, WAL_LOCK_FILE, WAL_SCHEMA_VERSION};
use crate::fs::atomic::{cleanup_stale_tmp, read_json, remove_durable, write_json_durable};
use crate::types::scope::{normalize, overlaps};
use crate::types::{
    ChecksumMap, EntryStatus, Job, JobStatus, OrganizePlan, RecoveryInfo, WalEntry,
};

/// Job records in one directory.
pub struct Journal {
    dir: PathBuf,
    lock: Box<dyn LockManager>,
    lock_timeout_ms: u64,
    sync: bool,
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("dir", &self.dir)
            .field("lock_timeout_ms", &self.lock_timeout_ms)
            .field("sync", &self.sync)
            .finish_non_exhaustive()
    }
}

fn io_err(e: &std::io::Error) -> WalError {
    WalError::Durability(e.to_string())
}

/// Journal entries for the enabled operations of `plan`, with their inverses.
///
/// # Errors
/// `Invalid` when an operation has no inverse.
pub fn plan_entries(plan: &OrganizePlan) -> Result<Vec<WalEntry>> {
    plan.enabled()
        .enumerate()
        .map(|(sequence, po)| {
            let undo_operation = po
                .operation
                .inverse()
                .map_err(|e| WalError::Invalid(e.msg))?;
            Ok(WalEntry {
                op_id: po.op_id.clone(),
                sequence,
                operation: po.operation.clone(),
                undo_operation,
                kind: po.kind,
                status: EntryStatus::Pending,
                error: None,
                source_checksums: ChecksumMap::new(),
                result_checksums: ChecksumMap::new(),
            })
        })
        .collect()
}

impl Journal {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let lock = Box::new(FileLockManager::new(dir.join(WAL_LOCK_FILE)));
        Self {
            dir,
            lock,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            sync: true,
        }
    }

    #[must_use]
    pub fn with_lock_manager(mut self, lock: Box<dyn LockManager>) -> Self {
        self.lock = lock;
        self
    }

    #[must_use]
    pub fn with_lock_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self
    }

    #[must_use]
    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, job_id: &str) -> Result<PathBuf> {
        let ok = !job_id.is_empty()
            && job_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !ok {
            return Err(WalError::Invalid(format!("bad job id: {job_id:?}")));
        }
        Ok(self.dir.join(format!("{job_id}{WAL_FILE_SUFFIX}")))
    }

    fn save(&self, job: &Job) -> Result<()> {
        let path = self.path_for(&job.job_id)?;
        write_json_durable(&path, job, self.sync).map_err(|e| io_err(&e))
    }

    /// Load one job record.
    ///
    /// # Errors
    /// `NotFound` when no record exists, `Corrupt` when it does not parse.
    pub fn load(&self, job_id: &str) -> Result<Job> {
        let path = self.path_for(job_id)?;
        match read_json::<Job>(&path) {
            Ok(Some(job)) => Ok(job),
            Ok(None) => Err(WalError::NotFound(job_id.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => Err(WalError::Corrupt {
                job_id: job_id.to_string(),
                msg: e.to_string(),
            }),
            Err(e) => Err(io_err(&e)),
        }
    }

    /// Create a durable job for `target`.
    ///
    /// # Errors
    /// `ConcurrentJob` when an open job's folder overlaps `target`;
    /// `Durability` when the record cannot be written.
    pub fn open_job(&self, target: &Path, description: &str, instruction: &str) -> Result<Job> {
        self.open_job_with_id(&Uuid::new_v4().to_string(), target, description, instruction, None)
    }

    /// Like `open_job` with a caller-chosen id; `undo_of` marks undo jobs.
    ///
    /// # Errors
    /// See [`Journal::open_job`]; also `Invalid` for a relative target.
    pub fn open_job_with_id(
        &self,
        job_id: &str,
        target: &Path,
        description: &str,
        instruction: &str,
        undo_of: Option<String>,
    ) -> Result<Job> {
        if !target.is_absolute() {
            return Err(WalError::Invalid(format!(
                "target must be absolute: {}",
                target.display()
            )));
        }
        let target = normalize(target);
        std::fs::create_dir_all(&self.dir).map_err(|e| io_err(&e))?;
        let guard = self
            .lock
            .lock_wal(self.lock_timeout_ms)
            .map_err(|e| WalError::Locking(e.msg))?;
        log::trace!("wal: lock granted after {:?}", guard.waited());

        for job in self.list_jobs()? {
            if job.is_open() && overlaps(&job.target_folder, &target) {
                return Err(WalError::ConcurrentJob {
                    job_id: job.job_id,
                    folder: job.target_folder.display().to_string(),
                });
            }
        }
        if self.path_for(job_id)?.exists() {
            return Err(WalError::Invalid(format!("job id already used: {job_id}")));
        }

        let now = OffsetDateTime::now_utc();
        let job = Job {
            version: WAL_SCHEMA_VERSION,
            job_id: job_id.to_string(),
            target_folder: target,
            started_at: now,
            updated_at: now,
            status: JobStatus::Pending,
            plan_id: None,
            description: description.to_string(),
            instruction: instruction.to_string(),
            undo_of,
            entries: Vec::new(),
            completed_count: 0,
        };
        self.save(&job)?;
        log::debug!("wal: opened job {} for {}", job.job_id, job.target_folder.display());
        Ok(job)
    }

    fn update<F>(&self, job_id: &str, f: F) -> Result<Job>
    where
        F: FnOnce(&mut Job) -> Result<()>,
    {
        let mut job = self.load(job_id)?;
        f(&mut job)?;
        job.updated_at = OffsetDateTime::now_utc();
        self.save(&job)?;
        Ok(job)
    }

    /// Record the enabled operations of `plan` with their inverses.
    ///
    /// # Errors
    /// `Invalid` when the job already has entries or an operation has no inverse.
    pub fn attach_plan(&self, job_id: &str, plan: &OrganizePlan) -> Result<Job> {
        let entries = plan_entries(plan)?;
        self.attach_entries(job_id, entries, Some(plan.plan_id.clone()), &plan.description)
    }

    /// Record prepared entries. Used by `attach_plan` and by undo.
    ///
    /// # Errors
    /// `Invalid` when the job already has entries.
    pub fn attach_entries(
        &self,
        job_id: &str,
        entries: Vec<WalEntry>,
        plan_id: Option<String>,
        description: &str,
    ) -> Result<Job> {
        self.update(job_id, |job| {
            if !job.entries.is_empty() {
                return Err(WalError::Invalid(format!("job {job_id} already has a plan")));
            }
            job.entries = entries;
            job.plan_id = plan_id;
            if job.description.is_empty() {
                job.description = description.to_string();
            }
            job.status = JobStatus::Executing;
            Ok(())
        })
    }

    /// Mark the next entry as running and store its pre-mutation checksums.
    ///
    /// # Errors
    /// `Invalid` when `op_id` is not the next pending entry.
    pub fn mark_in_progress(
        &self,
        job_id: &str,
        op_id: &str,
        source_checksums: ChecksumMap,
    ) -> Result<Job> {
        self.update(job_id, |job| {
            job.begin_entry(op_id, source_checksums)
                .map_err(WalError::Invalid)
        })
    }

    /// Mark the next entry complete. Durable before returning.
    ///
    /// # Errors
    /// `Invalid` when `op_id` is not the next pending entry.
    pub fn append_completed(
        &self,
        job_id: &str,
        op_id: &str,
        source_checksums: ChecksumMap,
        result_checksums: ChecksumMap,
    ) -> Result<Job> {
        self.update(job_id, |job| {
            job.complete_entry(op_id, source_checksums, result_checksums)
                .map_err(WalError::Invalid)
        })
    }

    /// Record a failure against an entry and mark the job interrupted.
    ///
    /// # Errors
    /// `Invalid` when the job has no entry `op_id`.
    pub fn mark_failed(&self, job_id: &str, op_id: &str, error: &str) -> Result<Job> {
        self.update(job_id, |job| job.fail_entry(op_id, error).map_err(WalError::Invalid))
    }

    /// # Errors
    /// `NotFound` or `Durability`.
    pub fn mark_interrupted(&self, job_id: &str) -> Result<Job> {
        self.update(job_id, |job| {
            job.status = JobStatus::Interrupted;
            Ok(())
        })
    }

    /// # Errors
    /// `NotFound` or `Durability`.
    pub fn mark_complete(&self, job_id: &str) -> Result<Job> {
        self.update(job_id, |job| {
            job.status = JobStatus::Complete;
            Ok(())
        })
    }

    /// Persist a job that was modified in memory (used by recovery).
    ///
    /// # Errors
    /// `Durability` when the write fails.
    pub fn store(&self, job: &mut Job) -> Result<()> {
        job.updated_at = OffsetDateTime::now_utc();
        self.save(job)
    }

    /// All readable job records, oldest first. Corrupt records are skipped.
    ///
    /// # Errors
    /// `Durability` when the directory cannot be read.
    pub fn list_jobs(&self) -> Result<Vec<Job>> {
        let rd = match std::fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(&e)),
        };
        let mut jobs = Vec::new();
        for entry in rd.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(job_id) = name.strip_suffix(WAL_FILE_SUFFIX) else {
                continue;
            };
            if job_id.starts_with('.') {
                continue;
            }
            match self.load(job_id) {
                Ok(job) => jobs.push(job),
                Err(e) => log::warn!("wal: skipping unreadable job {job_id}: {e}"),
            }
        }
        jobs.sort_by(|a, b| {
            a.started_at
                .cmp(&b.started_at)
                .then_with(|| a.job_id.cmp(&b.job_id))
        });
        Ok(jobs)
    }

    /// The oldest job that did not complete, if any.
    ///
    /// # Errors
    /// `Durability` when the directory cannot be read.
    pub fn check_recovery(&self) -> Result<Option<RecoveryInfo>> {
        Ok(self
            .list_jobs()?
            .iter()
            .find(|j| j.is_open())
            .map(RecoveryInfo::from))
    }

    /// Remove a job record.
    ///
    /// # Errors
    /// `Durability` when the unlink or directory fsync fails.
    pub fn delete(&self, job_id: &str) -> Result<()> {
        let path = self.path_for(job_id)?;
        remove_durable(&path, self.sync).map_err(|e| io_err(&e))?;
        log::debug!("wal: deleted job {job_id}");
        Ok(())
    }

    /// Remove temp leftovers and set aside records that no longer parse.
    /// Returns `(temp files removed, corrupt records moved)`.
    pub fn sweep(&self) -> (usize, usize) {
        let removed = cleanup_stale_tmp(&self.dir);
        let mut corrupt = 0;
        if let Ok(rd) = std::fs::read_dir(&self.dir) {
            for entry in rd.flatten() {
                let name = entry.file_name().to_string_lossy().to_string();
                let Some(job_id) = name.strip_suffix(WAL_FILE_SUFFIX) else {
                    continue;
                };
                if let Err(WalError::Corrupt { .. }) = self.load(job_id) {
                    let aside = self.dir.join(format!("{name}.corrupt"));
                    if std::fs::rename(entry.path(), &aside).is_ok() {
                        log::warn!("wal: moved corrupt record to {}", aside.display());
                        corrupt += 1;
                    }
                }
            }
        }
        (removed, corrupt)
    }
}
