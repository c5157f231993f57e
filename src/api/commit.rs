//! Commit stage: run a plan's operations one at a time under a WAL job.
//!
//! Side-effects:
//! - Emits `commit.attempt`, one `commit.result` per operation, and `commit.summary`.
//! - A failure stops the loop and leaves the job interrupted for resume or rollback.
//! - A finished job is archived to history and removed from the WAL.
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::Level;
use serde_json::json;
use time::OffsetDateTime;
use uuid::Uuid;

use super::errors::{id_str, infer_summary_error_ids, ApiError, ErrorId};
use super::Tidyard;
use crate::adapters::CancelToken;
use crate::constants::{LOCAL_JOB_PREFIX, WAL_SCHEMA_VERSION};
use crate::fs::paths::{is_protected, validate_folder};
use crate::history::session_from_job;
use crate::logging::{AuditSink, FactsEmitter, StageLogger};
use crate::types::ids::plan_hash;
use crate::types::scope::normalize;
use crate::types::{CommitReport, Job, JobHandle, JobStatus, OrganizePlan};
use crate::wal::{plan_entries, Replay};

pub(super) fn canonical_target<E: FactsEmitter, A: AuditSink>(api: &Tidyard<E, A>, target: &Path) -> Result<PathBuf, ApiError> {
    let scope = &api.policy.scope;
    Ok(validate_folder(target, &scope.protected_roots, &scope.allowed_prefixes)?)
}

pub(crate) fn start_job<E: FactsEmitter, A: AuditSink>(
    api: &Tidyard<E, A>,
    target: &Path,
    description: &str,
    instruction: &str,
) -> Result<JobHandle, ApiError> {
    let canonical = canonical_target(api, target)?;
    let job = api.journal.open_job(&canonical, description, instruction)?;
    api.audit
        .log(Level::Info, &format!("organize: opened job {} for {}", job.job_id, canonical.display()));
    Ok(JobHandle {
        job_id: job.job_id,
        durable: true,
        instruction: instruction.to_string(),
    })
}

pub(crate) fn start_job_or_local<E: FactsEmitter, A: AuditSink>(
    api: &Tidyard<E, A>,
    target: &Path,
    description: &str,
    instruction: &str,
) -> Result<JobHandle, ApiError> {
    match start_job(api, target, description, instruction) {
        Err(ApiError::Durability(msg)) if api.policy.governance.allow_local_fallback => {
            let job_id = format!("{LOCAL_JOB_PREFIX}{}", Uuid::new_v4());
            api.audit.log(
                Level::Warn,
                &format!("organize: journal unavailable ({msg}); running {job_id} without crash recovery"),
            );
            Ok(JobHandle {
                job_id,
                durable: false,
                instruction: instruction.to_string(),
            })
        }
        other => other,
    }
}

/// Every path the plan names must stay inside the target folder and off protected roots.
fn check_scope<E: FactsEmitter, A: AuditSink>(
    api: &Tidyard<E, A>,
    plan: &OrganizePlan,
    canonical: &Path,
) -> Result<(), ApiError> {
    let scope = &api.policy.scope;
    let declared = normalize(&plan.target_folder);
    for po in plan.enabled() {
        for p in po.operation.touched_paths() {
            let n = normalize(&p);
            if is_protected(&n, &scope.protected_roots, &scope.allowed_prefixes) {
                return Err(ApiError::Policy(format!("protected path: {}", p.display())));
            }
            let quarantine_target = matches!(
                &po.operation,
                crate::types::Operation::Quarantine { quarantine_path, .. } if *quarantine_path == p
            );
            if scope.confine_to_target
                && !quarantine_target
                && !(n.starts_with(&declared) || n.starts_with(canonical))
            {
                return Err(ApiError::Policy(format!(
                    "{} is outside {}",
                    p.display(),
                    declared.display()
                )));
            }
        }
    }
    Ok(())
}

fn local_job(handle: &JobHandle, plan: &OrganizePlan) -> Result<Job, ApiError> {
    let now = OffsetDateTime::now_utc();
    Ok(Job {
        version: WAL_SCHEMA_VERSION,
        job_id: handle.job_id.clone(),
        target_folder: normalize(&plan.target_folder),
        started_at: now,
        updated_at: now,
        status: JobStatus::Pending,
        plan_id: Some(plan.plan_id.clone()),
        description: plan.description.clone(),
        instruction: handle.instruction.clone(),
        undo_of: None,
        entries: plan_entries(plan)?,
        completed_count: 0,
    })
}

/// Close a durable job that never started executing.
fn abandon<E: FactsEmitter, A: AuditSink>(api: &Tidyard<E, A>, handle: &JobHandle) {
    if handle.durable {
        if let Err(e) = api.journal.delete(&handle.job_id) {
            log::warn!("organize: could not close job {}: {e}", handle.job_id);
        }
    }
}

pub(crate) fn run<E: FactsEmitter, A: AuditSink>(
    api: &Tidyard<E, A>,
    handle: &JobHandle,
    plan: &OrganizePlan,
    expected_hash: Option<&str>,
    cancel: Option<&CancelToken>,
) -> Result<CommitReport, ApiError> {
    let t0 = Instant::now();
    let tctx = api.audit_ctx(&handle.job_id, &plan.plan_id);
    let slog = StageLogger::new(&tctx);
    let target = plan.target_folder.display().to_string();

    let actual = plan_hash(plan);
    if let Some(expected) = expected_hash {
        if expected != actual {
            slog.commit_attempt()
                .path(target)
                .error_id(ErrorId::E_STALE_PLAN)
                .emit_failure();
            abandon(api, handle);
            return Err(ApiError::StalePlan {
                expected: expected.to_string(),
                actual,
            });
        }
    }

    let canonical = match canonical_target(api, &plan.target_folder)
        .and_then(|c| check_scope(api, plan, &c).map(|()| c))
    {
        Ok(c) => c,
        Err(e) => {
            slog.commit_attempt()
                .path(target)
                .field("error", json!(e.to_string()))
                .error_id(e.id())
                .emit_failure();
            abandon(api, handle);
            return Err(e);
        }
    };

    let mut job = if handle.durable {
        api.journal.attach_plan(&handle.job_id, plan)?
    } else {
        local_job(handle, plan)?
    };
    slog.commit_attempt()
        .path(canonical.display().to_string())
        .merge(&json!({
            "durable": handle.durable,
            "operations": job.entries.len(),
            "plan_hash": actual,
        }))
        .emit_success();
    api.audit.log(
        Level::Info,
        &format!("commit: {} operation(s) in {}", job.entries.len(), canonical.display()),
    );

    let replay = Replay {
        journal: &api.journal,
        mutator: api.mutator.as_ref(),
        events: api.events.as_ref(),
        backup_tag: &api.policy.backup.tag,
    };
    let out = replay.run(&mut job, handle.durable, cancel)?;

    for op_id in &out.executed {
        slog.commit_result().op(op_id.as_str()).emit_success();
    }
    let mut report = CommitReport {
        job_id: handle.job_id.clone(),
        plan_id: plan.plan_id.clone(),
        durable: handle.durable,
        executed: out.executed.clone(),
        failed: out.failed.clone(),
        cancelled: out.cancelled,
        session_id: None,
        duration_ms: 0,
        errors: Vec::new(),
    };
    if let Some(f) = &out.failed {
        slog.commit_result()
            .op(f.op_id.as_str())
            .field("error", json!(f.error))
            .error_id(ErrorId::E_PRECONDITION)
            .emit_failure();
        report.errors.push(f.error.clone());
    }

    if out.finished() {
        if job.completed_count > 0 {
            match api.history.archive_session(session_from_job(&job)) {
                Ok(id) => report.session_id = Some(id),
                Err(e) => {
                    log::warn!("commit: archiving {} failed: {e}", job.job_id);
                    report.errors.push(format!("history archive failed: {e}"));
                }
            }
        }
        if handle.durable {
            api.journal.delete(&handle.job_id)?;
        }
    } else if !handle.durable {
        api.audit.log(
            Level::Warn,
            &format!("commit: {} stopped without a journal; changes so far cannot be resumed", handle.job_id),
        );
    }

    report.duration_ms = u64::try_from(t0.elapsed().as_millis()).unwrap_or(u64::MAX);
    let summary = slog.commit_summary().path(canonical.display().to_string()).merge(&json!({
        "executed": report.executed.len(),
        "total": job.entries.len(),
        "cancelled": report.cancelled,
        "duration_ms": report.duration_ms,
    }));
    if report.success() {
        summary.emit_success();
    } else {
        let ids = infer_summary_error_ids(&report.errors);
        let primary = if report.cancelled && report.errors.is_empty() {
            id_str(ErrorId::E_GENERIC)
        } else {
            ids.first().copied().unwrap_or(id_str(ErrorId::E_GENERIC))
        };
        summary
            .field("error_id", json!(primary))
            .field("summary_error_ids", json!(ids))
            .emit_failure();
    }
    Ok(report)
}
