use serde_json::json;

use super::errors::{ApiError, ErrorId};
use super::Tidyard;
use crate::history::session_from_job;
use crate::logging::{AuditSink, FactsEmitter, StageLogger};
use crate::types::{ConflictResolution, Job, RecoveryResult};
use crate::wal::Replay;

fn replay<E: FactsEmitter, A: AuditSink>(api: &Tidyard<E, A>) -> Replay<'_> {
    Replay {
        journal: &api.journal,
        mutator: api.mutator.as_ref(),
        events: api.events.as_ref(),
        backup_tag: &api.policy.backup.tag,
    }
}

/// Hand a finished job to history: an organize job becomes a session,
/// an undo job flags the session it reverted and every newer one.
fn settle<E: FactsEmitter, A: AuditSink>(api: &Tidyard<E, A>, job: &Job, result: &mut RecoveryResult) {
    let outcome = match &job.undo_of {
        Some(session_id) => api
            .history
            .mark_sessions_undone(&job.target_folder, session_id)
            .map(|_| ()),
        None if job.completed_count > 0 => api.history.archive_session(session_from_job(job)).map(|_| ()),
        None => Ok(()),
    };
    if let Err(e) = outcome {
        log::warn!("resume {}: history update failed: {e}", job.job_id);
        result.errors.push(format!("history update failed: {e}"));
    }
}

pub(crate) fn resume<E: FactsEmitter, A: AuditSink>(
    api: &Tidyard<E, A>,
    job_id: &str,
) -> Result<RecoveryResult, ApiError> {
    let (mut result, job) = replay(api).resume(job_id)?;
    let tctx = api.audit_ctx(job_id, job.plan_id.as_deref().unwrap_or_default());
    let slog = StageLogger::new(&tctx);

    if result.success {
        settle(api, &job, &mut result);
        api.journal.delete(job_id)?;
    }
    let ev = slog
        .resume()
        .path(job.target_folder.display().to_string())
        .merge(&json!({
            "completed": result.completed_count,
            "total": job.entries.len(),
            "undo_of": job.undo_of,
        }));
    if result.success {
        ev.emit_success();
    } else {
        ev.field("errors", json!(result.errors))
            .error_id(ErrorId::E_PRECONDITION)
            .emit_failure();
    }
    Ok(result)
}

pub(crate) fn rollback<E: FactsEmitter, A: AuditSink>(
    api: &Tidyard<E, A>,
    job_id: &str,
    resolution: ConflictResolution,
) -> Result<RecoveryResult, ApiError> {
    let job = api.journal.load(job_id)?;
    let tctx = api.audit_ctx(job_id, job.plan_id.as_deref().unwrap_or_default());
    let slog = StageLogger::new(&tctx);
    let path = job.target_folder.display().to_string();
    slog.rollback()
        .path(path.clone())
        .merge(&json!({
            "resolution": resolution,
            "completed": job.completed_count,
        }))
        .emit_success();

    let result = replay(api).rollback(job_id, resolution)?;
    let ev = slog.rollback_summary().path(path).merge(&json!({
        "reverted": result.completed_count,
        "skipped": result.skipped_count,
        "failed": result.failed_count,
    }));
    if result.success {
        ev.emit_success();
    } else {
        ev.field("errors", json!(result.errors))
            .error_id(ErrorId::E_PRECONDITION)
            .emit_failure();
    }
    Ok(result)
}

pub(crate) fn discard<E: FactsEmitter, A: AuditSink>(api: &Tidyard<E, A>, job_id: &str) -> Result<(), ApiError> {
    replay(api).discard(job_id)?;
    api.audit
        .log(log::Level::Warn, &format!("recovery: discarded job {job_id}; files left as they are"));
    Ok(())
}
