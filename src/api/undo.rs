//! Undo of archived sessions.
//!
//! Undoing a session also undoes every newer session that is still live,
//! newest first, so later changes to the same paths unwind before the
//! target's own. Preflight is read-only. Execution runs the inverses under
//! one `undo-` WAL job, so a crash mid-undo is offered for recovery like
//! any other job.
use std::path::Path;

use log::Level;
use serde_json::json;
use uuid::Uuid;

use super::commit::canonical_target;
use super::errors::{ApiError, ErrorId};
use super::Tidyard;
use crate::adapters::EngineEvent;
use crate::constants::UNDO_JOB_PREFIX;
use crate::fs::restore::{revert, Pending, ReverseStep, StepOutcome};
use crate::logging::{AuditSink, FactsEmitter, StageLogger};
use crate::types::{
    ChecksumMap, ConflictInfo, ConflictKind, ConflictResolution, EntryStatus, HistoryOperation,
    HistorySession, Job, UndoPreflightResult, UndoResult, WalEntry,
};

fn step_of(op: &HistoryOperation) -> ReverseStep<'_> {
    ReverseStep {
        op_id: &op.id,
        forward: &op.operation,
        inverse: &op.undo_operation,
        result_checksums: &op.result_checksums,
    }
}

/// The target session plus what an undo to it reverts.
struct Chain {
    target: HistorySession,
    /// Live sessions from newest down to the target.
    sessions: usize,
    /// Their operations in revert order: newest session first, each newest operation first.
    ops: Vec<HistoryOperation>,
}

fn collect_ops(sessions: &[HistorySession]) -> (usize, Vec<HistoryOperation>) {
    let mut count = 0;
    let mut ops = Vec::new();
    for session in sessions.iter().filter(|s| !s.undone) {
        count += 1;
        let mut own: Vec<&HistoryOperation> = session.operations.iter().collect();
        own.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        ops.extend(own.into_iter().cloned());
    }
    (count, ops)
}

fn load_chain<E: FactsEmitter, A: AuditSink>(
    api: &Tidyard<E, A>,
    folder: &Path,
    session_id: &str,
) -> Result<Chain, ApiError> {
    let not_found = || ApiError::NotFound(format!("session {session_id} in {}", folder.display()));
    let history = api.history.load(folder)?.ok_or_else(not_found)?;
    let idx = history
        .sessions
        .iter()
        .position(|s| s.session_id == session_id)
        .ok_or_else(not_found)?;
    let (sessions, ops) = collect_ops(&history.sessions[..=idx]);
    let target = history.sessions.into_iter().nth(idx).ok_or_else(not_found)?;
    Ok(Chain {
        target,
        sessions,
        ops,
    })
}

/// Classify the chain in revert order, each step against the disk as the
/// earlier clean steps will have left it.
fn classify_chain(session_id: &str, ops: &[HistoryOperation]) -> UndoPreflightResult {
    let mut out = UndoPreflightResult {
        session_id: session_id.to_string(),
        total_operations: ops.len(),
        ..UndoPreflightResult::default()
    };
    let mut pending = Pending::default();
    for op in ops {
        let step = step_of(op);
        let Some(c) = pending.classify(&step) else {
            out.safe_operations += 1;
            pending.accept(&step);
            continue;
        };
        out.conflicted_operations += 1;
        match c.kind {
            ConflictKind::Modified => out.modified_files.push(c),
            ConflictKind::Missing => out.missing_files.push(c.path),
            ConflictKind::Blocking => out.blocking_files.push(c.path),
        }
    }
    out.can_proceed = out.conflicted_operations == 0;
    out
}

pub(crate) fn preflight<E: FactsEmitter, A: AuditSink>(
    api: &Tidyard<E, A>,
    folder: &Path,
    session_id: &str,
) -> Result<UndoPreflightResult, ApiError> {
    let chain = load_chain(api, folder, session_id)?;
    let result = classify_chain(session_id, &chain.ops);

    if result.conflicted_operations > 0 {
        api.events.emit(&EngineEvent::ConflictDetected {
            session_id: session_id.to_string(),
            conflicts: result.conflicted_operations,
        });
    }
    let tctx = api.audit_ctx(session_id, "");
    StageLogger::new(&tctx)
        .undo_preflight()
        .path(chain.target.target_folder.display().to_string())
        .merge(&json!({
            "sessions": chain.sessions,
            "total": result.total_operations,
            "safe": result.safe_operations,
            "modified": result.modified_files.len(),
            "missing": result.missing_files.len(),
            "blocking": result.blocking_files.len(),
            "conflicts": result.conflict_count(),
            "can_proceed": result.can_proceed,
        }))
        .emit_success();
    Ok(result)
}

/// WAL entries for the inverse pass, in revert order.
fn undo_entries(ops: &[HistoryOperation]) -> Vec<WalEntry> {
    ops.iter()
        .enumerate()
        .map(|(sequence, op)| WalEntry {
            op_id: op.id.clone(),
            sequence,
            operation: op.undo_operation.clone(),
            undo_operation: op.operation.clone(),
            kind: op.kind,
            status: EntryStatus::Pending,
            error: None,
            source_checksums: op.result_checksums.clone(),
            result_checksums: ChecksumMap::new(),
        })
        .collect()
}

/// Close the entry at `idx` with its final status and move on.
fn settle(job: &mut Job, idx: usize, status: EntryStatus, error: Option<String>) {
    let e = &mut job.entries[idx];
    e.status = status;
    e.error = error;
    if status == EntryStatus::Complete {
        e.result_checksums = crate::fs::checksum_many(e.operation.result_path().as_deref());
    }
    job.completed_count = idx + 1;
}

fn describe(c: &ConflictInfo) -> String {
    let kind = match c.kind {
        ConflictKind::Modified => "modified",
        ConflictKind::Missing => "missing",
        ConflictKind::Blocking => "blocking",
    };
    format!("{kind} conflict at {}", c.path.display())
}

pub(crate) fn execute<E: FactsEmitter, A: AuditSink>(
    api: &Tidyard<E, A>,
    folder: &Path,
    session_id: &str,
    resolution: ConflictResolution,
) -> Result<UndoResult, ApiError> {
    let chain = load_chain(api, folder, session_id)?;
    let tctx = api.audit_ctx(session_id, "");
    let slog = StageLogger::new(&tctx);
    let path = chain.target.target_folder.display().to_string();

    if chain.target.undone {
        slog.undo_result()
            .path(path)
            .error_id(ErrorId::E_POLICY)
            .emit_failure();
        return Err(ApiError::AlreadyUndone(session_id.to_string()));
    }

    if resolution == ConflictResolution::Abort {
        let pre = classify_chain(session_id, &chain.ops);
        if !pre.can_proceed {
            let mut errors: Vec<String> = pre.modified_files.iter().map(describe).collect();
            errors.extend(pre.missing_files.iter().map(|p| format!("missing conflict at {}", p.display())));
            errors.extend(pre.blocking_files.iter().map(|p| format!("blocking conflict at {}", p.display())));
            api.events.emit(&EngineEvent::ConflictDetected {
                session_id: session_id.to_string(),
                conflicts: pre.conflicted_operations,
            });
            slog.undo_result()
                .path(path)
                .field("errors", json!(errors))
                .error_id(ErrorId::E_PRECONDITION)
                .emit_failure();
            return Ok(UndoResult {
                success: false,
                errors,
                ..UndoResult::default()
            });
        }
    }

    let canonical = canonical_target(api, folder)?;
    let job_id = format!("{UNDO_JOB_PREFIX}{}", Uuid::new_v4());
    api.journal.open_job_with_id(
        &job_id,
        &canonical,
        &format!("Undo: {}", chain.target.plan_description),
        &chain.target.user_instruction,
        Some(session_id.to_string()),
    )?;
    let mut job = api
        .journal
        .attach_entries(&job_id, undo_entries(&chain.ops), None, "")?;
    api.audit.log(
        Level::Info,
        &format!(
            "undo: reverting {} operation(s) across {} session(s) down to {session_id} as {job_id}",
            job.entries.len(),
            chain.sessions
        ),
    );

    let total = job.entries.len();
    let mut result = UndoResult::default();
    for (idx, op) in chain.ops.iter().enumerate() {
        let sums = job.entries[idx].source_checksums.clone();
        job.begin_entry(&op.id, sums).map_err(ApiError::Protocol)?;
        api.journal.store(&mut job)?;

        let r = revert(&step_of(op), resolution, api.mutator.as_ref(), &api.policy.backup.tag);
        if let Some(b) = r.backup {
            result.backups.push(b);
        }
        match r.outcome {
            StepOutcome::Undone => {
                result.operations_undone += 1;
                settle(&mut job, idx, EntryStatus::Complete, None);
            }
            StepOutcome::Skipped(c) => {
                result.operations_skipped += 1;
                settle(&mut job, idx, EntryStatus::Complete, Some(format!("skipped: {}", describe(&c))));
            }
            StepOutcome::Failed(msg) if resolution == ConflictResolution::Abort => {
                // Kept in the journal; a successful wal_resume_job flags the sessions.
                log::warn!("undo {session_id}: {}: {msg}", op.id);
                job.fail_entry(&op.id, &msg).map_err(ApiError::Protocol)?;
                api.journal.store(&mut job)?;
                result.errors.push(msg);
                result.interrupted_job = Some(job_id.clone());
                break;
            }
            StepOutcome::Failed(msg) => {
                log::warn!("undo {session_id}: {}: {msg}", op.id);
                settle(&mut job, idx, EntryStatus::Failed, Some(msg.clone()));
                result.errors.push(msg);
            }
        }
        api.journal.store(&mut job)?;
        api.events.emit(&EngineEvent::UndoProgress {
            session_id: session_id.to_string(),
            completed: idx + 1,
            total,
        });
    }

    if result.interrupted_job.is_none() {
        if result.operations_undone > 0 {
            match api.history.mark_sessions_undone(folder, session_id) {
                Ok(n) => result.sessions_undone = n,
                Err(e) => result.errors.push(format!("history update failed: {e}")),
            }
        }
        api.journal.delete(&job_id)?;
    }
    result.success = result.errors.is_empty();

    let ev = slog.undo_result().path(path).merge(&json!({
        "resolution": resolution,
        "sessions": result.sessions_undone,
        "undone": result.operations_undone,
        "skipped": result.operations_skipped,
        "backups": result.backups.len(),
        "interrupted_job": result.interrupted_job,
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
