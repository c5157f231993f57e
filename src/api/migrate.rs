use log::Level;
use serde_json::json;

use super::errors::ApiError;
use super::Tidyard;
use crate::fs::atomic::cleanup_stale_tmp;
use crate::logging::{AuditSink, FactsEmitter, StageLogger};
use crate::types::MigrationReport;

pub(crate) fn run<E: FactsEmitter, A: AuditSink>(api: &Tidyard<E, A>) -> Result<MigrationReport, ApiError> {
    api.store.ensure()?;
    let tctx = api.audit_ctx("", "");
    let slog = StageLogger::new(&tctx);

    let upgraded = match api.history.migrate() {
        Ok(n) => n,
        Err(e) => {
            let e = ApiError::from(e);
            slog.migration().error_id(e.id()).field("error", json!(e.to_string())).emit_failure();
            return Err(e);
        }
    };
    let (wal_tmp, corrupt) = api.journal.sweep();
    let history_tmp = cleanup_stale_tmp(api.history.dir());
    let report = MigrationReport {
        history_files_upgraded: upgraded,
        index_rebuilt: true,
        stale_temp_files_removed: wal_tmp + history_tmp,
        corrupt_journals_quarantined: corrupt,
    };
    if corrupt > 0 {
        api.audit.log(
            Level::Warn,
            &format!("migration: set aside {corrupt} unreadable journal record(s)"),
        );
    }
    slog.migration()
        .path(api.store.root.display().to_string())
        .merge(&json!({
            "history_files_upgraded": report.history_files_upgraded,
            "stale_temp_files_removed": report.stale_temp_files_removed,
            "corrupt_journals": report.corrupt_journals_quarantined,
        }))
        .emit_success();
    Ok(report)
}
