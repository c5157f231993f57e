use std::path::Path;

use log::Level;

use super::errors::ApiError;
use super::Tidyard;
use crate::logging::{AuditSink, FactsEmitter, StageLogger};

pub(crate) fn delete<E: FactsEmitter, A: AuditSink>(api: &Tidyard<E, A>, folder: &Path) -> Result<(), ApiError> {
    let tctx = api.audit_ctx("", "");
    let slog = StageLogger::new(&tctx);
    let path = folder.display().to_string();
    match api.history.delete_history(folder) {
        Ok(()) => {
            slog.history().path(path).field("action", "delete".into()).emit_success();
            api.audit
                .log(Level::Info, &format!("history: cleared {}", folder.display()));
            Ok(())
        }
        Err(e) => {
            let e = ApiError::from(e);
            slog.history()
                .path(path)
                .field("action", "delete".into())
                .error_id(e.id())
                .emit_failure();
            Err(e)
        }
    }
}
