use std::path::Path;

use log::Level;

use super::errors::ApiError;
use super::Tidyard;
use crate::fs::ops::precheck;
use crate::fs::quarantine::{list as list_items, quarantine_path_for, QuarantineItem};
use crate::logging::{AuditSink, FactsEmitter};
use crate::types::Operation;

pub(crate) fn put<E: FactsEmitter, A: AuditSink>(api: &Tidyard<E, A>, path: &Path) -> Result<QuarantineItem, ApiError> {
    let base = &api.store.quarantine_dir;
    std::fs::create_dir_all(base).map_err(|e| ApiError::Filesystem(format!("{}: {e}", base.display())))?;
    let quarantine_path = quarantine_path_for(base, path);
    let op = Operation::Quarantine {
        path: path.to_path_buf(),
        quarantine_path: quarantine_path.clone(),
    };
    precheck(&op)?;
    api.mutator
        .apply(&op)
        .map_err(|e| ApiError::Filesystem(format!("quarantine {}: {e}", path.display())))?;
    api.audit.log(
        Level::Info,
        &format!("quarantine: {} -> {}", path.display(), quarantine_path.display()),
    );
    list_items(base)
        .map_err(|e| ApiError::Filesystem(e.to_string()))?
        .into_iter()
        .find(|i| i.path == quarantine_path)
        .ok_or_else(|| ApiError::Filesystem(format!("quarantined item vanished: {}", quarantine_path.display())))
}

pub(crate) fn list<E: FactsEmitter, A: AuditSink>(api: &Tidyard<E, A>) -> Result<Vec<QuarantineItem>, ApiError> {
    list_items(&api.store.quarantine_dir).map_err(|e| ApiError::Filesystem(e.to_string()))
}
