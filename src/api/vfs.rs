use std::path::Path;

use serde_json::json;

use super::commit::canonical_target;
use super::errors::ApiError;
use super::Tidyard;
use crate::adapters::CancelToken;
use crate::logging::{AuditSink, FactsEmitter, StageLogger};
use crate::types::{IndexReport, OrganizePlan, PlanValidation, Simulation};

pub(crate) fn validate<E: FactsEmitter, A: AuditSink>(api: &Tidyard<E, A>, plan: &OrganizePlan) -> PlanValidation {
    let v = crate::vfs::validate_plan(plan, &api.policy);
    let tctx = api.audit_ctx("", &plan.plan_id);
    let ev = StageLogger::new(&tctx)
        .plan()
        .path(plan.target_folder.display().to_string())
        .merge(&json!({
            "operations": plan.enabled_count(),
            "plan_hash": v.plan_hash,
            "errors": v.errors.len(),
        }));
    if v.valid {
        ev.emit_success();
    } else {
        ev.emit_warn();
    }
    v
}

pub(crate) fn simulate<E: FactsEmitter, A: AuditSink>(api: &Tidyard<E, A>, plan: &OrganizePlan) -> Simulation {
    let sim = crate::vfs::apply_plan(plan);
    let tctx = api.audit_ctx("", &plan.plan_id);
    StageLogger::new(&tctx)
        .simulate()
        .path(plan.target_folder.display().to_string())
        .merge(&json!({
            "virtual": sim.virtual_entries.len(),
            "moved": sim.moved_entries.len(),
            "trashed": sim.trashed_paths.len(),
            "removed": sim.removed_paths.len(),
        }))
        .emit_success();
    sim
}

pub(crate) fn index<E: FactsEmitter, A: AuditSink>(
    api: &Tidyard<E, A>,
    folder: &Path,
    cancel: Option<&CancelToken>,
) -> Result<IndexReport, ApiError> {
    let canonical = canonical_target(api, folder)?;
    crate::vfs::scan::index_tree(&canonical, api.events.as_ref(), cancel)
        .map_err(|e| ApiError::Filesystem(format!("{}: {e}", canonical.display())))
}
