//! Shape checks for plans and choices arriving from a host as JSON.
//!
//! Parsing rejects unknown fields; the checks after parsing catch what serde
//! cannot express. Everything maps to `ApiError::Protocol`.
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use uuid::Uuid;

use super::errors::ApiError;
use crate::fs::ops::valid_name;
use crate::fs::paths::is_safe_path;
use crate::types::ids;
use crate::types::{ConflictResolution, EntryKind, Operation, OrganizePlan, PlannedOperation};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct PlanRequest {
    #[serde(default)]
    plan_id: Option<String>,
    target_folder: PathBuf,
    #[serde(default)]
    description: String,
    operations: Vec<OperationRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct OperationRequest {
    #[serde(default)]
    op_id: Option<String>,
    operation: Operation,
    #[serde(default)]
    kind: Option<EntryKind>,
    #[serde(default)]
    enabled: Option<bool>,
}

fn protocol(msg: impl Into<String>) -> ApiError {
    ApiError::Protocol(msg.into())
}

fn check_path(p: &Path) -> Result<(), ApiError> {
    if !p.is_absolute() {
        return Err(protocol(format!("path must be absolute: {}", p.display())));
    }
    if !is_safe_path(p) {
        return Err(protocol(format!("path must not contain '..': {}", p.display())));
    }
    if p.parent().is_none() {
        return Err(protocol("operations cannot target the filesystem root"));
    }
    Ok(())
}

fn check_operation(op: &Operation) -> Result<(), ApiError> {
    if let Operation::Rename { new_name, .. } = op {
        if !valid_name(new_name) {
            return Err(protocol(format!("invalid new name: {new_name:?}")));
        }
    }
    for p in op.touched_paths() {
        check_path(&p)?;
    }
    Ok(())
}

/// Parse a plan payload.
///
/// Missing ids are derived from content the same way `OrganizePlan::new` does.
///
/// # Errors
/// `Protocol` for malformed JSON, unknown fields, relative or traversing
/// paths, bad rename targets and duplicate operation ids.
pub fn parse_plan(json: &str) -> Result<OrganizePlan, ApiError> {
    let req: PlanRequest = serde_json::from_str(json).map_err(|e| protocol(format!("plan: {e}")))?;
    check_path(&req.target_folder)?;

    let ops: Vec<Operation> = req.operations.iter().map(|o| o.operation.clone()).collect();
    let derived = ids::plan_id(&req.target_folder, &ops);
    let plan_id = match req.plan_id {
        Some(id) if id.trim().is_empty() => return Err(protocol("planId must not be empty")),
        Some(id) => id,
        None => derived.to_string(),
    };
    let id_ns = Uuid::parse_str(&plan_id).unwrap_or(derived);

    let mut seen = HashSet::new();
    let mut operations = Vec::with_capacity(req.operations.len());
    for (idx, o) in req.operations.into_iter().enumerate() {
        check_operation(&o.operation)?;
        let op_id = match o.op_id {
            Some(id) if id.trim().is_empty() => {
                return Err(protocol(format!("operation {idx}: opId must not be empty")));
            }
            Some(id) => id,
            None => ids::operation_id(&id_ns, &o.operation, idx).to_string(),
        };
        if !seen.insert(op_id.clone()) {
            return Err(protocol(format!("duplicate opId {op_id}")));
        }
        operations.push(PlannedOperation {
            op_id,
            operation: o.operation,
            kind: o.kind,
            enabled: o.enabled.unwrap_or(true),
        });
    }

    Ok(OrganizePlan {
        plan_id,
        target_folder: req.target_folder,
        description: req.description,
        operations,
    })
}

/// Parse a conflict resolution name (`abort`, `skip`, `force`, `backup`).
///
/// # Errors
/// `Protocol` for anything else.
pub fn parse_resolution(s: &str) -> Result<ConflictResolution, ApiError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "abort" => Ok(ConflictResolution::Abort),
        "skip" => Ok(ConflictResolution::Skip),
        "force" => Ok(ConflictResolution::Force),
        "backup" => Ok(ConflictResolution::Backup),
        other => Err(protocol(format!("unknown resolution {other:?}"))),
    }
}
