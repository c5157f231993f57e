use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::types::scope::normalize;
use crate::types::{IssueCode, Operation, OperationGroup, PlannedOperation, ValidationIssue};

/// Folder an operation writes into.
fn destination_folder(op: &Operation) -> Option<PathBuf> {
    match op {
        Operation::CreateFolder { path } => Some(normalize(path)),
        Operation::Quarantine {
            quarantine_path, ..
        } => quarantine_path.parent().map(normalize),
        Operation::DeleteFolder { path } => path.parent().map(normalize),
        _ => op
            .result_path()
            .and_then(|r| r.parent().map(normalize)),
    }
}

fn display_name(folder: &Path) -> String {
    folder
        .file_name()
        .map_or_else(|| folder.display().to_string(), |n| n.to_string_lossy().into_owned())
}

/// Group operations by the folder they write into, for review.
///
/// Groups that create their folder come first, then larger groups, then by
/// name and folder path. Operation ids keep their input order.
#[must_use]
pub fn build_operation_groups(ops: &[PlannedOperation]) -> Vec<OperationGroup> {
    let mut by_folder: BTreeMap<PathBuf, OperationGroup> = BTreeMap::new();
    for po in ops {
        let Some(folder) = destination_folder(&po.operation) else {
            continue;
        };
        let g = by_folder.entry(folder.clone()).or_insert_with(|| OperationGroup {
            name: display_name(&folder),
            folder,
            has_create: false,
            op_ids: Vec::new(),
            total_count: 0,
        });
        if matches!(po.operation, Operation::CreateFolder { .. }) {
            g.has_create = true;
        }
        g.op_ids.push(po.op_id.clone());
        g.total_count += 1;
    }
    let mut groups: Vec<OperationGroup> = by_folder.into_values().collect();
    groups.sort_by(|a, b| {
        b.has_create
            .cmp(&a.has_create)
            .then_with(|| b.total_count.cmp(&a.total_count))
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.folder.cmp(&b.folder))
    });
    groups
}

fn issue(code: IssueCode, path: &Path, op_id: &str, message: String) -> ValidationIssue {
    ValidationIssue {
        code,
        path: path.to_path_buf(),
        op_id: Some(op_id.to_string()),
        message,
    }
}

/// Check an edited operation list without walking it in order.
///
/// Reports sources that neither exist nor are produced by another enabled
/// operation, moves into folders nothing creates, and destinations written
/// twice. The result is sorted, so any ordering of the same operations
/// yields the same issues.
#[must_use]
pub fn validate_plan_edits<F>(ops: &[PlannedOperation], exists: F) -> Vec<ValidationIssue>
where
    F: Fn(&Path) -> bool,
{
    let enabled: Vec<&PlannedOperation> = ops.iter().filter(|p| p.enabled).collect();
    let produced: BTreeSet<PathBuf> = enabled
        .iter()
        .filter_map(|p| p.operation.result_path().map(|r| normalize(&r)))
        .collect();
    let created: BTreeSet<PathBuf> = enabled
        .iter()
        .filter_map(|p| match &p.operation {
            Operation::CreateFolder { path } => Some(normalize(path)),
            _ => None,
        })
        .collect();
    let present = |p: &Path| exists(p) || produced.contains(p) || created.contains(p);

    let mut writers: BTreeMap<PathBuf, Vec<&str>> = BTreeMap::new();
    let mut out = Vec::new();
    for po in &enabled {
        let op = &po.operation;
        if let Some(src) = op.source_path().map(normalize) {
            if !present(&src) {
                out.push(issue(IssueCode::SourceMissing, &src, &po.op_id, format!("{} does not exist", src.display())));
            }
        }
        let Some(res) = op.result_path().map(|r| normalize(&r)) else {
            continue;
        };
        if matches!(op, Operation::Move { .. } | Operation::Copy { .. }) {
            if let Some(parent) = res.parent() {
                if !present(parent) {
                    out.push(issue(
                        IssueCode::OrphanedMove,
                        parent,
                        &po.op_id,
                        format!("destination folder {} is never created", parent.display()),
                    ));
                }
            }
        }
        writers.entry(res).or_default().push(&po.op_id);
    }
    for (path, ids) in writers {
        if ids.len() > 1 {
            for id in ids {
                out.push(issue(
                    IssueCode::DuplicateDestination,
                    &path,
                    id,
                    format!("{} is written by more than one operation", path.display()),
                ));
            }
        }
    }
    out.sort();
    out.dedup();
    out
}
