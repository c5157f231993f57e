use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::fs::paths::{is_protected, is_safe_path};
use crate::policy::Policy;
use crate::types::ids::plan_hash;
use crate::types::scope::normalize;
use crate::types::{IssueCode, Operation, OrganizePlan, PlanValidation, PlannedOperation, ValidationIssue};

/// Disk state as seen after the operations walked so far.
#[derive(Default)]
struct Overlay {
    /// `true` for paths the plan creates, `false` for paths it removes.
    state: BTreeMap<PathBuf, bool>,
    /// Moved directories: new location to the location still on disk.
    aliases: BTreeMap<PathBuf, PathBuf>,
}

impl Overlay {
    /// The nearest ancestor the plan touched decides; untouched paths fall through to disk.
    fn exists(&self, p: &Path) -> bool {
        for anc in p.ancestors() {
            let Some(&present) = self.state.get(anc) else {
                continue;
            };
            if !present {
                return false;
            }
            if anc == p {
                return true;
            }
            return self.aliases.get(anc).is_some_and(|orig| {
                let rest = p.strip_prefix(anc).unwrap_or(p);
                std::fs::symlink_metadata(orig.join(rest)).is_ok()
            });
        }
        std::fs::symlink_metadata(p).is_ok()
    }

    fn remove(&mut self, p: &Path) {
        self.state.insert(p.to_path_buf(), false);
        self.aliases.remove(p);
    }

    fn create(&mut self, p: &Path, from: Option<&Path>) {
        self.state.insert(p.to_path_buf(), true);
        match from {
            Some(f) => {
                let orig = self.aliases.get(f).cloned().unwrap_or_else(|| f.to_path_buf());
                self.aliases.insert(p.to_path_buf(), orig);
            }
            None => {
                self.aliases.remove(p);
            }
        }
    }
}

fn issue(code: IssueCode, path: &Path, po: &PlannedOperation, message: String) -> ValidationIssue {
    ValidationIssue {
        code,
        path: path.to_path_buf(),
        op_id: Some(po.op_id.clone()),
        message,
    }
}

/// Paths an operation names inside the target tree. Quarantine targets live elsewhere.
fn named_paths(op: &Operation) -> Vec<PathBuf> {
    let mut out = op.touched_paths();
    if let Operation::Quarantine {
        quarantine_path, ..
    } = op
    {
        out.retain(|p| p != quarantine_path);
    }
    out
}

/// Walk the enabled operations of `plan` against a virtual overlay of the
/// current disk state and collect every problem found.
///
/// Read-only. Issues come back sorted, so the same plan over the same disk
/// always yields the same result.
#[must_use]
pub fn validate_plan(plan: &OrganizePlan, policy: &Policy) -> PlanValidation {
    let target = normalize(&plan.target_folder);
    let disabled_creates: BTreeSet<PathBuf> = plan
        .operations
        .iter()
        .filter(|po| !po.enabled)
        .filter_map(|po| match &po.operation {
            Operation::CreateFolder { path } => Some(normalize(path)),
            _ => None,
        })
        .collect();

    let mut ov = Overlay::default();
    let mut seen_results: BTreeSet<PathBuf> = BTreeSet::new();
    let mut errors = Vec::new();

    for po in plan.enabled() {
        let op = &po.operation;
        let mut bad_path = false;
        for p in named_paths(op) {
            if !p.is_absolute() || !is_safe_path(&p) {
                errors.push(issue(IssueCode::InvalidPath, &p, po, format!("invalid path {}", p.display())));
                bad_path = true;
                continue;
            }
            let n = normalize(&p);
            if is_protected(&n, &policy.scope.protected_roots, &policy.scope.allowed_prefixes) {
                errors.push(issue(IssueCode::ProtectedPath, &p, po, format!("protected path {}", p.display())));
                bad_path = true;
            } else if policy.scope.confine_to_target && !n.starts_with(&target) {
                errors.push(issue(IssueCode::OutsideTarget, &p, po, format!("{} is outside {}", p.display(), target.display())));
                bad_path = true;
            }
        }
        if bad_path {
            continue;
        }

        let source = op.source_path().map(normalize);
        let result = op.result_path().map(|p| normalize(&p));

        if let Some(src) = &source {
            if !ov.exists(src) {
                errors.push(issue(IssueCode::SourceMissing, src, po, format!("{} does not exist", src.display())));
            }
        }
        if let (Some(src), Some(res), Operation::Move { .. } | Operation::Copy { .. }) = (&source, &result, op) {
            if res.starts_with(src) {
                errors.push(issue(IssueCode::Cycle, res, po, format!("cannot put {} inside itself", src.display())));
            }
        }
        if let Some(res) = &result {
            if !seen_results.insert(res.clone()) {
                errors.push(issue(IssueCode::DuplicateDestination, res, po, format!("{} is written by more than one operation", res.display())));
            } else if ov.exists(res) && !matches!(op, Operation::CreateFolder { .. }) {
                errors.push(issue(IssueCode::DestinationExists, res, po, format!("{} already exists", res.display())));
            }
            if let Some(parent) = res.parent() {
                if !ov.exists(parent) {
                    let orphan = matches!(op, Operation::Move { .. } | Operation::Copy { .. });
                    let (code, why) = if orphan && disabled_creates.contains(parent) {
                        (IssueCode::OrphanedMove, "is created by a disabled operation")
                    } else if orphan {
                        (IssueCode::OrphanedMove, "is never created")
                    } else {
                        (IssueCode::ParentMissing, "does not exist")
                    };
                    errors.push(issue(code, parent, po, format!("destination folder {} {why}", parent.display())));
                }
            }
        }

        match op {
            Operation::CreateFolder { .. } | Operation::Copy { .. } => {
                if let Some(res) = &result {
                    let from = match op {
                        Operation::Copy { .. } => source.as_deref(),
                        _ => None,
                    };
                    ov.create(res, from);
                }
            }
            Operation::DeleteFolder { .. } | Operation::Quarantine { .. } => {
                if let Some(src) = &source {
                    ov.remove(src);
                }
            }
            Operation::Move { .. } | Operation::Rename { .. } => {
                if let (Some(src), Some(res)) = (&source, &result) {
                    ov.create(res, Some(src));
                    ov.remove(src);
                }
            }
        }
    }

    errors.sort();
    errors.dedup();
    PlanValidation {
        valid: errors.is_empty(),
        errors,
        plan_hash: plan_hash(plan),
        plan_id: plan.plan_id.clone(),
    }
}
