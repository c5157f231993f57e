//! Reverse steps: classify and apply the inverse of an executed operation.
//!
//! Shared by history undo and WAL rollback. Classification is read-only and
//! yields at most one conflict per step, with precedence
//! `missing > modified > blocking`. `Pending` classifies a chain of steps
//! that depend on each other, such as stacked sessions undone together.
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::adapters::Mutator;
use crate::fs::backup::move_aside;
use crate::fs::checksum::{checksum, compare};
use crate::fs::ops::{precheck, remove_entry};
use crate::types::{
    ChecksumMap, ChecksumStatus, ConflictInfo, ConflictKind, ConflictResolution, Operation,
};

/// An executed operation together with what is needed to revert it.
#[derive(Clone, Copy, Debug)]
pub struct ReverseStep<'a> {
    pub op_id: &'a str,
    pub forward: &'a Operation,
    pub inverse: &'a Operation,
    pub result_checksums: &'a ChecksumMap,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Undone,
    Skipped(ConflictInfo),
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reverted {
    pub outcome: StepOutcome,
    pub backup: Option<PathBuf>,
}

impl Reverted {
    fn of(outcome: StepOutcome) -> Self {
        Self {
            outcome,
            backup: None,
        }
    }
}

fn exists(p: &Path) -> bool {
    fs::symlink_metadata(p).is_ok()
}

fn conflict(step: &ReverseStep, kind: ConflictKind, path: &Path) -> ConflictInfo {
    ConflictInfo {
        op_id: step.op_id.to_string(),
        path: path.to_path_buf(),
        kind,
        expected_sha256: None,
        current_sha256: None,
    }
}

/// Path the inverse would write to, when something already occupies it.
fn blocker(step: &ReverseStep) -> Option<PathBuf> {
    step.inverse.result_path().filter(|p| exists(p))
}

/// Compare the live disk against what the step recorded.
#[must_use]
pub fn classify(step: &ReverseStep) -> Option<ConflictInfo> {
    Pending::default().classify(step)
}

/// Disk changes that earlier steps of a chain will have made by the time a
/// later step runs. Lets a whole chain be classified without touching disk.
#[derive(Debug, Default)]
pub struct Pending {
    restored: BTreeSet<PathBuf>,
    vacated: BTreeSet<PathBuf>,
}

impl Pending {
    fn present(&self, p: &Path) -> bool {
        self.restored.contains(p) || (!self.vacated.contains(p) && exists(p))
    }

    /// Classify `step` as if every step accepted so far had already run.
    #[must_use]
    pub fn classify(&self, step: &ReverseStep) -> Option<ConflictInfo> {
        if let Some(src) = step.inverse.source_path() {
            if !self.present(src) {
                return Some(conflict(step, ConflictKind::Missing, src));
            }
        }
        if let Some(res) = step.forward.result_path() {
            if let Some(expected) = step.result_checksums.get(&res) {
                if self.vacated.contains(&res) {
                    return Some(conflict(step, ConflictKind::Missing, &res));
                }
                if !self.restored.contains(&res) {
                    match compare(expected, &res) {
                        ChecksumStatus::Unchanged => {}
                        ChecksumStatus::Missing => {
                            return Some(conflict(step, ConflictKind::Missing, &res));
                        }
                        ChecksumStatus::Modified => {
                            let mut c = conflict(step, ConflictKind::Modified, &res);
                            c.expected_sha256 = Some(expected.sha256.clone());
                            c.current_sha256 = checksum(&res).ok().map(|c| c.sha256);
                            return Some(c);
                        }
                    }
                }
            }
        }
        step.inverse
            .result_path()
            .filter(|p| self.present(p))
            .map(|p| conflict(step, ConflictKind::Blocking, &p))
    }

    /// Record the disk effect of running `step`'s inverse.
    pub fn accept(&mut self, step: &ReverseStep) {
        if step.inverse.removes_source() {
            if let Some(src) = step.inverse.source_path() {
                self.restored.remove(src);
                self.vacated.insert(src.to_path_buf());
            }
        }
        if let Some(res) = step.inverse.result_path() {
            self.vacated.remove(&res);
            self.restored.insert(res);
        }
    }
}

fn describe(c: &ConflictInfo) -> String {
    let kind = match c.kind {
        ConflictKind::Modified => "modified",
        ConflictKind::Missing => "missing",
        ConflictKind::Blocking => "blocking",
    };
    format!("{kind}: {}", c.path.display())
}

/// Apply the inverse of one step under `resolution`.
pub fn revert(
    step: &ReverseStep,
    resolution: ConflictResolution,
    mutator: &dyn Mutator,
    backup_tag: &str,
) -> Reverted {
    let mut backup = None;
    if let Some(c) = classify(step) {
        match resolution {
            ConflictResolution::Abort => {
                return Reverted::of(StepOutcome::Failed(format!("conflict {}", describe(&c))));
            }
            ConflictResolution::Skip => return Reverted::of(StepOutcome::Skipped(c)),
            ConflictResolution::Force | ConflictResolution::Backup => {
                if c.kind == ConflictKind::Missing {
                    if matches!(step.inverse, Operation::DeleteFolder { .. }) {
                        return Reverted::of(StepOutcome::Undone);
                    }
                    return Reverted::of(StepOutcome::Failed(format!(
                        "cannot undo {}: {}",
                        step.forward.label(),
                        describe(&c)
                    )));
                }
                if let Operation::CreateFolder { path } = step.inverse {
                    if path.is_dir() {
                        return Reverted::of(StepOutcome::Undone);
                    }
                }
                if let Some(b) = blocker(step) {
                    if resolution == ConflictResolution::Force {
                        if let Err(e) = remove_entry(&b) {
                            return Reverted::of(StepOutcome::Failed(format!(
                                "cannot remove blocker {}: {e}",
                                b.display()
                            )));
                        }
                    } else {
                        match move_aside(&b, backup_tag) {
                            Ok(moved) => backup = Some(moved),
                            Err(e) => {
                                return Reverted::of(StepOutcome::Failed(format!(
                                    "cannot back up blocker {}: {e}",
                                    b.display()
                                )))
                            }
                        }
                    }
                }
            }
        }
    }

    if let (Operation::CreateFolder { .. }, Operation::DeleteFolder { path }) =
        (step.forward, step.inverse)
    {
        let non_empty = fs::read_dir(path)
            .map(|mut rd| rd.next().is_some())
            .unwrap_or(false);
        if non_empty {
            return Reverted {
                outcome: StepOutcome::Failed(format!("folder not empty: {}", path.display())),
                backup,
            };
        }
    }
    if let Err(e) = precheck(step.inverse) {
        return Reverted {
            outcome: StepOutcome::Failed(e.to_string()),
            backup,
        };
    }
    let outcome = match mutator.apply(step.inverse) {
        Ok(()) => StepOutcome::Undone,
        Err(e) => StepOutcome::Failed(format!("{} failed: {e}", step.inverse.label())),
    };
    Reverted { outcome, backup }
}
