use std::path::{Path, PathBuf};

use time::OffsetDateTime;

use crate::types::{
    EntryKind, FileEntry, GhostFileEntry, GhostState, MovedEntry, Operation, OrganizePlan,
    PlannedOperation, Simulation,
};

/// Guess whether a path names a file: its last segment has an extension
/// that is not just a leading dot (`report.pdf` yes, `.config` and `Docs` no).
#[must_use]
pub fn looks_like_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    matches!(name.rfind('.'), Some(i) if i > 0 && i + 1 < name.len())
}

fn is_directory(po: &PlannedOperation, path: &Path) -> bool {
    match po.kind {
        Some(EntryKind::Directory) => true,
        Some(EntryKind::File) => false,
        None => !looks_like_file(path),
    }
}

fn name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn ghost(
    path: &Path,
    is_directory: bool,
    state: GhostState,
    op_id: &str,
    linked: Option<PathBuf>,
    since: OffsetDateTime,
) -> GhostFileEntry {
    GhostFileEntry {
        entry: FileEntry {
            name: name_of(path),
            path: path.to_path_buf(),
            is_directory,
            size: 0,
            modified_at: None,
        },
        ghost_state: state,
        operation_id: Some(op_id.to_string()),
        linked_path: linked,
        ghost_since: Some(since),
        is_virtual: true,
    }
}

impl Simulation {
    /// Where `path` came from on disk when it only exists virtually.
    fn origin_of(&self, path: &Path) -> PathBuf {
        self.virtual_entries
            .get(path)
            .and_then(|g| g.linked_path.clone())
            .unwrap_or_else(|| path.to_path_buf())
    }

    /// Forget a virtual entry that a later operation moved away.
    /// Returns true when `path` only existed virtually.
    fn take_virtual(&mut self, path: &Path) -> bool {
        self.virtual_entries.remove(path).is_some()
    }

    /// Remove `path` from the view. A ghost that arrived by move takes its
    /// real origin with it. Returns false when `path` is a real entry.
    fn discard_virtual(&mut self, path: &Path, op_id: &str, trash: bool) -> bool {
        let Some(g) = self.virtual_entries.remove(path) else {
            return false;
        };
        if let Some(origin) = g.linked_path {
            if self.moved_entries.remove(&origin).is_some() {
                let into = if trash {
                    &mut self.trashed_paths
                } else {
                    &mut self.removed_paths
                };
                into.insert(origin, op_id.to_string());
            }
        }
        true
    }

    fn leave(&mut self, po: &PlannedOperation, source: &Path, destination: &Path) {
        let origin = self.origin_of(source);
        let was_virtual = self.take_virtual(source);
        if !was_virtual {
            self.moved_entries.insert(
                source.to_path_buf(),
                MovedEntry {
                    operation_id: po.op_id.clone(),
                    destination: destination.to_path_buf(),
                },
            );
        } else if let Some(m) = self.moved_entries.get_mut(&origin) {
            m.destination = destination.to_path_buf();
        }
    }
}

/// Project the enabled operations of `plan` into a virtual view.
///
/// Later operations see the effect of earlier ones: moving a path that only
/// exists virtually relocates the ghost instead of marking a real source.
#[must_use]
pub fn apply_plan(plan: &OrganizePlan) -> Simulation {
    let now = OffsetDateTime::now_utc();
    let mut sim = Simulation::default();
    for po in plan.enabled() {
        let id = po.op_id.as_str();
        match &po.operation {
            Operation::CreateFolder { path } => {
                sim.virtual_entries.insert(
                    path.clone(),
                    ghost(path, true, GhostState::Creating, id, None, now),
                );
            }
            Operation::Move { .. } | Operation::Rename { .. } => {
                let Some(source) = po.operation.source_path().map(Path::to_path_buf) else {
                    continue;
                };
                let Some(destination) = po.operation.result_path() else {
                    continue;
                };
                let origin = sim.origin_of(&source);
                let dir = sim
                    .virtual_entries
                    .get(&source)
                    .map_or_else(|| is_directory(po, &destination), |g| g.entry.is_directory);
                sim.leave(po, &source, &destination);
                sim.virtual_entries.insert(
                    destination.clone(),
                    ghost(&destination, dir, GhostState::Destination, id, Some(origin), now),
                );
            }
            Operation::Quarantine { path, .. } => {
                if !sim.discard_virtual(path, id, true) {
                    sim.trashed_paths.insert(path.clone(), po.op_id.clone());
                }
            }
            Operation::Copy {
                source,
                destination,
            } => {
                let dir = sim
                    .virtual_entries
                    .get(source)
                    .map_or_else(|| is_directory(po, destination), |g| g.entry.is_directory);
                let origin = sim.origin_of(source);
                sim.virtual_entries.insert(
                    destination.clone(),
                    ghost(destination, dir, GhostState::Destination, id, Some(origin), now),
                );
            }
            Operation::DeleteFolder { path } => {
                if !sim.discard_virtual(path, id, false) {
                    sim.removed_paths.insert(path.clone(), po.op_id.clone());
                }
            }
        }
    }
    sim
}
