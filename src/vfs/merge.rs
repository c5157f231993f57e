use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::path::Path;

use crate::types::{FileEntry, GhostFileEntry, GhostState, Simulation};

/// Listing order: directories first, then case-insensitive name, then exact
/// name, then full path. Total, so equal inputs always sort identically.
#[must_use]
pub fn listing_order(a: &GhostFileEntry, b: &GhostFileEntry) -> Ordering {
    b.entry
        .is_directory
        .cmp(&a.entry.is_directory)
        .then_with(|| a.entry.name.to_lowercase().cmp(&b.entry.name.to_lowercase()))
        .then_with(|| a.entry.name.cmp(&b.entry.name))
        .then_with(|| a.entry.path.cmp(&b.entry.path))
}

fn decorate(entry: &FileEntry, sim: &Simulation) -> GhostFileEntry {
    let mut g = GhostFileEntry::normal(entry.clone());
    if let Some(m) = sim.moved_entries.get(&entry.path) {
        g.ghost_state = GhostState::Source;
        g.operation_id = Some(m.operation_id.clone());
        g.linked_path = Some(m.destination.clone());
    } else if let Some(op) = sim
        .trashed_paths
        .get(&entry.path)
        .or_else(|| sim.removed_paths.get(&entry.path))
    {
        g.ghost_state = GhostState::Deleting;
        g.operation_id = Some(op.clone());
    }
    g
}

/// One directory level of the preview: every real entry exactly once, plus
/// the virtual entries whose parent is `current`.
///
/// Real entries the plan takes away stay visible as `source` or `deleting`.
/// A virtual entry never shadows a real one at the same path.
#[must_use]
pub fn get_merged_entries(real: &[FileEntry], current: &Path, sim: &Simulation) -> Vec<GhostFileEntry> {
    let mut seen = BTreeSet::new();
    let mut out: Vec<GhostFileEntry> = Vec::with_capacity(real.len());
    for e in real {
        if seen.insert(e.path.clone()) {
            out.push(decorate(e, sim));
        }
    }
    out.extend(
        sim.virtual_entries
            .values()
            .filter(|g| g.entry.path.parent() == Some(current))
            .filter(|g| !seen.contains(&g.entry.path))
            .cloned(),
    );
    out.sort_by(listing_order);
    out
}
