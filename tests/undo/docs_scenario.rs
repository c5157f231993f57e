//! Plan `[create_folder(/A/Docs), move(/A/report.pdf -> /A/Docs/report.pdf)]` end to end:
//! preview, commit, preflight, external edit, preflight again.

use crate::common::{engine, TestRoot};
use tidyard::types::{GhostState, Operation, OrganizePlan};

#[test]
fn docs_scenario_preview_commit_and_preflight() {
    let root = TestRoot::new();
    let report_pdf = root.write("report.pdf", b"%PDF-1.7");
    let docs = root.join("Docs");
    let moved = root.join("Docs/report.pdf");
    let api = engine(&root);

    let plan = OrganizePlan::new(
        root.folder(),
        "Move documents into Docs",
        vec![
            Operation::CreateFolder { path: docs.clone() },
            Operation::Move {
                source: report_pdf.clone(),
                destination: moved.clone(),
            },
        ],
    );

    // Preview.
    assert!(api.vfs_validate_plan(&plan).valid);
    let sim = api.vfs_simulate(&plan);
    let real = api.vfs_list_dir(&root.folder()).unwrap();
    let top = api.vfs_merged_entries(&real, &root.folder(), &sim);
    let docs_ghost = top.iter().find(|e| e.entry.path == docs).unwrap();
    assert_eq!(docs_ghost.ghost_state, GhostState::Creating);
    let source = top.iter().find(|e| e.entry.path == report_pdf).unwrap();
    assert_eq!(source.ghost_state, GhostState::Source);

    let inside = api.vfs_merged_entries(&[], &docs, &sim);
    assert_eq!(inside.len(), 1);
    assert_eq!(inside[0].ghost_state, GhostState::Destination);
    assert_eq!(inside[0].linked_path.as_deref(), Some(report_pdf.as_path()));

    // Commit.
    let job = api.start_organize_job(&root.folder(), &plan.description, "").unwrap();
    let report = api.commit_plan(&job, &plan, None, None).unwrap();
    assert!(report.success());
    let session_id = report.session_id.unwrap();

    // Untouched files: clean preflight.
    let pre = api.history_undo_preflight(&root.folder(), &session_id).unwrap();
    assert!(pre.can_proceed);
    assert_eq!(pre.total_operations, 2);
    assert_eq!(pre.conflicted_operations, 0);
    assert_eq!(pre.safe_operations + pre.conflicted_operations, pre.total_operations);

    // External edit: modified, cannot proceed.
    std::fs::write(&moved, b"%PDF-1.7 annotated").unwrap();
    let pre = api.history_undo_preflight(&root.folder(), &session_id).unwrap();
    assert!(!pre.can_proceed);
    assert_eq!(pre.conflicted_operations, 1);
    assert_eq!(pre.safe_operations, 1);
    assert_eq!(pre.modified_files.len(), 1);
    assert_eq!(pre.modified_files[0].path, moved);
    assert_ne!(pre.modified_files[0].expected_sha256, pre.modified_files[0].current_sha256);
    assert!(pre.missing_files.is_empty() && pre.blocking_files.is_empty());
}
