//! An undo that dies half-way stays in the journal and finishes through recovery.

use crate::common::{engine_with, FailOnNth, TestAudit, TestEmitter, TestRoot};
use tidyard::types::{ConflictResolution, Operation, OrganizePlan};
use tidyard::Tidyard;

/// Commits `[create Docs, move report.pdf into it]`, then undoes it with the
/// second inverse failing. Returns the session id and the kept undo job.
fn half_undone(root: &TestRoot) -> (String, String) {
    let report = root.write("report.pdf", b"%PDF");
    let api = engine_with(root, TestEmitter::default(), FailOnNth::counting());
    let plan = OrganizePlan::new(
        root.folder(),
        "docs",
        vec![
            Operation::CreateFolder { path: root.join("Docs") },
            Operation::Move {
                source: report,
                destination: root.join("Docs/report.pdf"),
            },
        ],
    );
    let job = api.start_organize_job(&root.folder(), "docs", "").unwrap();
    let session_id = api.commit_plan(&job, &plan, None, None).unwrap().session_id.unwrap();
    drop(api);

    let crashing = engine_with(root, TestEmitter::default(), FailOnNth::at(2));
    let r = crashing
        .history_undo_execute(&root.folder(), &session_id, ConflictResolution::Abort)
        .unwrap();
    assert!(!r.success);
    assert_eq!(r.operations_undone, 1);
    assert_eq!(r.sessions_undone, 0);
    assert!(r.errors[0].contains("injected failure"));
    let undo_job = r.interrupted_job.expect("undo job kept");
    assert!(undo_job.starts_with("undo-"));

    // First inverse ran, the folder removal did not.
    assert_eq!(std::fs::read(root.join("report.pdf")).unwrap(), b"%PDF");
    assert!(root.join("Docs").is_dir());
    (session_id, undo_job)
}

fn is_undone(api: &Tidyard<TestEmitter, TestAudit>, root: &TestRoot, id: &str) -> bool {
    api.history_get_sessions(&root.folder())
        .unwrap()
        .iter()
        .any(|s| s.session_id == id && s.undone)
}

#[test]
fn resumed_undo_finishes_and_flags_the_session() {
    let root = TestRoot::new();
    let (session_id, undo_job) = half_undone(&root);

    let facts = TestEmitter::default();
    let counter = FailOnNth::counting();
    let api = engine_with(&root, facts.clone(), counter.clone());
    assert!(!is_undone(&api, &root, &session_id));
    let info = api.wal_check_recovery().unwrap().expect("undo job offered");
    assert_eq!(info.job_id, undo_job);
    assert_eq!(info.completed_count, 1);
    assert_eq!(info.pending_operations, [Operation::DeleteFolder { path: root.join("Docs") }]);

    let result = api.wal_resume_job(&undo_job).unwrap();
    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(counter.calls(), 1);
    assert!(!root.join("Docs").exists());
    assert_eq!(std::fs::read(root.join("report.pdf")).unwrap(), b"%PDF");
    assert!(is_undone(&api, &root, &session_id));
    assert!(api.wal_check_recovery().unwrap().is_none());
    assert_eq!(facts.find("resume", "success")[0]["undo_of"], session_id.as_str());
}

#[test]
fn rolled_back_undo_leaves_the_session_live() {
    let root = TestRoot::new();
    let (session_id, undo_job) = half_undone(&root);

    let api = engine_with(&root, TestEmitter::default(), FailOnNth::counting());
    let result = api.wal_rollback_job(&undo_job, ConflictResolution::Abort).unwrap();
    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.completed_count, 1);
    assert_eq!(std::fs::read(root.join("Docs/report.pdf")).unwrap(), b"%PDF");
    assert!(!root.join("report.pdf").exists());
    assert!(!is_undone(&api, &root, &session_id));
    assert!(api.wal_check_recovery().unwrap().is_none());

    // The session can still be undone normally.
    let r = api
        .history_undo_execute(&root.folder(), &session_id, ConflictResolution::Abort)
        .unwrap();
    assert!(r.success, "errors: {:?}", r.errors);
    assert!(is_undone(&api, &root, &session_id));
}
