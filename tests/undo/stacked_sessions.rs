//! Undoing an older session first unwinds the newer sessions stacked on top of it.

use crate::common::{engine_with, FailOnNth, TestAudit, TestEmitter, TestRoot};
use tidyard::errors::ApiError;
use tidyard::types::{ConflictResolution, Operation, OrganizePlan};
use tidyard::Tidyard;

struct Stacked {
    root: TestRoot,
    api: Tidyard<TestEmitter, TestAudit>,
    facts: TestEmitter,
    first: String,
    second: String,
}

fn commit(api: &Tidyard<TestEmitter, TestAudit>, root: &TestRoot, desc: &str, ops: Vec<Operation>) -> String {
    let plan = OrganizePlan::new(root.folder(), desc, ops);
    let job = api.start_organize_job(&root.folder(), desc, "").unwrap();
    api.commit_plan(&job, &plan, None, None)
        .unwrap()
        .session_id
        .unwrap()
}

/// First session files a.pdf under Docs, the second renames it there.
fn stacked() -> Stacked {
    let root = TestRoot::new();
    root.write("a.pdf", b"%PDF-a");
    let facts = TestEmitter::default();
    let api = engine_with(&root, facts.clone(), FailOnNth::counting());
    let first = commit(
        &api,
        &root,
        "file pdfs",
        vec![
            Operation::CreateFolder { path: root.join("Docs") },
            Operation::Move {
                source: root.join("a.pdf"),
                destination: root.join("Docs/a.pdf"),
            },
        ],
    );
    let second = commit(
        &api,
        &root,
        "rename pdf",
        vec![Operation::Rename {
            path: root.join("Docs/a.pdf"),
            new_name: "b.pdf".into(),
        }],
    );
    assert!(root.join("Docs/b.pdf").exists());
    Stacked {
        root,
        api,
        facts,
        first,
        second,
    }
}

impl Stacked {
    fn undone(&self, session_id: &str) -> bool {
        self.api
            .history_get_sessions(&self.root.folder())
            .unwrap()
            .iter()
            .any(|s| s.session_id == session_id && s.undone)
    }
}

#[test]
fn preflight_of_older_session_covers_the_newer_one() {
    let s = stacked();
    let pre = s.api.history_undo_preflight(&s.root.folder(), &s.first).unwrap();
    assert_eq!(pre.total_operations, 3);
    assert_eq!(pre.safe_operations, 3);
    assert!(pre.can_proceed, "conflicts: {pre:?}");
    assert_eq!(s.facts.find("undo.preflight", "success")[0]["sessions"], 2);
}

#[test]
fn undoing_older_session_restores_original_layout() {
    for resolution in [ConflictResolution::Force, ConflictResolution::Abort] {
        let s = stacked();
        let r = s
            .api
            .history_undo_execute(&s.root.folder(), &s.first, resolution)
            .unwrap();
        assert!(r.success, "{resolution:?} errors: {:?}", r.errors);
        assert_eq!(r.operations_undone, 3);
        assert_eq!(r.sessions_undone, 2);
        assert_eq!(std::fs::read(s.root.join("a.pdf")).unwrap(), b"%PDF-a");
        assert!(!s.root.join("Docs").exists());
        assert!(s.undone(&s.first));
        assert!(s.undone(&s.second));
        assert!(s.api.wal_check_recovery().unwrap().is_none());

        let again = s
            .api
            .history_undo_execute(&s.root.folder(), &s.first, resolution);
        assert!(matches!(again, Err(ApiError::AlreadyUndone(_))));
        let newer = s
            .api
            .history_undo_execute(&s.root.folder(), &s.second, resolution);
        assert!(matches!(newer, Err(ApiError::AlreadyUndone(_))));
    }
}

#[test]
fn sessions_already_undone_are_not_replayed() {
    let s = stacked();
    let r = s
        .api
        .history_undo_execute(&s.root.folder(), &s.second, ConflictResolution::Abort)
        .unwrap();
    assert_eq!((r.operations_undone, r.sessions_undone), (1, 1));
    assert!(s.root.join("Docs/a.pdf").exists());
    assert!(!s.undone(&s.first));

    let pre = s.api.history_undo_preflight(&s.root.folder(), &s.first).unwrap();
    assert_eq!(pre.total_operations, 2);
    assert!(pre.can_proceed);

    let r = s
        .api
        .history_undo_execute(&s.root.folder(), &s.first, ConflictResolution::Abort)
        .unwrap();
    assert!(r.success, "errors: {:?}", r.errors);
    assert_eq!((r.operations_undone, r.sessions_undone), (2, 1));
    assert_eq!(std::fs::read(s.root.join("a.pdf")).unwrap(), b"%PDF-a");
    assert!(!s.root.join("Docs").exists());
}

#[test]
fn drift_in_a_newer_session_blocks_an_aborting_undo() {
    let s = stacked();
    std::fs::write(s.root.join("Docs/b.pdf"), b"edited").unwrap();
    let pre = s.api.history_undo_preflight(&s.root.folder(), &s.first).unwrap();
    assert!(!pre.can_proceed);
    assert_eq!(pre.modified_files.len(), 1);

    let r = s
        .api
        .history_undo_execute(&s.root.folder(), &s.first, ConflictResolution::Abort)
        .unwrap();
    assert!(!r.success);
    assert_eq!(r.operations_undone, 0);
    assert!(!s.undone(&s.first));
    assert!(!s.undone(&s.second));
    assert_eq!(std::fs::read(s.root.join("Docs/b.pdf")).unwrap(), b"edited");
}
