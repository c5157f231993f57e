//! Undo under each conflict resolution.

use crate::common::{engine_with, FailOnNth, TestAudit, TestEmitter, TestEvents, TestRoot};
use tidyard::adapters::EngineEvent;
use tidyard::errors::ApiError;
use tidyard::types::{ConflictResolution, Operation, OrganizePlan};
use tidyard::Tidyard;

struct Committed {
    root: TestRoot,
    api: Tidyard<TestEmitter, TestAudit>,
    facts: TestEmitter,
    events: TestEvents,
    session_id: String,
}

fn committed() -> Committed {
    let root = TestRoot::new();
    let report_pdf = root.write("report.pdf", b"%PDF");
    let facts = TestEmitter::default();
    let events = TestEvents::default();
    let api = engine_with(&root, facts.clone(), FailOnNth::counting()).with_events(Box::new(events.clone()));
    let plan = OrganizePlan::new(
        root.folder(),
        "docs",
        vec![
            Operation::CreateFolder { path: root.join("Docs") },
            Operation::Move {
                source: report_pdf,
                destination: root.join("Docs/report.pdf"),
            },
        ],
    );
    let job = api.start_organize_job(&root.folder(), "docs", "").unwrap();
    let session_id = api
        .commit_plan(&job, &plan, None, None)
        .unwrap()
        .session_id
        .unwrap();
    Committed {
        root,
        api,
        facts,
        events,
        session_id,
    }
}

impl Committed {
    fn undo(&self, resolution: ConflictResolution) -> Result<tidyard::types::UndoResult, ApiError> {
        self.api
            .history_undo_execute(&self.root.folder(), &self.session_id, resolution)
    }

    fn undone(&self) -> bool {
        self.api
            .history_get_sessions(&self.root.folder())
            .unwrap()
            .iter()
            .any(|s| s.session_id == self.session_id && s.undone)
    }
}

#[test]
fn clean_undo_restores_and_marks_session() {
    let c = committed();
    let r = c.undo(ConflictResolution::Abort).unwrap();
    assert!(r.success, "errors: {:?}", r.errors);
    assert_eq!(r.operations_undone, 2);
    assert_eq!(std::fs::read(c.root.join("report.pdf")).unwrap(), b"%PDF");
    assert!(!c.root.join("Docs").exists());
    assert!(c.undone());
    assert!(c.api.wal_check_recovery().unwrap().is_none());

    let progress: Vec<(usize, usize)> = c
        .events
        .events
        .lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            EngineEvent::UndoProgress { completed, total, .. } => Some((*completed, *total)),
            _ => None,
        })
        .collect();
    assert_eq!(progress, [(1, 2), (2, 2)]);
    assert_eq!(c.facts.find("undo.result", "success").len(), 1);

    // A second undo of the same session is refused.
    assert!(matches!(c.undo(ConflictResolution::Abort), Err(ApiError::AlreadyUndone(_))));
}

#[test]
fn abort_leaves_everything_in_place() {
    let c = committed();
    std::fs::write(c.root.join("Docs/report.pdf"), b"%PDF edited").unwrap();
    let r = c.undo(ConflictResolution::Abort).unwrap();
    assert!(!r.success);
    assert_eq!(r.operations_undone, 0);
    assert!(r.errors[0].contains("modified"));
    assert_eq!(std::fs::read(c.root.join("Docs/report.pdf")).unwrap(), b"%PDF edited");
    assert!(!c.undone());
    assert!(c
        .events
        .events
        .lock()
        .unwrap()
        .iter()
        .any(|e| matches!(e, EngineEvent::ConflictDetected { conflicts: 1, .. })));
}

#[test]
fn skip_leaves_conflicted_operation_alone() {
    let c = committed();
    std::fs::write(c.root.join("Docs/report.pdf"), b"%PDF edited").unwrap();
    let r = c.undo(ConflictResolution::Skip).unwrap();
    assert_eq!(r.operations_skipped, 1);
    assert_eq!(r.operations_undone, 0);
    // The folder still holds the skipped file, so it is kept.
    assert!(r.errors[0].contains("not empty"));
    assert!(c.root.join("Docs/report.pdf").exists());
    assert!(!c.undone());
}

#[test]
fn force_applies_the_inverse_over_modified_content() {
    let c = committed();
    std::fs::write(c.root.join("Docs/report.pdf"), b"%PDF edited").unwrap();
    let r = c.undo(ConflictResolution::Force).unwrap();
    assert!(r.success, "errors: {:?}", r.errors);
    assert_eq!(r.operations_undone, 2);
    assert_eq!(std::fs::read(c.root.join("report.pdf")).unwrap(), b"%PDF edited");
    assert!(c.undone());
}

#[test]
fn backup_moves_the_blocker_aside() {
    let c = committed();
    std::fs::write(c.root.join("report.pdf"), b"new download").unwrap();

    let pre = c
        .api
        .history_undo_preflight(&c.root.folder(), &c.session_id)
        .unwrap();
    assert_eq!(pre.blocking_files, [c.root.join("report.pdf")]);

    let r = c.undo(ConflictResolution::Backup).unwrap();
    assert!(r.success, "errors: {:?}", r.errors);
    assert_eq!(r.backups.len(), 1);
    let backup = &r.backups[0];
    assert!(backup
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with(".report.pdf.tidyard."));
    assert_eq!(std::fs::read(backup).unwrap(), b"new download");
    assert_eq!(std::fs::read(c.root.join("report.pdf")).unwrap(), b"%PDF");
}

#[test]
fn unknown_session_is_not_found() {
    let c = committed();
    let err = c
        .api
        .history_undo_preflight(&c.root.folder(), "missing")
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}
