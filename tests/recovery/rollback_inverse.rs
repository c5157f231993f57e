//! Rolling back an interrupted job restores the original layout byte for byte.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::common::{engine_with, FailOnNth, TestEmitter, TestEvents, TestRoot};
use tidyard::adapters::EngineEvent;
use tidyard::fs::checksum::checksum;
use tidyard::types::{ConflictResolution, Operation, OrganizePlan};

fn snapshot(paths: &[PathBuf]) -> BTreeMap<PathBuf, String> {
    paths
        .iter()
        .map(|p| (p.clone(), checksum(p).unwrap().sha256))
        .collect()
}

#[test]
fn rollback_is_the_exact_inverse() {
    let root = TestRoot::new();
    let report_pdf = root.write("report.pdf", b"quarterly");
    let photo = root.write("IMG_0001.jpg", b"jpeg");
    let notes = root.write("notes.txt", b"todo");
    let before = snapshot(&[report_pdf.clone(), photo.clone(), notes.clone()]);

    let plan = OrganizePlan::new(
        root.folder(),
        "mixed",
        vec![
            Operation::CreateFolder { path: root.join("Docs") },
            Operation::Move {
                source: report_pdf.clone(),
                destination: root.join("Docs/report.pdf"),
            },
            Operation::Rename {
                path: photo.clone(),
                new_name: "holiday.jpg".into(),
            },
            Operation::Copy {
                source: notes.clone(),
                destination: root.join("Docs/notes.txt"),
            },
            Operation::CreateFolder { path: root.join("Never") },
        ],
    );
    let facts = TestEmitter::default();
    let events = TestEvents::default();
    let api = engine_with(&root, facts.clone(), FailOnNth::at(5)).with_events(Box::new(events.clone()));
    let job = api.start_organize_job(&root.folder(), "mixed", "").unwrap();
    let report = api.commit_plan(&job, &plan, None, None).unwrap();
    assert_eq!(report.executed.len(), 4);

    let result = api
        .wal_rollback_job(&job.job_id, ConflictResolution::Abort)
        .unwrap();
    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.completed_count, 4);

    assert_eq!(snapshot(&[report_pdf, photo, notes]), before);
    assert!(!root.join("Docs").exists());
    assert!(!root.join("holiday.jpg").exists());
    assert!(api.wal_check_recovery().unwrap().is_none());
    assert!(!api.history_has_history(&root.folder()));

    let rollback_events = events
        .events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| matches!(e, EngineEvent::RollbackProgress { .. }))
        .count();
    assert_eq!(rollback_events, 4);
    let summary = facts.find("rollback.summary", "success");
    assert_eq!(summary[0]["reverted"], 4);
}

#[test]
fn abort_rollback_refuses_when_content_changed() {
    let root = TestRoot::new();
    let a = root.write("a.txt", b"original");
    let plan = OrganizePlan::new(
        root.folder(),
        "two",
        vec![
            Operation::Move {
                source: a.clone(),
                destination: root.join("b.txt"),
            },
            Operation::CreateFolder { path: root.join("X") },
        ],
    );
    let api = engine_with(&root, TestEmitter::default(), FailOnNth::at(2));
    let job = api.start_organize_job(&root.folder(), "two", "").unwrap();
    api.commit_plan(&job, &plan, None, None).unwrap();
    std::fs::write(root.join("b.txt"), b"edited after the move").unwrap();

    let result = api
        .wal_rollback_job(&job.job_id, ConflictResolution::Abort)
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.completed_count, 0);
    assert!(root.join("b.txt").exists());
    assert!(api.wal_check_recovery().unwrap().is_some());

    let result = api
        .wal_rollback_job(&job.job_id, ConflictResolution::Skip)
        .unwrap();
    assert!(result.success);
    assert_eq!(result.skipped_count, 1);
    assert!(api.wal_check_recovery().unwrap().is_none());
}
