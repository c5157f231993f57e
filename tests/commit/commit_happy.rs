//! Commit happy path: every operation runs, the batch lands in history and the journal is cleared.

use crate::common::{engine_with, FailOnNth, TestEmitter, TestEvents, TestRoot};
use tidyard::adapters::EngineEvent;
use tidyard::types::{Operation, OrganizePlan};

#[test]
fn commit_archives_session_and_clears_journal() {
    let root = TestRoot::new();
    let report_pdf = root.write("report.pdf", b"pdf bytes");
    let notes = root.write("notes.txt", b"notes");
    let facts = TestEmitter::default();
    let events = TestEvents::default();
    let api = engine_with(&root, facts.clone(), FailOnNth::counting())
        .with_events(Box::new(events.clone()));

    let plan = OrganizePlan::new(
        root.folder(),
        "Sort documents",
        vec![
            Operation::CreateFolder { path: root.join("Docs") },
            Operation::Move {
                source: report_pdf.clone(),
                destination: root.join("Docs/report.pdf"),
            },
            Operation::Rename {
                path: notes.clone(),
                new_name: "notes-2026.txt".into(),
            },
        ],
    );
    let job = api
        .start_organize_job(&root.folder(), &plan.description, "put documents away")
        .unwrap();
    assert!(job.durable);

    let report = api.commit_plan(&job, &plan, None, None).unwrap();
    assert!(report.success(), "errors: {:?}", report.errors);
    assert_eq!(report.executed.len(), 3);
    assert_eq!(report.session_id.as_deref(), Some(job.job_id.as_str()));

    assert!(!report_pdf.exists());
    assert_eq!(std::fs::read(root.join("Docs/report.pdf")).unwrap(), b"pdf bytes");
    assert!(root.join("notes-2026.txt").exists());
    assert!(api.wal_check_recovery().unwrap().is_none());

    let sessions = api.history_get_sessions(&root.folder()).unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].operation_count, 3);
    assert_eq!(sessions[0].user_instruction, "put documents away");
    assert!(!sessions[0].undone);

    let progress: Vec<usize> = events
        .events
        .lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            EngineEvent::ExecutionProgress { completed, total, .. } => {
                assert_eq!(*total, 3);
                Some(*completed)
            }
            _ => None,
        })
        .collect();
    assert_eq!(progress, [1, 2, 3]);

    assert_eq!(facts.find("commit.attempt", "success").len(), 1);
    assert_eq!(facts.find("commit.result", "success").len(), 3);
    let summary = facts.find("commit.summary", "success");
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0]["executed"], 3);
    assert!(summary[0].get("error_id").is_none());
}

#[test]
fn disabled_operations_are_not_executed() {
    let root = TestRoot::new();
    let a = root.write("a.txt", b"a");
    let api = engine_with(&root, TestEmitter::default(), FailOnNth::counting());

    let mut plan = OrganizePlan::new(
        root.folder(),
        "partial",
        vec![
            Operation::CreateFolder { path: root.join("Keep") },
            Operation::Move {
                source: a.clone(),
                destination: root.join("Keep/a.txt"),
            },
        ],
    );
    plan.operations[1].enabled = false;
    let job = api.start_organize_job(&root.folder(), "partial", "").unwrap();
    let report = api.commit_plan(&job, &plan, None, None).unwrap();

    assert_eq!(report.executed, [plan.operations[0].op_id.clone()]);
    assert!(a.exists());
    assert!(root.join("Keep").is_dir());
}

#[test]
fn redacted_facts_hide_generated_ids() {
    let root = TestRoot::new();
    let a = root.write("a.txt", b"a");
    let facts = TestEmitter::default();
    let api = engine_with(&root, facts.clone(), FailOnNth::counting()).with_redacted_facts(true);
    let plan = OrganizePlan::new(
        root.folder(),
        "rename",
        vec![Operation::Rename {
            path: a,
            new_name: "b.txt".into(),
        }],
    );
    let job = api.start_organize_job(&root.folder(), "rename", "").unwrap();
    api.commit_plan(&job, &plan, None, None).unwrap();

    let summary = &facts.find("commit.summary", "success")[0];
    assert_eq!(summary["job_id"], "***");
    assert_eq!(summary["ts"], tidyard::logging::TS_ZERO);
    assert!(summary.get("duration_ms").is_none());
}
