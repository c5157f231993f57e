//! A batch interrupted mid-way resumes from where it stopped and runs only what is left.

use crate::common::{engine_with, FailOnNth, TestEmitter, TestRoot};
use tidyard::types::{Operation, OrganizePlan};

fn four_step_plan(root: &TestRoot) -> OrganizePlan {
    for name in ["a.txt", "b.txt", "c.txt"] {
        root.write(name, name.as_bytes());
    }
    let mv = |name: &str| Operation::Move {
        source: root.join(name),
        destination: root.join(format!("Docs/{name}")),
    };
    OrganizePlan::new(
        root.folder(),
        "file text notes",
        vec![
            Operation::CreateFolder { path: root.join("Docs") },
            mv("a.txt"),
            mv("b.txt"),
            mv("c.txt"),
        ],
    )
}

#[test]
fn resume_executes_only_the_remaining_operations() {
    let root = TestRoot::new();
    let plan = four_step_plan(&root);

    // First run dies on the third mutation.
    let crashing = engine_with(&root, TestEmitter::default(), FailOnNth::at(3));
    let job = crashing
        .start_organize_job(&root.folder(), &plan.description, "notes into Docs")
        .unwrap();
    let report = crashing.commit_plan(&job, &plan, None, None).unwrap();
    assert_eq!(report.executed.len(), 2);
    assert!(report.failed.is_some());
    assert!(root.join("Docs/a.txt").exists());
    assert!(root.join("b.txt").exists());
    drop(crashing);

    // Next launch.
    let facts = TestEmitter::default();
    let counter = FailOnNth::counting();
    let api = engine_with(&root, facts.clone(), counter.clone());
    let info = api.wal_check_recovery().unwrap().expect("interrupted job");
    assert_eq!(info.job_id, job.job_id);
    assert_eq!(info.completed_count, 2);
    assert_eq!(info.pending_operations.len(), 2);

    let result = api.wal_resume_job(&job.job_id).unwrap();
    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.completed_count, 4);
    assert_eq!(counter.calls(), 2);

    for name in ["a.txt", "b.txt", "c.txt"] {
        assert_eq!(std::fs::read(root.join(format!("Docs/{name}"))).unwrap(), name.as_bytes());
    }
    assert!(api.wal_check_recovery().unwrap().is_none());

    let detail = api
        .history_get_session_detail(&root.folder(), &job.job_id)
        .unwrap()
        .expect("archived session");
    assert_eq!(detail.operations.len(), 4);
    assert_eq!(detail.user_instruction, "notes into Docs");
    assert!(detail
        .operations
        .iter()
        .all(|o| !o.result_checksums.is_empty()));
    assert_eq!(facts.find("resume", "success").len(), 1);
}

#[test]
fn resume_halts_again_when_a_precondition_still_fails() {
    let root = TestRoot::new();
    let plan = four_step_plan(&root);
    let crashing = engine_with(&root, TestEmitter::default(), FailOnNth::at(2));
    let job = crashing.start_organize_job(&root.folder(), "x", "").unwrap();
    crashing.commit_plan(&job, &plan, None, None).unwrap();

    // Someone removed the next source in the meantime.
    std::fs::remove_file(root.join("a.txt")).unwrap();
    let api = engine_with(&root, TestEmitter::default(), FailOnNth::counting());
    let result = api.wal_resume_job(&job.job_id).unwrap();
    assert!(!result.success);
    assert!(result.errors[0].contains("source missing"));
    assert_eq!(result.completed_count, 1);
    assert!(api.wal_check_recovery().unwrap().is_some());
}
