use crate::common::{engine, engine_with, FailOnNth, TestEmitter, TestRoot};
use tidyard::errors::ApiError;
use tidyard::types::{Operation, OrganizePlan};

#[test]
fn discard_forgets_the_job_and_keeps_files() {
    let root = TestRoot::new();
    let a = root.write("a.txt", b"a");
    let plan = OrganizePlan::new(
        root.folder(),
        "d",
        vec![
            Operation::CreateFolder { path: root.join("Docs") },
            Operation::Move {
                source: a,
                destination: root.join("Docs/a.txt"),
            },
        ],
    );
    let api = engine_with(&root, TestEmitter::default(), FailOnNth::at(2));
    let job = api.start_organize_job(&root.folder(), "d", "").unwrap();
    api.commit_plan(&job, &plan, None, None).unwrap();

    api.wal_discard_job(&job.job_id).unwrap();
    assert!(api.wal_check_recovery().unwrap().is_none());
    assert!(root.join("Docs").is_dir());

    // The folder is free again.
    api.start_organize_job(&root.folder(), "again", "").unwrap();
}

#[test]
fn unknown_and_malformed_job_ids() {
    let root = TestRoot::new();
    let api = engine(&root);
    assert!(matches!(api.wal_discard_job("no-such-job"), Err(ApiError::NotFound(_))));
    assert!(matches!(api.wal_resume_job("../escape"), Err(ApiError::Protocol(_))));
}
