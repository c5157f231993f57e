//! Non-durable fallback when the journal directory cannot be written.

use crate::common::{test_policy, TestAudit, TestEmitter, TestRoot};
use tidyard::errors::ApiError;
use tidyard::policy::StorePaths;
use tidyard::types::{Operation, OrganizePlan};
use tidyard::Tidyard;

fn broken_store(root: &TestRoot) -> StorePaths {
    // A regular file where the WAL directory should be.
    let base = root.folder().parent().unwrap().join("store");
    std::fs::create_dir_all(&base).unwrap();
    std::fs::write(base.join("wal"), b"not a directory").unwrap();
    StorePaths::under(base)
}

#[test]
fn local_job_runs_and_archives() {
    let root = TestRoot::new();
    let a = root.write("a.txt", b"a");
    let api = Tidyard::new(TestEmitter::default(), TestAudit, test_policy(), broken_store(&root));

    let job = api
        .start_organize_job_or_local(&root.folder(), "local", "tidy up")
        .unwrap();
    assert!(!job.durable);
    assert!(job.job_id.starts_with("local-"));

    let plan = OrganizePlan::new(
        root.folder(),
        "local",
        vec![Operation::Rename {
            path: a,
            new_name: "b.txt".into(),
        }],
    );
    let report = api.commit_plan(&job, &plan, None, None).unwrap();
    assert!(report.success(), "errors: {:?}", report.errors);
    assert!(root.join("b.txt").exists());

    let sessions = api.history_get_sessions(&root.folder()).unwrap();
    assert_eq!(sessions[0].session_id, job.job_id);
    assert_eq!(sessions[0].user_instruction, "tidy up");
}

#[test]
fn strict_policy_refuses_the_fallback() {
    let root = TestRoot::new();
    let mut policy = test_policy();
    policy.governance.allow_local_fallback = false;
    let api = Tidyard::new(TestEmitter::default(), TestAudit, policy, broken_store(&root));
    let err = api
        .start_organize_job_or_local(&root.folder(), "local", "")
        .unwrap_err();
    assert!(matches!(err, ApiError::Durability(_)));
}
