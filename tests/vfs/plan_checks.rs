//! Plan validation and review grouping through the facade.

use crate::common::{engine, test_policy, TestAudit, TestEmitter, TestRoot};
use tidyard::types::{IssueCode, Operation, OrganizePlan};
use tidyard::Tidyard;

#[test]
fn validation_reports_every_problem_deterministically() {
    let root = TestRoot::new();
    let a = root.write("a.txt", b"a");
    root.write("b.txt", b"b");
    let facts = TestEmitter::default();
    let api = Tidyard::new(facts.clone(), TestAudit, test_policy(), root.store());

    let plan = OrganizePlan::new(
        root.folder(),
        "messy",
        vec![
            Operation::Move {
                source: root.join("ghost.txt"),
                destination: root.join("c.txt"),
            },
            Operation::Move {
                source: a.clone(),
                destination: root.join("b.txt"),
            },
            Operation::Move {
                source: root.join("b.txt"),
                destination: root.join("Nowhere/b.txt"),
            },
        ],
    );
    let v = api.vfs_validate_plan(&plan);
    assert!(!v.valid);
    let codes: Vec<IssueCode> = v.errors.iter().map(|e| e.code).collect();
    assert!(codes.contains(&IssueCode::SourceMissing));
    assert!(codes.contains(&IssueCode::DestinationExists));
    assert!(codes.contains(&IssueCode::OrphanedMove));
    assert_eq!(api.vfs_validate_plan(&plan), v);
    assert_eq!(facts.find("plan", "warn").len(), 2);
    assert!(a.exists(), "validation never touches disk");
}

#[test]
fn valid_plan_carries_the_hash_commit_checks() {
    let root = TestRoot::new();
    let a = root.write("a.txt", b"a");
    let api = engine(&root);
    let plan = OrganizePlan::new(
        root.folder(),
        "ok",
        vec![
            Operation::CreateFolder { path: root.join("Docs") },
            Operation::Move {
                source: a,
                destination: root.join("Docs/a.txt"),
            },
        ],
    );
    let v = api.vfs_validate_plan(&plan);
    assert!(v.valid, "{:?}", v.errors);
    let job = api.start_organize_job(&root.folder(), "ok", "").unwrap();
    let report = api.commit_plan(&job, &plan, Some(&v.plan_hash), None).unwrap();
    assert!(report.success());
}

#[test]
fn groups_and_edit_checks() {
    let root = TestRoot::new();
    let a = root.write("a.pdf", b"a");
    let b = root.write("b.pdf", b"b");
    let api = engine(&root);
    let plan = OrganizePlan::new(
        root.folder(),
        "group",
        vec![
            Operation::Move {
                source: b.clone(),
                destination: root.join("Docs/b.pdf"),
            },
            Operation::CreateFolder { path: root.join("Docs") },
            Operation::Move {
                source: a.clone(),
                destination: root.join("Docs/a.pdf"),
            },
            Operation::Rename {
                path: root.join("x.txt"),
                new_name: "y.txt".into(),
            },
        ],
    );
    let groups = api.vfs_operation_groups(&plan.operations);
    assert_eq!(groups[0].name, "Docs");
    assert!(groups[0].has_create);
    assert_eq!(groups[0].total_count, 3);

    // Out-of-order editing is fine as long as something creates Docs.
    let issues = api.vfs_validate_edits(&plan.operations);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].code, IssueCode::SourceMissing);
    assert_eq!(issues[0].path, root.join("x.txt"));
}
