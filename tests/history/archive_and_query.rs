use crate::common::{engine, test_policy, TestAudit, TestEmitter, TestRoot};
use tidyard::types::{Operation, OrganizePlan};
use tidyard::Tidyard;

fn commit_folder(api: &Tidyard<TestEmitter, TestAudit>, root: &TestRoot, name: &str) -> String {
    let plan = OrganizePlan::new(
        root.folder(),
        format!("make {name}"),
        vec![Operation::CreateFolder { path: root.join(name) }],
    );
    let job = api.start_organize_job(&root.folder(), &plan.description, name).unwrap();
    api.commit_plan(&job, &plan, None, None)
        .unwrap()
        .session_id
        .unwrap()
}

#[test]
fn sessions_are_newest_first_and_summarized() {
    let root = TestRoot::new();
    let api = engine(&root);
    assert!(!api.history_has_history(&root.folder()));
    assert!(api.history_get_summary(&root.folder()).unwrap().is_none());

    let first = commit_folder(&api, &root, "One");
    let second = commit_folder(&api, &root, "Two");

    let sessions = api.history_get_sessions(&root.folder()).unwrap();
    let ids: Vec<&str> = sessions.iter().map(|s| s.session_id.as_str()).collect();
    assert_eq!(ids, [second.as_str(), first.as_str()]);

    let summary = api.history_get_summary(&root.folder()).unwrap().unwrap();
    assert_eq!(summary.session_count, 2);
    assert_eq!(summary.total_operations, 2);
    assert_eq!(summary.folder_path, root.folder());

    let folders = api.history_list_folders().unwrap();
    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0].session_count, 2);
}

#[test]
fn retention_drops_the_oldest_sessions() {
    let root = TestRoot::new();
    let api = Tidyard::new(
        TestEmitter::default(),
        TestAudit,
        test_policy().with_max_sessions(2),
        root.store(),
    );
    let ids: Vec<String> = ["One", "Two", "Three"]
        .iter()
        .map(|n| commit_folder(&api, &root, n))
        .collect();
    let kept: Vec<String> = api
        .history_get_sessions(&root.folder())
        .unwrap()
        .into_iter()
        .map(|s| s.session_id)
        .collect();
    assert_eq!(kept, [ids[2].clone(), ids[1].clone()]);
}

#[test]
fn delete_clears_history_and_emits_fact() {
    let root = TestRoot::new();
    let facts = TestEmitter::default();
    let api = Tidyard::new(facts.clone(), TestAudit, test_policy(), root.store());
    commit_folder(&api, &root, "One");
    assert!(api.history_has_history(&root.folder()));

    api.history_delete(&root.folder()).unwrap();
    assert!(!api.history_has_history(&root.folder()));
    assert!(api.history_list_folders().unwrap().is_empty());
    assert_eq!(facts.find("history", "success")[0]["action"], "delete");
}
