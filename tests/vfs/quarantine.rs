use crate::common::{engine, TestRoot};
use tidyard::errors::ApiError;

#[test]
fn quarantined_items_are_listed_and_restorable_paths_kept() {
    let root = TestRoot::new();
    let old = root.write("old notes.txt", b"keep me");
    let api = engine(&root);

    let item = api.quarantine_item(&old).unwrap();
    assert!(!old.exists());
    assert_eq!(item.original_name, "old notes.txt");
    assert_eq!(std::fs::read(&item.path).unwrap(), b"keep me");
    assert!(item.path.starts_with(&api.store().quarantine_dir));

    let listed = api.quarantine_list().unwrap();
    assert_eq!(listed, [item]);

    assert!(matches!(api.quarantine_item(&old), Err(ApiError::Precondition(_))));
}
