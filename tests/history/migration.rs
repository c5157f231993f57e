use serde_json::json;

use crate::common::{engine, TestRoot};
use tidyard::history::HistoryStore;

#[test]
fn startup_migration_upgrades_files_and_cleans_journals() {
    let root = TestRoot::new();
    let store = root.store();
    std::fs::create_dir_all(&store.history_dir).unwrap();
    std::fs::create_dir_all(&store.wal_dir).unwrap();

    let folder = root.folder();
    let hash = HistoryStore::folder_hash(&folder);
    let legacy = json!({
        "folderPath": folder,
        "folderHash": hash,
        "sessions": [],
        "lastUpdated": "2025-01-01T00:00:00Z"
    });
    std::fs::write(
        store.history_dir.join(format!("{hash}.history.json")),
        legacy.to_string(),
    )
    .unwrap();
    std::fs::write(store.wal_dir.join("broken.wal.json"), b"{ not json").unwrap();
    std::fs::write(store.wal_dir.join(".x.wal.json.7.1.tidyard.tmp"), b"").unwrap();

    let api = engine(&root);
    let report = api.run_startup_migration().unwrap();
    assert_eq!(report.history_files_upgraded, 1);
    assert!(report.index_rebuilt);
    assert_eq!(report.corrupt_journals_quarantined, 1);
    assert_eq!(report.stale_temp_files_removed, 1);

    let folders = api.history_list_folders().unwrap();
    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0].folder_path, folder);
    assert!(api.wal_check_recovery().unwrap().is_none());
    assert!(store.quarantine_dir.is_dir());

    // Nothing left to do the second time.
    let again = api.run_startup_migration().unwrap();
    assert_eq!(again.history_files_upgraded, 0);
    assert_eq!(again.corrupt_journals_quarantined, 0);
}
