use crate::common::{engine, TestEvents, TestRoot};
use tidyard::adapters::{CancelToken, EngineEvent};

#[test]
fn index_counts_and_reports_progress() {
    let root = TestRoot::new();
    root.write("a.txt", b"abc");
    root.write("Docs/b.txt", b"de");
    let events = TestEvents::default();
    let api = engine(&root).with_events(Box::new(events.clone()));

    let report = api.index_folder(&root.folder(), None).unwrap();
    assert_eq!((report.files, report.directories, report.total_bytes), (2, 1, 5));
    let last = events.events.lock().unwrap().last().cloned();
    assert!(matches!(last, Some(EngineEvent::IndexingProgress { done: true, scanned: 3, .. })));
}

#[test]
fn cancelled_index_stops_early() {
    let root = TestRoot::new();
    root.write("a.txt", b"abc");
    let api = engine(&root);
    let cancel = CancelToken::new();
    cancel.cancel();
    let report = api.index_folder(&root.folder(), Some(&cancel)).unwrap();
    assert_eq!(report.files, 0);
}
