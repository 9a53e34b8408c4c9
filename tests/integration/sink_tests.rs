use dupecheck::duplicates::{DuplicateFinder, FinderConfig};
use dupecheck::scanner::{FileRecord, Fingerprint};
use dupecheck::sink::{RecordStore, SinkWriter, SqliteStore};
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_scan_persists_every_record_to_sqlite() {
    let dir = tempdir().unwrap();
    let tree = dir.path().join("tree");
    fs::create_dir(&tree).unwrap();
    fs::write(tree.join("a.txt"), b"shared").unwrap();
    fs::write(tree.join("b.txt"), b"shared").unwrap();
    fs::write(tree.join("c.txt"), b"alone").unwrap();
    let db = dir.path().join("records.db");

    let store = SqliteStore::open(&db).unwrap();
    let writer = SinkWriter::spawn(Box::new(store), 16, Duration::from_secs(1)).unwrap();
    let finder = DuplicateFinder::new(FinderConfig::default().with_sink(writer.handle()));

    let (groups, summary) = finder.find_duplicates(&tree).unwrap();
    drop(finder);
    let (_, stats) = writer.finish().unwrap();

    assert_eq!(summary.sink_dropped, 0);
    assert_eq!(stats.written, 3);
    assert_eq!(stats.failed, 0);

    let reopened = SqliteStore::open(&db).unwrap();
    assert_eq!(reopened.record_count().unwrap(), 3);

    let stored = reopened.query_duplicate_fingerprints().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].fingerprint, groups[0].fingerprint);
    assert_eq!(stored[0].count, 2);

    let paths = reopened.query_by_fingerprint(&groups[0].fingerprint).unwrap();
    assert_eq!(paths.len(), 2);
    assert!(paths.contains(&tree.join("a.txt")));
    assert!(paths.contains(&tree.join("b.txt")));
}

#[test]
fn test_rescanning_does_not_double_count_paths() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("records.db");
    let fp = Fingerprint::from_bytes([7; 32]);

    let mut store = SqliteStore::open(&db).unwrap();
    for _ in 0..2 {
        store
            .append_batch(&[
                FileRecord::hashed("/x/one".into(), fp, 4),
                FileRecord::hashed("/x/two".into(), fp, 4),
            ])
            .unwrap();
    }
    store.flush().unwrap();

    let stored = store.query_duplicate_fingerprints().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].count, 2);
    assert_eq!(store.record_count().unwrap(), 4);
}

#[test]
fn test_unreadable_records_are_stored_but_never_duplicates() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    store.append(&FileRecord::unreadable("/locked/a".into())).unwrap();
    store.append(&FileRecord::unreadable("/locked/b".into())).unwrap();

    assert_eq!(store.record_count().unwrap(), 2);
    assert!(store.query_duplicate_fingerprints().unwrap().is_empty());
}
