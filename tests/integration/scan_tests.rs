use dupecheck::duplicates::{DuplicateFinder, FinderConfig, FinderError};
use dupecheck::scanner::{HashAlgorithm, WalkerConfig};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tempfile::tempdir;

fn write(path: PathBuf, content: &[u8]) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    File::create(&path).unwrap().write_all(content).unwrap();
    path
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let finder = DuplicateFinder::with_defaults();

    let (groups, summary) = finder.find_duplicates(dir.path()).unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 0);
    assert_eq!(summary.duplicate_groups, 0);
    assert_eq!(summary.duplicate_files, 0);
    assert!(!summary.interrupted);
}

#[test]
fn test_scan_unique_files() {
    let dir = tempdir().unwrap();
    write(dir.path().join("a.txt"), b"content a");
    write(dir.path().join("b.txt"), b"content b");
    write(dir.path().join("c.txt"), b"content c");

    let finder = DuplicateFinder::with_defaults();
    let (groups, summary) = finder.find_duplicates(dir.path()).unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.unique_fingerprints, 3);
    assert_eq!(summary.unique_files, 3);
    assert_eq!(summary.duplicate_files, 0);
}

#[test]
fn test_scan_photo_scenario() {
    let dir = tempdir().unwrap();
    let file_a = write(dir.path().join("FileA.jpg"), b"jpeg bytes A");
    let copy_a = write(dir.path().join("CopyA.jpg"), b"jpeg bytes A");
    write(dir.path().join("FileB.jpg"), b"jpeg bytes B");

    let finder = DuplicateFinder::with_defaults();
    let (groups, summary) = finder.find_duplicates(dir.path()).unwrap();

    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.duplicate_groups, 1);
    assert_eq!(summary.duplicate_files, 2);
    assert_eq!(summary.unique_files, 1);
    assert_eq!(summary.unique_fingerprints, 2);

    assert_eq!(groups.len(), 1);
    let mut members = groups[0].paths.clone();
    members.sort();
    let mut expected = vec![file_a, copy_a];
    expected.sort();
    assert_eq!(members, expected);
}

#[test]
fn test_scan_nested_directories() {
    let dir = tempdir().unwrap();
    write(dir.path().join("a.txt"), b"same");
    write(dir.path().join("sub").join("b.txt"), b"same");
    write(dir.path().join("sub").join("deeper").join("c.txt"), b"same");

    let finder = DuplicateFinder::with_defaults();
    let (groups, summary) = finder.find_duplicates(dir.path()).unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 3);
    assert_eq!(summary.duplicate_files, 3);
    assert_eq!(summary.reclaimable_space, 8);
}

#[test]
fn test_scan_is_idempotent() {
    let dir = tempdir().unwrap();
    for i in 0..12 {
        write(dir.path().join(format!("f{:02}.bin", i)), &[(i % 4) as u8; 64]);
    }

    let finder = DuplicateFinder::new(FinderConfig::default().with_io_threads(4));
    let (first, first_summary) = finder.find_duplicates(dir.path()).unwrap();
    let (second, second_summary) = finder.find_duplicates(dir.path()).unwrap();

    assert_eq!(first_summary.total_files, second_summary.total_files);
    assert_eq!(first_summary.duplicate_files, second_summary.duplicate_files);

    let normalize = |groups: Vec<dupecheck::duplicates::DuplicateGroup>| {
        let mut sets: Vec<(String, Vec<PathBuf>)> = groups
            .into_iter()
            .map(|g| {
                let hex = g.fingerprint_hex();
                let mut paths = g.paths;
                paths.sort();
                (hex, paths)
            })
            .collect();
        sets.sort();
        sets
    };
    assert_eq!(normalize(first), normalize(second));
}

#[test]
fn test_worker_count_does_not_change_grouping() {
    let dir = tempdir().unwrap();
    for i in 0..30 {
        write(
            dir.path().join(format!("d{}", i % 3)).join(format!("{}.dat", i)),
            format!("payload-{}", i % 5).as_bytes(),
        );
    }

    let single = DuplicateFinder::new(FinderConfig::default().with_io_threads(1));
    let many = DuplicateFinder::new(
        FinderConfig::default()
            .with_io_threads(6)
            .with_queue_capacity(2),
    );

    let (_, a) = single.find_duplicates(dir.path()).unwrap();
    let (_, b) = many.find_duplicates(dir.path()).unwrap();

    assert_eq!(a.total_files, 30);
    assert_eq!(a.duplicate_groups, 5);
    assert_eq!(a.duplicate_groups, b.duplicate_groups);
    assert_eq!(a.duplicate_files, b.duplicate_files);
    assert!(b.peak_in_flight <= 6 + 2);
}

#[test]
fn test_scan_with_sha256() {
    let dir = tempdir().unwrap();
    write(dir.path().join("a"), b"abc");
    write(dir.path().join("b"), b"abc");

    let finder = DuplicateFinder::new(FinderConfig::default().with_algorithm(HashAlgorithm::Sha256));
    let (groups, _) = finder.find_duplicates(dir.path()).unwrap();

    assert_eq!(
        groups[0].fingerprint_hex(),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn test_scan_ignore_patterns_and_depth() {
    let dir = tempdir().unwrap();
    write(dir.path().join("keep1.txt"), b"x");
    write(dir.path().join("keep2.txt"), b"x");
    write(dir.path().join("skip.tmp"), b"x");
    write(dir.path().join("deep").join("nested").join("far.txt"), b"x");

    let walker = WalkerConfig::default()
        .with_ignore_patterns(vec!["*.tmp".to_string()])
        .with_max_depth(Some(1));
    let finder = DuplicateFinder::new(FinderConfig::default().with_walker_config(walker));
    let (groups, summary) = finder.find_duplicates(dir.path()).unwrap();

    assert_eq!(summary.total_files, 2);
    assert_eq!(groups[0].len(), 2);
}

#[test]
fn test_scan_single_file_root() {
    let dir = tempdir().unwrap();
    let file = write(dir.path().join("only.txt"), b"alone");

    let finder = DuplicateFinder::with_defaults();
    let (groups, summary) = finder.find_duplicates(&file).unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 1);
    assert_eq!(summary.unique_files, 1);
}

#[test]
fn test_scan_missing_root() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("no-such-dir");

    let finder = DuplicateFinder::with_defaults();
    match finder.find_duplicates(&missing) {
        Err(FinderError::PathNotFound(path)) => assert_eq!(path, missing),
        other => panic!("expected PathNotFound, got {:?}", other.map(|(_, s)| s)),
    }
}

#[test]
fn test_relative_root_reports_absolute_paths() {
    let cwd = std::env::current_dir().unwrap();
    let base = tempfile::Builder::new()
        .prefix("relative-root")
        .tempdir_in(&cwd)
        .unwrap();
    write(base.path().join("a"), b"twin");
    write(base.path().join("b"), b"twin");
    let relative = base.path().strip_prefix(&cwd).unwrap();
    assert!(relative.is_relative());

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(relative)
        .unwrap();

    assert_eq!(summary.duplicate_files, 2);
    assert!(groups[0].paths.iter().all(|p| p.is_absolute()));
    assert!(groups[0].paths.contains(&base.path().join("a")));
}

#[cfg(unix)]
#[test]
fn test_unreadable_root_fails_the_run() {
    let dir = tempdir().unwrap();
    let socket = dir.path().join("not-a-tree.sock");
    let _listener = std::os::unix::net::UnixListener::bind(&socket).unwrap();

    match DuplicateFinder::with_defaults().find_duplicates(&socket) {
        Err(FinderError::PathNotFound(path)) => assert_eq!(path, socket),
        other => panic!("expected PathNotFound, got {:?}", other.map(|(_, s)| s)),
    }
}
