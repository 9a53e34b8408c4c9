use dupecheck::duplicates::{DuplicateFinder, DuplicateIndex, FinderConfig, InsertOutcome};
use dupecheck::progress::ProgressCallback;
use dupecheck::scanner::{HashAlgorithm, HashError, Hasher};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

/// Deletes `target` when the first record reaches the aggregator.
struct DeleteOnFirstRecord {
    target: Mutex<Option<PathBuf>>,
}

impl ProgressCallback for DeleteOnFirstRecord {
    fn on_phase_start(&self, _phase: &str, _total: usize) {}

    fn on_progress(&self, _current: usize, _path: &str) {
        if let Some(target) = self.target.lock().unwrap().take() {
            fs::remove_file(&target).unwrap();
        }
    }

    fn on_phase_end(&self, _phase: &str) {}
}

#[test]
fn test_vanished_file_is_recorded_without_fingerprint() {
    let dir = tempdir().unwrap();
    let kept = dir.path().join("kept.txt");
    let gone = dir.path().join("gone.txt");
    fs::write(&kept, b"still here").unwrap();
    fs::write(&gone, b"about to vanish").unwrap();
    fs::remove_file(&gone).unwrap();

    let hasher = Hasher::new(HashAlgorithm::default());
    let mut index = DuplicateIndex::new();

    assert_eq!(
        index.insert(hasher.fingerprint(kept.clone())),
        InsertOutcome::NewGroup
    );
    assert_eq!(
        index.insert(hasher.fingerprint(gone.clone())),
        InsertOutcome::Unreadable
    );

    assert_eq!(index.total_files(), 2);
    assert_eq!(index.fingerprinted_files(), 1);
    assert_eq!(index.unreadable_files(), 1);
    assert_eq!(index.duplicate_files(), 0);
    assert!(index.all_groups().iter().all(|g| !g.paths.contains(&gone)));
}

#[test]
fn test_file_deleted_mid_scan_is_unreadable_and_scan_completes() {
    let dir = tempdir().unwrap();
    for i in 0..20 {
        fs::write(dir.path().join(format!("f{:02}.bin", i)), [i as u8; 256]).unwrap();
    }
    fs::write(dir.path().join("a_twin.bin"), b"shared content").unwrap();
    // Sorts after every other entry.
    let victim = dir.path().join("z_victim.bin");
    fs::write(&victim, b"shared content").unwrap();

    // One worker and a one-slot queue keep at most two paths ahead of the
    // aggregator, so the victim is still waiting when the callback fires.
    let callback = Arc::new(DeleteOnFirstRecord {
        target: Mutex::new(Some(victim.clone())),
    });
    let finder = DuplicateFinder::new(
        FinderConfig::default()
            .with_io_threads(1)
            .with_queue_capacity(1)
            .with_progress_callback(callback),
    );

    let (groups, summary) = finder.find_duplicates(dir.path()).unwrap();

    assert!(!victim.exists());
    assert!(!summary.interrupted);
    assert_eq!(summary.total_files, 22);
    assert_eq!(summary.unreadable_files, 1);
    assert_eq!(summary.fingerprinted_files, 21);
    assert_eq!(
        summary.total_files,
        summary.fingerprinted_files + summary.unreadable_files
    );
    assert!(groups.is_empty());
    assert!(groups.iter().all(|g| !g.paths.contains(&victim)));
}

#[test]
fn test_hash_error_kinds() {
    let hasher = Hasher::new(HashAlgorithm::Blake3);
    match hasher.hash_file(&PathBuf::from("definitely_missing_file.bin")) {
        Err(HashError::NotFound(path)) => {
            assert_eq!(path, PathBuf::from("definitely_missing_file.bin"))
        }
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[cfg(unix)]
fn running_as_root(locked: &std::path::Path) -> bool {
    // Root ignores permission bits.
    fs::read_dir(locked).is_ok() || fs::File::open(locked).is_ok()
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_does_not_stop_scan() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"dup").unwrap();
    fs::write(dir.path().join("b.txt"), b"dup").unwrap();
    let locked = dir.path().join("locked.txt");
    fs::write(&locked, b"dup").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    if running_as_root(&locked) {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
        return;
    }

    let finder = DuplicateFinder::with_defaults();
    let (groups, summary) = finder.find_duplicates(dir.path()).unwrap();

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.unreadable_files, 1);
    assert_eq!(summary.fingerprinted_files, 2);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
    assert!(!groups[0].paths.contains(&locked));
}

#[cfg(unix)]
#[test]
fn test_unlistable_directory_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    fs::write(dir.path().join("top.txt"), b"top").unwrap();
    let sealed = dir.path().join("sealed");
    fs::create_dir(&sealed).unwrap();
    fs::write(sealed.join("inner.txt"), b"inner").unwrap();
    fs::set_permissions(&sealed, fs::Permissions::from_mode(0o000)).unwrap();

    if running_as_root(&sealed) {
        fs::set_permissions(&sealed, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let finder = DuplicateFinder::with_defaults();
    let result = finder.find_duplicates(dir.path());

    fs::set_permissions(&sealed, fs::Permissions::from_mode(0o755)).unwrap();

    let (_, summary) = result.unwrap();
    assert_eq!(summary.total_files, 1);
    assert_eq!(summary.skipped_directories, 1);
}

#[cfg(unix)]
#[test]
fn test_broken_symlink_is_not_hashed() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("real.txt"), b"real").unwrap();
    std::os::unix::fs::symlink(dir.path().join("nowhere"), dir.path().join("dangling")).unwrap();

    let finder = DuplicateFinder::with_defaults();
    let (_, summary) = finder.find_duplicates(dir.path()).unwrap();

    assert_eq!(summary.total_files, 1);
    assert_eq!(summary.unreadable_files, 0);
}
