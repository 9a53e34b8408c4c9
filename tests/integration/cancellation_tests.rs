use dupecheck::duplicates::{DuplicateFinder, FinderConfig};
use dupecheck::progress::ProgressCallback;
use dupecheck::signal::ShutdownHandler;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

/// Raises the shutdown flag once `after` files have been aggregated.
struct StopAfter {
    after: usize,
    flag: Arc<AtomicBool>,
}

impl ProgressCallback for StopAfter {
    fn on_phase_start(&self, _phase: &str, _total: usize) {}

    fn on_progress(&self, current: usize, _path: &str) {
        if current == self.after {
            self.flag.store(true, Ordering::SeqCst);
        }
    }

    fn on_phase_end(&self, _phase: &str) {}
}

#[test]
fn test_shutdown_before_start_reports_nothing() {
    let dir = tempdir().unwrap();
    for i in 0..10 {
        fs::write(dir.path().join(format!("{}.txt", i)), b"same").unwrap();
    }

    let handler = ShutdownHandler::new();
    handler.request_shutdown();
    let finder = DuplicateFinder::new(FinderConfig::default().with_shutdown_flag(handler.get_flag()));

    let (groups, summary) = finder.find_duplicates(dir.path()).unwrap();
    assert!(summary.interrupted);
    assert_eq!(summary.total_files, 0);
    assert!(groups.is_empty());
}

#[test]
fn test_shutdown_mid_run_keeps_partial_results() {
    let dir = tempdir().unwrap();
    for i in 0..200 {
        fs::write(dir.path().join(format!("{:03}.txt", i)), [(i % 2) as u8; 16]).unwrap();
    }

    let handler = ShutdownHandler::new();
    let callback = Arc::new(StopAfter {
        after: 5,
        flag: handler.get_flag(),
    });
    let finder = DuplicateFinder::new(
        FinderConfig::default()
            .with_io_threads(2)
            .with_queue_capacity(4)
            .with_shutdown_flag(handler.get_flag())
            .with_progress_callback(callback),
    );

    let (groups, summary) = finder.find_duplicates(dir.path()).unwrap();

    assert!(summary.interrupted);
    assert!(summary.total_files >= 5);
    assert!(summary.total_files < 200);
    assert_eq!(
        summary.total_files,
        summary.fingerprinted_files + summary.unreadable_files
    );
    assert!(summary.peak_in_flight <= 2 + 4);

    let grouped: usize = groups.iter().map(|g| g.len()).sum();
    assert_eq!(grouped, summary.duplicate_files);
}

#[test]
fn test_finder_is_reusable_after_reset() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"x").unwrap();
    fs::write(dir.path().join("b"), b"x").unwrap();

    let handler = ShutdownHandler::new();
    let finder = DuplicateFinder::new(FinderConfig::default().with_shutdown_flag(handler.get_flag()));

    handler.request_shutdown();
    let (_, interrupted) = finder.find_duplicates(dir.path()).unwrap();
    assert!(interrupted.interrupted);

    handler.reset();
    let (groups, complete) = finder.find_duplicates(dir.path()).unwrap();
    assert!(!complete.interrupted);
    assert_eq!(groups.len(), 1);
}
