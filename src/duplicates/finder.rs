//! Concurrent scan-hash-aggregate pipeline.
//!
//! # Overview
//!
//! [`DuplicateFinder`] wires three stages together:
//!
//! ```text
//! scanner thread ──bounded(C)──▶ N hashing workers ──unbounded──▶ aggregator
//!   (Walker)        paths          (rayon pool)       records     (DuplicateIndex)
//! ```
//!
//! 1. **Scanner**: a single `scanner` thread walks the root and pushes paths
//!    into a bounded channel. When the channel is full it blocks, so a fast
//!    walk can never outrun hashing.
//! 2. **Hashing**: `N` workers on a dedicated rayon pool pull paths, hash
//!    them block by block, and publish one [`FileRecord`] per path.
//! 3. **Aggregation**: the calling thread folds records into the
//!    [`DuplicateIndex`] in completion order and forwards each record to the
//!    optional sink.
//!
//! The aggregation loop ends once every worker has dropped its result sender,
//! which happens only after the scanner finished and the path channel drained.
//! Every enumerated path therefore yields exactly one record.
//!
//! # Example
//!
//! ```no_run
//! use dupecheck::duplicates::{DuplicateFinder, FinderConfig};
//! use std::path::Path;
//!
//! let config = FinderConfig::default().with_io_threads(4);
//! let finder = DuplicateFinder::new(config);
//!
//! let (groups, summary) = finder.find_duplicates(Path::new("/some/path")).unwrap();
//! println!("{} files, {} duplicate groups", summary.total_files, groups.len());
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use super::{DuplicateGroup, DuplicateIndex};
use crate::progress::ProgressCallback;
use crate::scanner::{FileRecord, HashAlgorithm, Hasher, ScanError, Walker, WalkerConfig};
use crate::sink::SinkHandle;

/// Default capacity of the path channel between scanner and workers.
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Number of hashing workers (N). Default is 1: fully sequential.
    pub io_threads: usize,
    /// Capacity of the path channel (C).
    pub queue_capacity: usize,
    /// Digest used for fingerprints.
    pub algorithm: HashAlgorithm,
    /// Walker configuration for directory traversal.
    pub walker_config: WalkerConfig,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback for reporting.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
    /// Optional record sink; every processed file is forwarded to it.
    pub sink: Option<SinkHandle>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("io_threads", &self.io_threads)
            .field("queue_capacity", &self.queue_capacity)
            .field("algorithm", &self.algorithm)
            .field("walker_config", &self.walker_config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .field("sink", &self.sink)
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            io_threads: 1,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            algorithm: HashAlgorithm::default(),
            walker_config: WalkerConfig::default(),
            shutdown_flag: None,
            progress_callback: None,
            sink: None,
        }
    }
}

impl FinderConfig {
    /// Set the number of hashing workers (at least 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the path channel capacity (at least 1).
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Set the fingerprint algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Forward every record to a sink.
    #[must_use]
    pub fn with_sink(mut self, sink: SinkHandle) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Most files that can sit between enumeration and aggregation.
    #[must_use]
    pub fn in_flight_limit(&self) -> usize {
        self.io_threads.max(1) + self.queue_capacity.max(1)
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Summary statistics from one scan.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Files that produced a record (fingerprinted + unreadable)
    pub total_files: usize,
    /// Files hashed to the end
    pub fingerprinted_files: usize,
    /// Files recorded without a fingerprint
    pub unreadable_files: usize,
    /// Groups with two or more members
    pub duplicate_groups: usize,
    /// Files belonging to a duplicate group
    pub duplicate_files: usize,
    /// Distinct fingerprints (one per group, singletons included)
    pub unique_fingerprints: usize,
    /// Files whose content appeared exactly once
    pub unique_files: usize,
    /// Bytes read across all fingerprinted files
    pub bytes_hashed: u64,
    /// Bytes that removing all but one copy of each group would free
    pub reclaimable_space: u64,
    /// Directories (or symlink loops) skipped because they could not be listed
    pub skipped_directories: usize,
    /// Queued paths discarded after shutdown was requested
    pub discarded_paths: usize,
    /// Most files observed in flight between enumeration and aggregation
    pub peak_in_flight: usize,
    /// Records the sink dropped because it was too slow or gone
    pub sink_dropped: u64,
    /// Wall-clock time of the whole run
    pub scan_duration: Duration,
    /// Whether the scan was stopped by a shutdown request
    pub interrupted: bool,
}

impl ScanSummary {
    /// Files that went into some group: `total_files - unreadable_files`.
    #[must_use]
    pub fn grouped_files(&self) -> usize {
        self.total_files - self.unreadable_files
    }

    /// Percentage of hashed bytes that are redundant copies.
    #[must_use]
    pub fn wasted_percentage(&self) -> f64 {
        if self.bytes_hashed == 0 {
            0.0
        } else {
            (self.reclaimable_space as f64 / self.bytes_hashed as f64) * 100.0
        }
    }
}

/// Errors that abort a scan.
///
/// Per-file and per-directory failures never appear here; they are logged
/// and reflected in [`ScanSummary`].
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The provided root does not exist or cannot be read.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The hashing pool could not be created.
    #[error("Failed to start hashing workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// The scanner thread could not be created.
    #[error("Failed to spawn scanner thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The scanner thread panicked; enumeration is incomplete.
    #[error("Scanner thread panicked")]
    ScannerPanicked,
}

/// Result of one completed (or interrupted) scan.
///
/// Owns the duplicate index built by the aggregator. Consumed by
/// [`ScanSession::into_report`] once the report has been produced.
#[derive(Debug)]
pub struct ScanSession {
    index: DuplicateIndex,
    summary: ScanSummary,
}

impl ScanSession {
    /// The populated duplicate index.
    #[must_use]
    pub fn index(&self) -> &DuplicateIndex {
        &self.index
    }

    /// Totals for this run.
    #[must_use]
    pub fn summary(&self) -> &ScanSummary {
        &self.summary
    }

    /// Files seen, readable or not.
    #[must_use]
    pub fn total_files(&self) -> usize {
        self.index.total_files()
    }

    /// Files belonging to a duplicate group.
    #[must_use]
    pub fn duplicate_files(&self) -> usize {
        self.index.duplicate_files()
    }

    /// Wall-clock time of the run.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.summary.scan_duration
    }

    /// Whether the run stopped early on a shutdown request.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.summary.interrupted
    }

    /// Duplicate groups in first-seen order, plus the summary.
    #[must_use]
    pub fn into_report(self) -> (Vec<DuplicateGroup>, ScanSummary) {
        (self.index.into_duplicate_groups(), self.summary)
    }
}

/// Caps files in flight between enumeration and aggregation.
///
/// The scanner takes a permit before enqueuing a path; the permit is returned
/// once the path's record has been aggregated (or the path was discarded).
/// Permits are slots in a bounded channel, so taking one blocks while the
/// budget is exhausted.
struct InFlightBudget {
    permits_tx: Sender<()>,
    permits_rx: Receiver<()>,
    peak: AtomicUsize,
}

impl InFlightBudget {
    fn new(limit: usize) -> Self {
        let (permits_tx, permits_rx) = bounded(limit.max(1));
        Self {
            permits_tx,
            permits_rx,
            peak: AtomicUsize::new(0),
        }
    }

    fn acquire(&self) {
        // The receiver lives in `self`, so the channel never disconnects.
        let _ = self.permits_tx.send(());
        self.peak
            .fetch_max(self.permits_tx.len(), Ordering::Relaxed);
    }

    fn release(&self) {
        let _ = self.permits_rx.try_recv();
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }
}

/// What the scanner thread observed.
#[derive(Debug, Default)]
struct WalkStats {
    enumerated: usize,
    skipped_directories: usize,
}

/// Duplicate finder that runs the scan-hash-aggregate pipeline.
pub struct DuplicateFinder {
    config: FinderConfig,
    hasher: Hasher,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        let hasher = Hasher::new(config.algorithm);
        Self { config, hasher }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// The configuration this finder runs with.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Scan `path` and return duplicate groups with summary statistics.
    ///
    /// # Errors
    ///
    /// See [`DuplicateFinder::scan`].
    pub fn find_duplicates(
        &self,
        path: &Path,
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        self.scan(path).map(ScanSession::into_report)
    }

    /// Run the full pipeline over `path`.
    ///
    /// Returns once enumeration is exhausted, every path has been hashed, and
    /// every record has been aggregated. If the shutdown flag is raised, the
    /// run stops early and the session is marked interrupted; everything
    /// aggregated up to that point is kept.
    ///
    /// # Errors
    ///
    /// - [`FinderError::PathNotFound`] if the root does not exist or cannot be
    ///   read (nothing runs)
    /// - [`FinderError::ThreadPool`] / [`FinderError::Spawn`] if the pipeline
    ///   threads cannot be started
    /// - [`FinderError::ScannerPanicked`] if enumeration died mid-walk
    pub fn scan(&self, path: &Path) -> Result<ScanSession, FinderError> {
        let start_time = Instant::now();

        let mut walker = Walker::new(path, self.config.walker_config.clone());
        if let Some(ref flag) = self.config.shutdown_flag {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }
        walker.validate_root().map_err(|e| match e {
            ScanError::PathNotFound(p) => FinderError::PathNotFound(p),
            _ => FinderError::PathNotFound(path.to_path_buf()),
        })?;

        let workers = self.config.io_threads.max(1);
        let capacity = self.config.queue_capacity.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("hasher-{}", i))
            .panic_handler(|_| log::error!("Hashing worker panicked"))
            .build()?;

        log::info!(
            "Scanning {} with {} worker(s), queue capacity {}, {}",
            path.display(),
            workers,
            capacity,
            self.config.algorithm
        );

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start("scanning", 0);
            callback.on_message(&format!("Scanning {}", path.display()));
        }

        let budget = Arc::new(InFlightBudget::new(workers + capacity));
        let discarded = Arc::new(AtomicUsize::new(0));
        let (path_tx, path_rx) = bounded::<PathBuf>(capacity);
        let (result_tx, result_rx) = unbounded::<FileRecord>();

        for _ in 0..workers {
            let worker = HashWorker {
                hasher: self.hasher,
                paths: path_rx.clone(),
                results: result_tx.clone(),
                budget: Arc::clone(&budget),
                discarded: Arc::clone(&discarded),
                shutdown_flag: self.config.shutdown_flag.clone(),
            };
            pool.spawn(move || worker.run());
        }
        // Only the workers may keep these ends open.
        drop(path_rx);
        drop(result_tx);

        let mut index = DuplicateIndex::new();
        let walk_stats = thread::scope(|scope| -> Result<WalkStats, FinderError> {
            let scanner_budget = Arc::clone(&budget);
            let walker = &walker;
            let scanner = thread::Builder::new()
                .name("scanner".to_string())
                .spawn_scoped(scope, move || produce_paths(walker, path_tx, &scanner_budget))
                .map_err(FinderError::Spawn)?;

            self.aggregate(&result_rx, &budget, &mut index);

            scanner.join().map_err(|_| FinderError::ScannerPanicked)
        })?;

        let interrupted = self.config.is_shutdown_requested();
        let sink_dropped = self.config.sink.as_ref().map_or(0, SinkHandle::dropped);

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end("scanning");
        }

        let summary = ScanSummary {
            total_files: index.total_files(),
            fingerprinted_files: index.fingerprinted_files(),
            unreadable_files: index.unreadable_files(),
            duplicate_groups: index.duplicate_group_count(),
            duplicate_files: index.duplicate_files(),
            unique_fingerprints: index.unique_fingerprints(),
            unique_files: index.unique_files(),
            bytes_hashed: index.bytes_hashed(),
            reclaimable_space: index.duplicate_groups().map(DuplicateGroup::wasted_space).sum(),
            skipped_directories: walk_stats.skipped_directories,
            discarded_paths: discarded.load(Ordering::Relaxed),
            peak_in_flight: budget.peak(),
            sink_dropped,
            scan_duration: start_time.elapsed(),
            interrupted,
        };

        if interrupted {
            log::warn!(
                "Scan interrupted: {} of {} enumerated files aggregated",
                summary.total_files,
                walk_stats.enumerated
            );
        } else {
            debug_assert_eq!(summary.total_files, walk_stats.enumerated);
        }
        log::info!(
            "Scan complete: {} files, {} duplicate groups, {} duplicate files in {:.2?}",
            summary.total_files,
            summary.duplicate_groups,
            summary.duplicate_files,
            summary.scan_duration
        );

        Ok(ScanSession { index, summary })
    }

    /// Single consumer: fold records until every worker has hung up.
    fn aggregate(
        &self,
        results: &Receiver<FileRecord>,
        budget: &InFlightBudget,
        index: &mut DuplicateIndex,
    ) {
        for record in results.iter() {
            if let Some(ref sink) = self.config.sink {
                sink.append(record.clone());
            }
            let size = record.size();
            let path_for_progress = self
                .config
                .progress_callback
                .as_ref()
                .map(|_| record.path().to_string_lossy().into_owned());

            index.insert(record);
            budget.release();

            if let (Some(callback), Some(path)) =
                (self.config.progress_callback.as_ref(), path_for_progress)
            {
                callback.on_progress(index.total_files(), &path);
                callback.on_item_completed(size);
            }
        }
    }
}

/// Scanner stage: the only producer of the path channel.
fn produce_paths(walker: &Walker, paths: Sender<PathBuf>, budget: &InFlightBudget) -> WalkStats {
    let mut stats = WalkStats::default();

    for entry in walker.walk() {
        match entry {
            Ok(path) => {
                budget.acquire();
                if paths.send(path).is_err() {
                    // Every worker is gone; nothing left to feed.
                    budget.release();
                    log::error!("Hashing workers exited early, stopping enumeration");
                    break;
                }
                stats.enumerated += 1;
            }
            Err(e) => {
                // Already logged by the walker.
                log::debug!("Skipped during enumeration: {}", e);
                stats.skipped_directories += 1;
            }
        }
    }

    log::debug!(
        "Scanner finished: {} paths enumerated, {} directories skipped",
        stats.enumerated,
        stats.skipped_directories
    );
    stats
}

/// Hashing stage: one per pool thread.
struct HashWorker {
    hasher: Hasher,
    paths: Receiver<PathBuf>,
    results: Sender<FileRecord>,
    budget: Arc<InFlightBudget>,
    discarded: Arc<AtomicUsize>,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl HashWorker {
    fn run(self) {
        for path in self.paths.iter() {
            if self.is_shutdown_requested() {
                // Keep draining so the scanner never blocks on a full queue.
                log::trace!("Shutdown requested, discarding {}", path.display());
                self.discarded.fetch_add(1, Ordering::Relaxed);
                self.budget.release();
                continue;
            }

            let record = self.hasher.fingerprint(path);
            if self.results.send(record).is_err() {
                log::error!("Aggregator gone, hashing worker stopping");
                break;
            }
        }
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}
