//! Background writer thread for a [`RecordStore`].
//!
//! The pipeline hands records to a [`SinkHandle`], which enqueues them on a
//! bounded channel with a send timeout. A single `sink-writer` thread owns the
//! store, drains the channel in batches, and logs every failed write. If the
//! store falls so far behind that the channel stays full for longer than the
//! timeout, the record is dropped and counted instead of stalling the scan.
//! After one timeout the handle is marked stalled: later appends only try the
//! channel once and drop immediately if it is still full, until a send
//! succeeds again.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender, TrySendError};

use super::{RecordStore, SinkError, SinkResult};
use crate::scanner::FileRecord;

/// Default channel capacity between the pipeline and the writer thread.
pub const DEFAULT_SINK_CAPACITY: usize = 1024;

/// Default time an append may wait for channel space.
pub const DEFAULT_SINK_TIMEOUT: Duration = Duration::from_millis(250);

/// Maximum records written per batch.
const BATCH_SIZE: usize = 256;

enum SinkMessage {
    Append(FileRecord),
    Shutdown,
}

/// Outcome counters for one writer's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    /// Records the store accepted
    pub written: u64,
    /// Records the store rejected
    pub failed: u64,
    /// Records dropped before reaching the writer (timeout or closed)
    pub dropped: u64,
}

/// Cheap, cloneable sending side of a [`SinkWriter`].
#[derive(Clone)]
pub struct SinkHandle {
    tx: Sender<SinkMessage>,
    timeout: Duration,
    dropped: Arc<AtomicU64>,
    stalled: Arc<AtomicBool>,
}

impl std::fmt::Debug for SinkHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkHandle")
            .field("timeout", &self.timeout)
            .field("dropped", &self.dropped.load(Ordering::Relaxed))
            .field("stalled", &self.stalled.load(Ordering::Relaxed))
            .finish()
    }
}

impl SinkHandle {
    /// Queue a record for persistence.
    ///
    /// Waits at most the configured timeout for channel space, or not at all
    /// while the writer is stalled. Returns `false` if the record was dropped.
    pub fn append(&self, record: FileRecord) -> bool {
        if self.stalled.load(Ordering::Relaxed) {
            return self.try_append(record);
        }

        match self.tx.send_timeout(SinkMessage::Append(record), self.timeout) {
            Ok(()) => true,
            Err(SendTimeoutError::Timeout(SinkMessage::Append(record))) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                if !self.stalled.swap(true, Ordering::Relaxed) {
                    log::warn!(
                        "Sink busy for {:?}, dropping records until it catches up (first: {})",
                        self.timeout,
                        record.path().display()
                    );
                }
                false
            }
            Err(SendTimeoutError::Disconnected(_)) | Err(SendTimeoutError::Timeout(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::debug!("Sink writer gone, record dropped");
                false
            }
        }
    }

    fn try_append(&self, record: FileRecord) -> bool {
        match self.tx.try_send(SinkMessage::Append(record)) {
            Ok(()) => {
                if self.stalled.swap(false, Ordering::Relaxed) {
                    log::info!(
                        "Sink caught up after {} dropped records",
                        self.dropped.load(Ordering::Relaxed)
                    );
                }
                true
            }
            Err(TrySendError::Full(SinkMessage::Append(record))) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::trace!("Sink stalled, dropped record for {}", record.path().display());
                false
            }
            Err(TrySendError::Disconnected(_)) | Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::debug!("Sink writer gone, record dropped");
                false
            }
        }
    }

    /// Records dropped so far through any handle of this writer.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Owner of the writer thread.
///
/// Dropping a `SinkWriter` without calling [`finish`](Self::finish) still
/// stops and joins the thread; the store is then dropped with it.
pub struct SinkWriter {
    handle: SinkHandle,
    thread: Option<JoinHandle<(Box<dyn RecordStore>, SinkStats)>>,
}

impl std::fmt::Debug for SinkWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkWriter")
            .field("handle", &self.handle)
            .field("running", &self.thread.is_some())
            .finish()
    }
}

impl SinkWriter {
    /// Start a writer thread that owns `store`.
    ///
    /// # Arguments
    ///
    /// * `store` - Destination for records
    /// * `capacity` - Channel capacity (clamped to at least 1)
    /// * `timeout` - Longest an append waits for channel space
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Spawn`] if the thread cannot be created.
    pub fn spawn(
        store: Box<dyn RecordStore>,
        capacity: usize,
        timeout: Duration,
    ) -> SinkResult<Self> {
        let (tx, rx) = bounded(capacity.max(1));
        let thread = thread::Builder::new()
            .name("sink-writer".to_string())
            .spawn(move || writer_loop(store, rx))
            .map_err(SinkError::Spawn)?;

        Ok(Self {
            handle: SinkHandle {
                tx,
                timeout,
                dropped: Arc::new(AtomicU64::new(0)),
                stalled: Arc::new(AtomicBool::new(false)),
            },
            thread: Some(thread),
        })
    }

    /// A new sending handle.
    #[must_use]
    pub fn handle(&self) -> SinkHandle {
        self.handle.clone()
    }

    /// Drain pending records, stop the thread, and return the store.
    ///
    /// Records sent through handles after this call are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer thread panicked.
    pub fn finish(mut self) -> anyhow::Result<(Box<dyn RecordStore>, SinkStats)> {
        let (store, mut stats) = self.stop().ok_or_else(|| anyhow::anyhow!("sink writer panicked"))?;
        stats.dropped = self.handle.dropped();
        log::debug!(
            "Sink writer finished: {} written, {} failed, {} dropped",
            stats.written,
            stats.failed,
            stats.dropped
        );
        Ok((store, stats))
    }

    fn stop(&mut self) -> Option<(Box<dyn RecordStore>, SinkStats)> {
        let thread = self.thread.take()?;
        // The writer keeps draining while we wait, so this cannot deadlock.
        let _ = self.handle.tx.send(SinkMessage::Shutdown);
        thread.join().ok()
    }
}

impl Drop for SinkWriter {
    fn drop(&mut self) {
        if self.thread.is_some() {
            let _ = self.stop();
        }
    }
}

fn writer_loop(
    mut store: Box<dyn RecordStore>,
    rx: Receiver<SinkMessage>,
) -> (Box<dyn RecordStore>, SinkStats) {
    log::debug!("Sink writer started");
    let mut stats = SinkStats::default();
    let mut pending: Vec<FileRecord> = Vec::with_capacity(BATCH_SIZE);

    while let Ok(message) = rx.recv() {
        let mut shutdown = false;
        match message {
            SinkMessage::Append(record) => pending.push(record),
            SinkMessage::Shutdown => shutdown = true,
        }

        // Opportunistically batch whatever is already queued.
        while !shutdown && pending.len() < BATCH_SIZE {
            match rx.try_recv() {
                Ok(SinkMessage::Append(record)) => pending.push(record),
                Ok(SinkMessage::Shutdown) => shutdown = true,
                Err(_) => break,
            }
        }

        write_batch(store.as_mut(), &mut pending, &mut stats);
        if shutdown {
            break;
        }
    }

    // Anything queued behind the shutdown message still gets written.
    for message in rx.try_iter() {
        if let SinkMessage::Append(record) = message {
            pending.push(record);
        }
    }
    write_batch(store.as_mut(), &mut pending, &mut stats);

    if let Err(e) = store.flush() {
        log::error!("Sink flush failed: {}", e);
    }
    log::debug!("Sink writer stopped after {} records", stats.written);
    (store, stats)
}

fn write_batch(store: &mut dyn RecordStore, pending: &mut Vec<FileRecord>, stats: &mut SinkStats) {
    if pending.is_empty() {
        return;
    }
    match store.append_batch(pending) {
        Ok(()) => stats.written += pending.len() as u64,
        Err(e) => {
            // Retry singly so one bad record does not sink the whole batch.
            log::debug!("Batch write failed ({}), retrying records individually", e);
            for record in pending.iter() {
                match store.append(record) {
                    Ok(()) => stats.written += 1,
                    Err(e) => {
                        stats.failed += 1;
                        log::error!("Sink write failed for {}: {}", record.path().display(), e);
                    }
                }
            }
        }
    }
    pending.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Fingerprint;
    use crate::sink::{MemoryStore, StoredDuplicate};
    use std::path::PathBuf;
    use std::sync::Mutex;

    fn record(path: &str) -> FileRecord {
        FileRecord::hashed(PathBuf::from(path), Fingerprint::from_bytes([1; 32]), 1)
    }

    /// Store that rejects every write.
    struct FailingStore;

    impl RecordStore for FailingStore {
        fn append(&mut self, _record: &FileRecord) -> SinkResult<()> {
            Err(SinkError::Database(rusqlite::Error::InvalidQuery))
        }
        fn query_by_fingerprint(&self, _fp: &Fingerprint) -> SinkResult<Vec<PathBuf>> {
            Ok(Vec::new())
        }
        fn query_duplicate_fingerprints(&self) -> SinkResult<Vec<StoredDuplicate>> {
            Ok(Vec::new())
        }
    }

    /// Store that blocks on its first write until released.
    struct GatedStore {
        gate: Arc<Mutex<()>>,
    }

    impl RecordStore for GatedStore {
        fn append(&mut self, _record: &FileRecord) -> SinkResult<()> {
            let _guard = self.gate.lock().unwrap();
            Ok(())
        }
        fn query_by_fingerprint(&self, _fp: &Fingerprint) -> SinkResult<Vec<PathBuf>> {
            Ok(Vec::new())
        }
        fn query_duplicate_fingerprints(&self) -> SinkResult<Vec<StoredDuplicate>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_writer_persists_all_records() {
        let writer =
            SinkWriter::spawn(Box::new(MemoryStore::new()), 4, Duration::from_secs(5)).unwrap();
        let handle = writer.handle();
        for i in 0..100 {
            assert!(handle.append(record(&format!("/f{}", i))));
        }
        drop(handle);

        let (store, stats) = writer.finish().unwrap();
        assert_eq!(stats.written, 100);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.dropped, 0);
        assert_eq!(store.query_by_fingerprint(&Fingerprint::from_bytes([1; 32])).unwrap().len(), 100);
    }

    #[test]
    fn test_write_failures_are_counted_not_raised() {
        let writer =
            SinkWriter::spawn(Box::new(FailingStore), 8, Duration::from_secs(5)).unwrap();
        let handle = writer.handle();
        handle.append(record("/a"));
        handle.append(record("/b"));

        let (_, stats) = writer.finish().unwrap();
        assert_eq!(stats.written, 0);
        assert_eq!(stats.failed, 2);
    }

    #[test]
    fn test_full_channel_drops_after_timeout() {
        let gate = Arc::new(Mutex::new(()));
        let guard = gate.lock().unwrap();
        let writer = SinkWriter::spawn(
            Box::new(GatedStore {
                gate: Arc::clone(&gate),
            }),
            1,
            Duration::from_millis(20),
        )
        .unwrap();
        let handle = writer.handle();

        assert!(handle.append(record("/f0")));
        // Let the writer pick up /f0 and block inside the store.
        thread::sleep(Duration::from_millis(100));

        // One more fits in the channel, the rest time out.
        let accepted = (1..6)
            .filter(|i| handle.append(record(&format!("/f{}", i))))
            .count();
        assert_eq!(accepted, 1);
        assert_eq!(handle.dropped(), 4);

        drop(guard);
        let (_, stats) = writer.finish().unwrap();
        assert_eq!(stats.written, 2);
        assert_eq!(stats.dropped, 4);
    }

    #[test]
    fn test_stalled_sink_drops_without_waiting() {
        let gate = Arc::new(Mutex::new(()));
        let guard = gate.lock().unwrap();
        let timeout = Duration::from_millis(300);
        let writer = SinkWriter::spawn(
            Box::new(GatedStore {
                gate: Arc::clone(&gate),
            }),
            1,
            timeout,
        )
        .unwrap();
        let handle = writer.handle();

        assert!(handle.append(record("/f0")));
        thread::sleep(Duration::from_millis(100));
        assert!(handle.append(record("/f1")));

        // Only the first overflow pays the timeout.
        assert!(!handle.append(record("/f2")));
        assert!(handle.stalled.load(Ordering::Relaxed));

        let start = std::time::Instant::now();
        for i in 3..50 {
            assert!(!handle.append(record(&format!("/f{}", i))));
        }
        assert!(start.elapsed() < timeout);
        assert_eq!(handle.dropped(), 48);

        // Once the store drains, appends are accepted again.
        drop(guard);
        thread::sleep(Duration::from_millis(100));
        assert!(handle.append(record("/f50")));
        assert!(!handle.stalled.load(Ordering::Relaxed));

        let (_, stats) = writer.finish().unwrap();
        assert_eq!(stats.written, 3);
        assert_eq!(stats.dropped, 48);
    }

    #[test]
    fn test_append_after_finish_is_dropped() {
        let writer =
            SinkWriter::spawn(Box::new(MemoryStore::new()), 2, Duration::from_millis(10)).unwrap();
        let handle = writer.handle();
        let (_, stats) = writer.finish().unwrap();
        assert_eq!(stats.written, 0);

        assert!(!handle.append(record("/late")));
        assert_eq!(handle.dropped(), 1);
    }

    #[test]
    fn test_drop_without_finish_joins_thread() {
        let writer =
            SinkWriter::spawn(Box::new(MemoryStore::new()), 2, Duration::from_secs(1)).unwrap();
        writer.handle().append(record("/a"));
        drop(writer);
    }
}
