//! Optional durable store for scan results.
//!
//! This module decouples persistence from the pipeline:
//!
//! * [`RecordStore`]: the storage contract (append plus two duplicate queries)
//! * [`writer`]: a background writer thread that owns a store and accepts
//!   records without ever blocking the pipeline for long
//! * [`sqlite`]: a SQLite-backed store via rusqlite
//! * [`MemoryStore`]: an in-process store
//!
//! # Failure policy
//!
//! A failed append is logged and counted by the writer thread. It never
//! reaches the pipeline, and the in-memory duplicate report does not depend
//! on the store at all.

pub mod sqlite;
pub mod writer;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::duplicates::groups::fingerprint_hex;
use crate::scanner::{FileRecord, Fingerprint};

pub use sqlite::SqliteStore;
pub use writer::{SinkHandle, SinkStats, SinkWriter};

/// Errors raised by a record store.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    /// The database rejected an operation.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored fingerprint could not be decoded.
    #[error("Corrupt fingerprint in store: {0}")]
    CorruptFingerprint(#[from] crate::scanner::FingerprintParseError),

    /// The store could not be opened.
    #[error("Cannot open store at {path}: {source}")]
    Open {
        /// Location of the store
        path: PathBuf,
        /// The underlying error
        #[source]
        source: rusqlite::Error,
    },

    /// The writer thread could not be started.
    #[error("Failed to spawn sink writer: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Convenience alias for store results.
pub type SinkResult<T> = Result<T, SinkError>;

/// A fingerprint shared by two or more distinct stored paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDuplicate {
    /// The shared fingerprint
    #[serde(with = "fingerprint_hex")]
    pub fingerprint: Fingerprint,
    /// Distinct paths in first-recorded order
    pub paths: Vec<PathBuf>,
    /// Number of distinct paths
    pub count: usize,
}

/// Storage contract for `(path, fingerprint)` records.
///
/// Implementations are used from a single writer thread, so methods take
/// `&mut self` for writes and need no internal locking.
pub trait RecordStore: Send {
    /// Persist one record. Records without a fingerprint are stored too, but
    /// never take part in duplicate queries.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the record could not be stored.
    fn append(&mut self, record: &FileRecord) -> SinkResult<()>;

    /// Persist several records. The default appends one by one and stops at
    /// the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if any record could not be stored.
    fn append_batch(&mut self, records: &[FileRecord]) -> SinkResult<()> {
        records.iter().try_for_each(|record| self.append(record))
    }

    /// Distinct paths recorded with this fingerprint, in first-recorded order.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the store cannot be queried.
    fn query_by_fingerprint(&self, fingerprint: &Fingerprint) -> SinkResult<Vec<PathBuf>>;

    /// Every fingerprint associated with two or more distinct paths.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the store cannot be queried.
    fn query_duplicate_fingerprints(&self) -> SinkResult<Vec<StoredDuplicate>>;

    /// Make appended records durable.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if flushing fails.
    fn flush(&mut self) -> SinkResult<()> {
        Ok(())
    }
}

/// In-process record store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Vec<(PathBuf, Option<Fingerprint>)>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records appended.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether a record for this path was appended.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.records.iter().any(|(p, _)| p == path)
    }
}

impl RecordStore for MemoryStore {
    fn append(&mut self, record: &FileRecord) -> SinkResult<()> {
        self.records
            .push((record.path().to_path_buf(), record.fingerprint()));
        Ok(())
    }

    fn query_by_fingerprint(&self, fingerprint: &Fingerprint) -> SinkResult<Vec<PathBuf>> {
        let mut paths: Vec<PathBuf> = Vec::new();
        for (path, fp) in &self.records {
            if fp.as_ref() == Some(fingerprint) && !paths.contains(path) {
                paths.push(path.clone());
            }
        }
        Ok(paths)
    }

    fn query_duplicate_fingerprints(&self) -> SinkResult<Vec<StoredDuplicate>> {
        let mut order: Vec<Fingerprint> = Vec::new();
        let mut by_fingerprint: HashMap<Fingerprint, Vec<PathBuf>> = HashMap::new();

        for (path, fp) in &self.records {
            let Some(fp) = fp else { continue };
            let paths = by_fingerprint.entry(*fp).or_insert_with(|| {
                order.push(*fp);
                Vec::new()
            });
            if !paths.contains(path) {
                paths.push(path.clone());
            }
        }

        Ok(order
            .into_iter()
            .filter_map(|fingerprint| {
                let paths = by_fingerprint.remove(&fingerprint)?;
                (paths.len() >= 2).then(|| StoredDuplicate {
                    fingerprint,
                    count: paths.len(),
                    paths,
                })
            })
            .collect())
    }
}
