//! JSON output formatter for duplicate scan results.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "duplicates": [
//!     {
//!       "fingerprint": "abc123...",
//!       "size": 1024,
//!       "files": ["/path/to/file1.txt", "/path/to/file2.txt"]
//!     }
//!   ],
//!   "summary": {
//!     "total_files": 100,
//!     "duplicate_groups": 5,
//!     "duplicate_files": 10,
//!     "unique_fingerprints": 90,
//!     "reclaimable_space": 51200,
//!     "scan_duration_ms": 1234,
//!     "interrupted": false
//!   }
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use crate::duplicates::{DuplicateGroup, ScanSummary};
use crate::error::ExitCode;
use crate::sink::StoredDuplicate;

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// Content fingerprint as hexadecimal string (64 characters)
    pub fingerprint: String,
    /// File size in bytes
    pub size: u64,
    /// Member paths in aggregation order, absolute where possible
    pub files: Vec<String>,
}

impl JsonDuplicateGroup {
    /// Create a JSON duplicate group from a [`DuplicateGroup`].
    #[must_use]
    pub fn from_duplicate_group(group: &DuplicateGroup) -> Self {
        Self {
            fingerprint: group.fingerprint_hex(),
            size: group.size,
            files: group.paths.iter().map(|p| normalize_path(p)).collect(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Files that produced a record
    pub total_files: usize,
    /// Files hashed to the end
    pub fingerprinted_files: usize,
    /// Files recorded without a fingerprint
    pub unreadable_files: usize,
    /// Groups with two or more members
    pub duplicate_groups: usize,
    /// Files belonging to a duplicate group
    pub duplicate_files: usize,
    /// Distinct fingerprints seen
    pub unique_fingerprints: usize,
    /// Files whose content appeared once
    pub unique_files: usize,
    /// Bytes read while fingerprinting
    pub bytes_hashed: u64,
    /// Bytes freed by keeping one copy per group
    pub reclaimable_space: u64,
    /// Directories skipped because they could not be listed
    pub skipped_directories: usize,
    /// Peak files between enumeration and aggregation
    pub peak_in_flight: usize,
    /// Records the sink dropped
    pub sink_dropped: u64,
    /// Duration of the scan in milliseconds
    pub scan_duration_ms: u64,
    /// Whether the scan was interrupted
    pub interrupted: bool,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DC000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Create a JSON summary from a [`ScanSummary`] and an exit code.
    #[must_use]
    pub fn from_scan_summary(summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            total_files: summary.total_files,
            fingerprinted_files: summary.fingerprinted_files,
            unreadable_files: summary.unreadable_files,
            duplicate_groups: summary.duplicate_groups,
            duplicate_files: summary.duplicate_files,
            unique_fingerprints: summary.unique_fingerprints,
            unique_files: summary.unique_files,
            bytes_hashed: summary.bytes_hashed,
            reclaimable_space: summary.reclaimable_space,
            skipped_directories: summary.skipped_directories,
            peak_in_flight: summary.peak_in_flight,
            sink_dropped: summary.sink_dropped,
            scan_duration_ms: summary.scan_duration.as_millis() as u64,
            interrupted: summary.interrupted,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// List of duplicate groups
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Scan summary statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Create a new JSON output from duplicate groups, summary and exit code.
    ///
    /// # Example
    ///
    /// ```
    /// use dupecheck::duplicates::{DuplicateGroup, ScanSummary};
    /// use dupecheck::error::ExitCode;
    /// use dupecheck::output::json::JsonOutput;
    /// use dupecheck::scanner::Fingerprint;
    /// use std::path::PathBuf;
    ///
    /// let mut group = DuplicateGroup::new(Fingerprint::from_bytes([0; 32]), 1024, PathBuf::from("/a"));
    /// group.push(PathBuf::from("/b"));
    ///
    /// let output = JsonOutput::new(&[group], &ScanSummary::default(), ExitCode::Success);
    /// assert_eq!(output.duplicates.len(), 1);
    /// ```
    #[must_use]
    pub fn new(groups: &[DuplicateGroup], summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            duplicates: groups
                .iter()
                .map(JsonDuplicateGroup::from_duplicate_group)
                .collect(),
            summary: JsonSummary::from_scan_summary(summary, exit_code),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        write_json(self, writer, pretty)
    }
}

/// JSON form of the store-wide duplicate query.
#[derive(Debug, Clone, Serialize)]
pub struct JsonStoreReport<'a> {
    /// Fingerprints stored for two or more distinct paths
    pub duplicates: &'a [StoredDuplicate],
    /// Number of entries in `duplicates`
    pub duplicate_fingerprints: usize,
}

impl<'a> JsonStoreReport<'a> {
    /// Wrap a query result.
    #[must_use]
    pub fn new(duplicates: &'a [StoredDuplicate]) -> Self {
        Self {
            duplicates,
            duplicate_fingerprints: duplicates.len(),
        }
    }

    /// Write JSON to a writer, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        write_json(self, writer, pretty)
    }
}

fn write_json<T: Serialize, W: Write>(
    value: &T,
    writer: &mut W,
    pretty: bool,
) -> Result<(), JsonOutputError> {
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, value)?;
    } else {
        serde_json::to_writer(&mut *writer, value)?;
    }
    writer.write_all(b"\n")?;
    Ok(())
}

/// Normalize a path to an absolute path string.
///
/// Falls back to the display form when the file no longer exists.
fn normalize_path(path: &std::path::Path) -> String {
    match path.canonicalize() {
        Ok(canonical) => canonical.to_string_lossy().into_owned(),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
