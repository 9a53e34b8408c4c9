//! CSV output formatter for duplicate scan results.
//!
//! One row is generated for each member of a duplicate group.
//!
//! # Columns
//!
//! - `group_id`: 1-based group number, in report order
//! - `fingerprint`: content fingerprint (hexadecimal)
//! - `path`: member path
//! - `size`: file size in bytes

use std::io;

use serde::Serialize;
use thiserror::Error;

use crate::duplicates::DuplicateGroup;
use crate::sink::StoredDuplicate;

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    group_id: usize,
    fingerprint: &'a str,
    path: String,
    size: u64,
}

#[derive(Debug, Serialize)]
struct StoredRow<'a> {
    group_id: usize,
    fingerprint: &'a str,
    path: String,
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    groups: &'a [DuplicateGroup],
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup]) -> Self {
        Self { groups }
    }

    /// Write the CSV output to the given writer.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        for (idx, group) in self.groups.iter().enumerate() {
            let fingerprint = group.fingerprint_hex();
            for path in &group.paths {
                csv_writer.serialize(CsvRow {
                    group_id: idx + 1,
                    fingerprint: &fingerprint,
                    path: path.to_string_lossy().into_owned(),
                    size: group.size,
                })?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Write the store-wide duplicate listing as `group_id,fingerprint,path` rows.
///
/// # Errors
///
/// Returns `CsvOutputError` if writing or serialization fails.
pub fn write_stored<W: io::Write>(
    writer: W,
    duplicates: &[StoredDuplicate],
) -> Result<(), CsvOutputError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for (idx, dup) in duplicates.iter().enumerate() {
        let fingerprint = dup.fingerprint.to_hex();
        for path in &dup.paths {
            csv_writer.serialize(StoredRow {
                group_id: idx + 1,
                fingerprint: &fingerprint,
                path: path.to_string_lossy().into_owned(),
            })?;
        }
    }
    csv_writer.flush()?;
    Ok(())
}
