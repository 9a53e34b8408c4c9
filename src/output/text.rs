//! Human-readable report.
//!
//! Totals come first, then one block per duplicate group: the fingerprint,
//! the member size, and the member paths in the order they were aggregated.
//!
//! ```text
//! Scanned 3 files (21 B hashed) in 0.01s
//!   Duplicate files:     2 in 1 groups
//!   Unique fingerprints: 2
//!   Unique files:        1
//!   Reclaimable:         7 B
//!
//! [1] 3f2a...9c01 (7 B each, 2 files)
//!     /photos/FileA.jpg
//!     /photos/CopyA.jpg
//! ```

use std::io::{self, Write};

use bytesize::ByteSize;

use crate::duplicates::{DuplicateGroup, ScanSummary};
use crate::sink::StoredDuplicate;

/// Text report formatter.
pub struct TextOutput<'a> {
    groups: &'a [DuplicateGroup],
    summary: &'a ScanSummary,
}

impl<'a> TextOutput<'a> {
    /// Create a formatter over the duplicate groups and summary of one scan.
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup], summary: &'a ScanSummary) -> Self {
        Self { groups, summary }
    }

    /// Write the full report.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from the writer.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        self.write_summary(&mut writer)?;

        for (idx, group) in self.groups.iter().enumerate() {
            writeln!(writer)?;
            writeln!(
                writer,
                "[{}] {} ({} each, {} files)",
                idx + 1,
                group.fingerprint_hex(),
                ByteSize::b(group.size),
                group.len()
            )?;
            for path in &group.paths {
                writeln!(writer, "    {}", path.display())?;
            }
        }

        writer.flush()
    }

    /// Render the report into a string.
    #[must_use]
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_to(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }

    fn write_summary<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let s = self.summary;

        if s.interrupted {
            writeln!(writer, "Scan interrupted; results are partial.")?;
        }

        writeln!(
            writer,
            "Scanned {} files ({} hashed) in {:.2}s",
            s.total_files,
            ByteSize::b(s.bytes_hashed),
            s.scan_duration.as_secs_f64()
        )?;
        writeln!(
            writer,
            "  Duplicate files:     {} in {} groups",
            s.duplicate_files, s.duplicate_groups
        )?;
        writeln!(writer, "  Unique fingerprints: {}", s.unique_fingerprints)?;
        writeln!(writer, "  Unique files:        {}", s.unique_files)?;
        writeln!(
            writer,
            "  Reclaimable:         {} ({:.1}%)",
            ByteSize::b(s.reclaimable_space),
            s.wasted_percentage()
        )?;

        if s.unreadable_files > 0 {
            writeln!(writer, "  Unreadable files:    {}", s.unreadable_files)?;
        }
        if s.skipped_directories > 0 {
            writeln!(writer, "  Skipped directories: {}", s.skipped_directories)?;
        }
        if s.sink_dropped > 0 {
            writeln!(writer, "  Records not stored:  {}", s.sink_dropped)?;
        }
        Ok(())
    }
}

/// Write the paths stored for one fingerprint, one per line.
///
/// # Errors
///
/// Returns any I/O error from the writer.
pub fn write_lookup<W: Write>(mut writer: W, paths: &[std::path::PathBuf]) -> io::Result<()> {
    for path in paths {
        writeln!(writer, "{}", path.display())?;
    }
    writer.flush()
}

/// Write the store-wide duplicate listing.
///
/// # Errors
///
/// Returns any I/O error from the writer.
pub fn write_stored<W: Write>(mut writer: W, duplicates: &[StoredDuplicate]) -> io::Result<()> {
    writeln!(
        writer,
        "{} fingerprints stored for two or more paths",
        duplicates.len()
    )?;
    for (idx, dup) in duplicates.iter().enumerate() {
        writeln!(writer)?;
        writeln!(
            writer,
            "[{}] {} ({} paths)",
            idx + 1,
            dup.fingerprint.to_hex(),
            dup.count
        )?;
        for path in &dup.paths {
            writeln!(writer, "    {}", path.display())?;
        }
    }
    writer.flush()
}
