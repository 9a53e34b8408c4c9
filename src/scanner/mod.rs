//! Scanner module for directory traversal and file fingerprinting.
//!
//! This module provides functionality for:
//! - Sequential directory walking using walkdir
//! - Streaming content fingerprints (BLAKE3 or SHA-256)
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`hasher`]: Block-wise content hashing producing [`FileRecord`]s
//!
//! # Example
//!
//! ```no_run
//! use dupecheck::scanner::{HashAlgorithm, Hasher, Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("."), WalkerConfig::default());
//! let hasher = Hasher::new(HashAlgorithm::Blake3);
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(path) => {
//!             let record = hasher.fingerprint(path);
//!             println!("{}: {:?}", record.path().display(), record.fingerprint());
//!         }
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod hasher;
pub mod walker;

use std::path::{Path, PathBuf};

// Re-export main types
pub use hasher::{Fingerprint, FingerprintParseError, HashAlgorithm, Hasher, BLOCK_SIZE};
pub use walker::Walker;

/// Outcome of fingerprinting a single file.
///
/// A record is immutable once created. The fingerprint is `None` when the
/// file vanished or could not be read at hashing time.
#[derive(Debug, Clone)]
pub struct FileRecord {
    path: PathBuf,
    fingerprint: Option<Fingerprint>,
    size: u64,
}

impl FileRecord {
    /// Create a record for a file that was read to the end.
    ///
    /// # Arguments
    ///
    /// * `path` - Path of the hashed file
    /// * `fingerprint` - Digest of the full content
    /// * `size` - Number of bytes that went into the digest
    #[must_use]
    pub fn hashed(path: PathBuf, fingerprint: Fingerprint, size: u64) -> Self {
        Self {
            path,
            fingerprint: Some(fingerprint),
            size,
        }
    }

    /// Create a record for a file that could not be read.
    #[must_use]
    pub fn unreadable(path: PathBuf) -> Self {
        Self {
            path,
            fingerprint: None,
            size: 0,
        }
    }

    /// Path of the file this record describes.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Content fingerprint, if the file was readable.
    #[must_use]
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        self.fingerprint
    }

    /// Bytes hashed (0 for unreadable files).
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Whether a fingerprint was computed.
    #[must_use]
    pub fn is_readable(&self) -> bool {
        self.fingerprint.is_some()
    }

    /// Consume the record, returning its path.
    #[must_use]
    pub fn into_path(self) -> PathBuf {
        self.path
    }

    /// Content equivalence.
    ///
    /// True only when both records carry a fingerprint and the fingerprints
    /// are byte-equal. A record without a fingerprint is never equivalent to
    /// anything, including itself.
    #[must_use]
    pub fn same_content(&self, other: &FileRecord) -> bool {
        matches!((self.fingerprint, other.fingerprint), (Some(a), Some(b)) if a == b)
    }
}

/// Configuration for directory walking.
///
/// Controls filtering and symlink handling. The defaults visit every
/// regular file under the root exactly once.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal.
    /// Symlink cycles are reported as errors and skipped.
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,

    /// Glob patterns to ignore (gitignore-style), matched relative to the root.
    pub ignore_patterns: Vec<String>,

    /// Maximum recursion depth (the root is depth 0).
    pub max_depth: Option<usize>,
}

impl WalkerConfig {
    /// Enable or disable following symbolic links.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Enable or disable skipping hidden entries.
    #[must_use]
    pub fn with_skip_hidden(mut self, skip: bool) -> Self {
        self.skip_hidden = skip;
        self
    }

    /// Set the gitignore-style ignore patterns.
    #[must_use]
    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    /// Limit the recursion depth.
    #[must_use]
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// The scan root does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// A directory could not be listed; its subtree was skipped.
    #[error("Cannot list directory {path}: {source}")]
    DirectoryListing {
        /// Directory that failed to list
        path: PathBuf,
        /// The underlying walk error
        #[source]
        source: walkdir::Error,
    },

    /// Following a symlink led back to one of its ancestors.
    #[error("Symlink loop at {path} (points to {ancestor})")]
    SymlinkLoop {
        /// The looping link
        path: PathBuf,
        /// The ancestor directory it resolves to
        ancestor: PathBuf,
    },
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    pub(crate) fn from_io(path: &Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}
