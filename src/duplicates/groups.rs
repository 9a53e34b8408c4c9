//! Duplicate groups keyed by content fingerprint.
//!
//! # Overview
//!
//! A [`DuplicateGroup`] collects every path whose content hashed to the same
//! [`Fingerprint`]. Members keep their insertion order so reports list them
//! the way the aggregator received them.
//!
//! # Example
//!
//! ```
//! use dupecheck::duplicates::DuplicateGroup;
//! use dupecheck::scanner::Fingerprint;
//! use std::path::PathBuf;
//!
//! let mut group = DuplicateGroup::new(Fingerprint::from_bytes([7; 32]), 1024, PathBuf::from("/a.jpg"));
//! assert!(!group.is_duplicate());
//!
//! group.push(PathBuf::from("/b.jpg"));
//! assert!(group.is_duplicate());
//! assert_eq!(group.wasted_space(), 1024);
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::scanner::Fingerprint;

/// Every path sharing one content fingerprint.
///
/// Always holds at least one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Content fingerprint shared by all members
    #[serde(with = "fingerprint_hex")]
    pub fingerprint: Fingerprint,
    /// File size in bytes (shared by all members)
    pub size: u64,
    /// Member paths in insertion order
    pub paths: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Create a group with its first member.
    #[must_use]
    pub fn new(fingerprint: Fingerprint, size: u64, first: PathBuf) -> Self {
        Self {
            fingerprint,
            size,
            paths: vec![first],
        }
    }

    /// Append a member.
    pub fn push(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// A group is a duplicate group once it has two or more members.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        self.paths.len() >= 2
    }

    /// Bytes that removing all but one copy would free.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size * (self.paths.len() as u64).saturating_sub(1)
    }

    /// Fingerprint as lowercase hex.
    #[must_use]
    pub fn fingerprint_hex(&self) -> String {
        self.fingerprint.to_hex()
    }
}

/// Serialize fingerprints as hex strings rather than byte arrays.
pub(crate) mod fingerprint_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::scanner::Fingerprint;

    pub fn serialize<S: Serializer>(fp: &Fingerprint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&fp.to_hex())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fingerprint, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Fingerprint::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}
