//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - The concurrent scan-hash-aggregate pipeline ([`finder`])
//! - The single-writer fingerprint index ([`index`])
//! - Duplicate group management ([`groups`])

pub mod finder;
pub mod groups;
pub mod index;

pub use finder::{
    DuplicateFinder, FinderConfig, FinderError, ScanSession, ScanSummary, DEFAULT_QUEUE_CAPACITY,
};
pub use groups::DuplicateGroup;
pub use index::{DuplicateIndex, InsertOutcome};
