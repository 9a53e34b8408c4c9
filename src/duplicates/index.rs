//! In-memory duplicate index.
//!
//! # Overview
//!
//! [`DuplicateIndex`] folds [`FileRecord`]s into groups keyed by fingerprint.
//! It has exactly one owner (the aggregation loop) and no interior locking.
//!
//! # Counting
//!
//! `duplicate_files` grows by two when a group gains its second member and
//! by one for every member after that, so it always equals the number of
//! paths that sit in a group of two or more. Records without a fingerprint
//! are counted in `total_files` and `unreadable_files` but never grouped.

use std::collections::HashMap;

use crate::scanner::{FileRecord, Fingerprint};

use super::DuplicateGroup;

/// What inserting a record did to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record had no fingerprint.
    Unreadable,
    /// First file with this fingerprint.
    NewGroup,
    /// The group went from one member to two.
    FirstDuplicate,
    /// The group already had two or more members.
    AdditionalDuplicate,
}

/// Fingerprint-to-paths mapping with running totals.
#[derive(Debug, Default)]
pub struct DuplicateIndex {
    groups: Vec<DuplicateGroup>,
    positions: HashMap<Fingerprint, usize>,
    total_files: usize,
    duplicate_files: usize,
    duplicate_groups: usize,
    unreadable_files: usize,
    bytes_hashed: u64,
}

impl DuplicateIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one record into the index.
    pub fn insert(&mut self, record: FileRecord) -> InsertOutcome {
        self.total_files += 1;

        let Some(fingerprint) = record.fingerprint() else {
            self.unreadable_files += 1;
            return InsertOutcome::Unreadable;
        };
        self.bytes_hashed += record.size();

        if let Some(&position) = self.positions.get(&fingerprint) {
            let group = &mut self.groups[position];
            group.push(record.into_path());
            if group.len() == 2 {
                self.duplicate_groups += 1;
                self.duplicate_files += 2;
                InsertOutcome::FirstDuplicate
            } else {
                self.duplicate_files += 1;
                InsertOutcome::AdditionalDuplicate
            }
        } else {
            let size = record.size();
            self.positions.insert(fingerprint, self.groups.len());
            self.groups
                .push(DuplicateGroup::new(fingerprint, size, record.into_path()));
            InsertOutcome::NewGroup
        }
    }

    /// Records inserted so far, readable or not.
    #[must_use]
    pub fn total_files(&self) -> usize {
        self.total_files
    }

    /// Paths that belong to a group of two or more.
    #[must_use]
    pub fn duplicate_files(&self) -> usize {
        self.duplicate_files
    }

    /// Groups with two or more members.
    #[must_use]
    pub fn duplicate_group_count(&self) -> usize {
        self.duplicate_groups
    }

    /// Records that carried no fingerprint.
    #[must_use]
    pub fn unreadable_files(&self) -> usize {
        self.unreadable_files
    }

    /// Records that carried a fingerprint.
    #[must_use]
    pub fn fingerprinted_files(&self) -> usize {
        self.total_files - self.unreadable_files
    }

    /// Distinct fingerprints seen (one per group, singletons included).
    #[must_use]
    pub fn unique_fingerprints(&self) -> usize {
        self.groups.len()
    }

    /// Files whose content appeared exactly once.
    #[must_use]
    pub fn unique_files(&self) -> usize {
        self.groups.len() - self.duplicate_groups
    }

    /// Sum of bytes hashed over readable records.
    #[must_use]
    pub fn bytes_hashed(&self) -> u64 {
        self.bytes_hashed
    }

    /// Group for a fingerprint, if one exists.
    #[must_use]
    pub fn group(&self, fingerprint: &Fingerprint) -> Option<&DuplicateGroup> {
        self.positions.get(fingerprint).map(|&i| &self.groups[i])
    }

    /// Every group, singletons included, in first-seen order.
    #[must_use]
    pub fn all_groups(&self) -> &[DuplicateGroup] {
        &self.groups
    }

    /// Groups with two or more members, in first-seen order.
    pub fn duplicate_groups(&self) -> impl Iterator<Item = &DuplicateGroup> {
        self.groups.iter().filter(|g| g.is_duplicate())
    }

    /// Consume the index, keeping only duplicate groups in first-seen order.
    #[must_use]
    pub fn into_duplicate_groups(self) -> Vec<DuplicateGroup> {
        self.groups
            .into_iter()
            .filter(DuplicateGroup::is_duplicate)
            .collect()
    }
}
