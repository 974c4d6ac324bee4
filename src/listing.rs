//! Ordered store of classified entries
//!
//! The walker hands every entry to an [`EntrySink`] and asks it to sort once
//! a directory level is complete; it never reorders entries itself.
//! [`DiffListing`] is the in-memory sink used by the tree build and the CLI.

use crate::scan_set::ScanSet;
use crate::types::{DiffEntry, FileKind, SortHint, SortKey};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;

/// Receiver of classified entries
pub trait EntrySink {
    /// Append one entry
    fn add(&mut self, entry: DiffEntry, hint: SortHint);

    /// Order the accumulated entries; must be stable
    fn sort(&mut self, key: SortKey);
}

/// Vector-backed sink
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffListing {
    entries: Vec<DiffEntry>,
    right_only: usize,
}

impl DiffListing {
    /// Empty listing
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries in current order
    pub fn entries(&self) -> &[DiffEntry] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries that were only found while listing the right directory
    pub fn right_pass_count(&self) -> usize {
        self.right_only
    }

    /// Look an entry up by name
    pub fn get(&self, name: &str) -> Option<&DiffEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Set `subtree_differs` on directory entries from a quick-scan result
    ///
    /// `left_dir` and `right_dir` are the directories this listing was built
    /// from.
    pub fn apply_scan(&mut self, scan: &ScanSet, left_dir: &Path, right_dir: &Path) {
        for entry in self.entries.iter_mut().filter(|e| e.is_dir()) {
            entry.subtree_differs = Some(scan.entry_differs(entry, left_dir, right_dir));
        }
    }
}

impl EntrySink for DiffListing {
    fn add(&mut self, entry: DiffEntry, hint: SortHint) {
        if hint == SortHint::RightPass {
            self.right_only += 1;
        }
        self.entries.push(entry);
    }

    fn sort(&mut self, key: SortKey) {
        self.entries.sort_by(|a, b| compare_entries(a, b, key));
    }
}

/// Ordering used by [`DiffListing::sort`]
pub fn compare_entries(a: &DiffEntry, b: &DiffEntry, key: SortKey) -> Ordering {
    let dir_a = a.kind() == Some(FileKind::Directory);
    let dir_b = b.kind() == Some(FileKind::Directory);
    let by_type = match key {
        SortKey::DirsFirst => dir_b.cmp(&dir_a),
        SortKey::FilesFirst => dir_a.cmp(&dir_b),
        SortKey::Mixed => Ordering::Equal,
    };
    by_type.then_with(|| a.name.cmp(&b.name))
}
