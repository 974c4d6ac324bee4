//! Set of canonical paths known to contain a difference
//!
//! The quick scan inserts every differing leaf together with its ancestors,
//! up to and including the scan root. Marking walks upward and stops at the
//! first ancestor that is already present: that ancestor's own ancestors
//! were inserted when it was, so a second difference in the same directory
//! costs a single insertion.
//!
//! Paths are canonical (symlinks resolved) so that a directory reached
//! through different link paths is one key. The front end queries the set
//! with [`ScanSet::entry_differs`] and may [`consume`](ScanSet::consume) a
//! path once it has acted on it.

use crate::collections::{HashSet, HashSetExt};
use crate::types::{DiffEntry, Side};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Deduplicating set of canonical paths
#[derive(Debug, Clone, Default)]
pub struct ScanSet {
    paths: HashSet<PathBuf>,
}

impl ScanSet {
    /// Empty set
    pub fn new() -> Self {
        Self {
            paths: HashSet::new(),
        }
    }

    /// Number of marked paths
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Nothing marked
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Insert one path; `false` if it was already present
    pub fn insert(&mut self, path: &Path) -> bool {
        if self.paths.contains(path) {
            return false;
        }
        self.paths.insert(path.to_path_buf())
    }

    /// Exact membership test, no canonicalization
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    /// Insert `leaf` and its ancestors up to and including `root`
    ///
    /// Stops at the first path already present. `leaf` is expected to lie
    /// below `root`; if it does not, marking stops at the filesystem root.
    /// Returns how many paths were newly inserted.
    pub fn mark(&mut self, leaf: &Path, root: &Path) -> usize {
        let mut inserted = 0;
        let mut current = Some(leaf);
        while let Some(path) = current {
            if !self.insert(path) {
                break;
            }
            trace!("marked {:?}", path);
            inserted += 1;
            if path == root {
                break;
            }
            current = path.parent();
        }
        inserted
    }

    /// Canonicalize `path` and test membership
    ///
    /// A path that cannot be resolved is not in the set.
    pub fn contains_path(&self, path: &Path) -> bool {
        fs::canonicalize(path)
            .map(|canonical| self.paths.contains(&canonical))
            .unwrap_or(false)
    }

    /// Canonicalize `path` and remove it; `true` if it was present
    pub fn consume(&mut self, path: &Path) -> bool {
        match fs::canonicalize(path) {
            Ok(canonical) => self.paths.remove(&canonical),
            Err(_) => false,
        }
    }

    /// Whether the directory `entry` (listed in `left_dir` / `right_dir`)
    /// contains a difference on either side
    pub fn entry_differs(&self, entry: &DiffEntry, left_dir: &Path, right_dir: &Path) -> bool {
        Side::ALL.iter().any(|&side| {
            entry.meta(side).is_some() && {
                let dir = match side {
                    Side::Left => left_dir,
                    Side::Right => right_dir,
                };
                self.contains_path(&dir.join(&entry.name))
            }
        })
    }

    /// All marked paths, unordered
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    /// Marked paths in lexical order
    pub fn sorted(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.paths.iter().cloned().collect();
        paths.sort();
        paths
    }
}
