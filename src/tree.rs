//! Result of a recursive build
//!
//! A [`DiffTree`] holds the sorted listing of one directory level and one
//! child tree per directory that was descended into. Every node carries the
//! summary of its own subtree.

use crate::listing::DiffListing;
use crate::scan_set::ScanSet;
use crate::types::{DiffEntry, DiffStatus, FileKind, Side, WalkSummary};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Listing of one directory plus its descended sub-directories
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffTree {
    /// Directory path below the roots; empty for the roots themselves
    pub path: PathBuf,
    /// Entries of this directory in sorted order
    pub listing: DiffListing,
    /// Sub-trees in listing order
    pub children: Vec<DiffTree>,
    /// Totals for this directory and everything below
    pub summary: WalkSummary,
}

impl DiffTree {
    /// Sub-tree of the directory `name` directly below this one
    pub fn child(&self, name: &str) -> Option<&DiffTree> {
        self.children
            .iter()
            .find(|c| c.path.file_name().is_some_and(|n| n == name))
    }

    /// Sub-tree at `rel`, relative to this node
    pub fn find(&self, rel: &Path) -> Option<&DiffTree> {
        rel.components().try_fold(self, |node, component| {
            node.child(&component.as_os_str().to_string_lossy())
        })
    }

    /// All entries with their paths below the roots, pre-order
    pub fn entries(&self) -> Vec<(PathBuf, &DiffEntry)> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect<'a>(&'a self, out: &mut Vec<(PathBuf, &'a DiffEntry)>) {
        for entry in self.listing.entries() {
            out.push((self.path.join(&entry.name), entry));
            if let Some(child) = self.child(&entry.name) {
                child.collect(out);
            }
        }
    }

    /// Number of entries anywhere in the tree that count as a difference
    pub fn differences(&self) -> usize {
        self.entries().iter().filter(|(_, e)| e.is_difference()).count()
    }

    /// Set `subtree_differs` on every directory entry from a quick-scan result
    pub fn apply_scan(&mut self, scan: &ScanSet, left_root: &Path, right_root: &Path) {
        let left = left_root.join(&self.path);
        let right = right_root.join(&self.path);
        self.listing.apply_scan(scan, &left, &right);
        for child in &mut self.children {
            child.apply_scan(scan, left_root, right_root);
        }
    }

    /// `diff -qr` style report of every difference in the tree
    pub fn brief_lines(&self, left_root: &Path, right_root: &Path) -> Vec<String> {
        let mut lines = Vec::new();
        for (rel, entry) in self.entries() {
            let left = left_root.join(&rel);
            let right = right_root.join(&rel);
            let line = match entry.only_in() {
                Some(Side::Left) => Some(only_in(left_root, &rel)),
                Some(Side::Right) => Some(only_in(right_root, &rel)),
                None => match entry.status {
                    DiffStatus::Error => Some(format!("Error reading {} / {}", left.display(), right.display())),
                    DiffStatus::Differ if entry.is_type_mismatch() => Some(format!(
                        "Different file type: {} and {}",
                        left.display(),
                        right.display()
                    )),
                    DiffStatus::Differ if entry.kind() == Some(FileKind::Symlink) => Some(format!(
                        "Symbolic links {} and {} differ",
                        left.display(),
                        right.display()
                    )),
                    DiffStatus::Differ => Some(format!("Files {} and {} differ", left.display(), right.display())),
                    _ => None,
                },
            };
            lines.extend(line);
        }
        lines
    }
}

fn only_in(root: &Path, rel: &Path) -> String {
    let dir = match rel.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => root.join(parent),
        _ => root.to_path_buf(),
    };
    let name = rel.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    format!("Only in {}: {}", dir.display(), name)
}
