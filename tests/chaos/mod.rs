//! Chaos testing for twindir
//!
//! Builds random trees, applies random mutations to one copy and checks the
//! comparison against an independent walk of both trees. Also covers
//! entries that cannot be read.

use ::twindir::interact::RecordingReporter;
use ::twindir::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::info;
use walkdir::WalkDir;

/// What one tree holds at a relative path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Dir,
    File(Vec<u8>),
}

/// Random tree generator and mutator
pub struct ChaosEngine {
    rng: StdRng,
}

impl ChaosEngine {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn content(&mut self) -> Vec<u8> {
        let len = match self.rng.random_range(0..10) {
            0 => 0,
            1 => self.rng.random_range(64 * 1024..200 * 1024),
            _ => self.rng.random_range(1..2048),
        };
        (0..len).map(|_| self.rng.random_range(b'a'..=b'z')).collect()
    }

    /// Fill `root` with up to `dirs` directories and `files` files
    pub fn populate(&mut self, root: &Path, dirs: usize, files: usize) {
        let mut all_dirs = vec![PathBuf::new()];
        for i in 0..dirs {
            let parent = all_dirs[self.rng.random_range(0..all_dirs.len())].clone();
            let dir = parent.join(format!("dir{}", i));
            fs::create_dir_all(root.join(&dir)).unwrap();
            all_dirs.push(dir);
        }
        for i in 0..files {
            let parent = &all_dirs[self.rng.random_range(0..all_dirs.len())];
            let content = self.content();
            fs::write(root.join(parent).join(format!("file{}.dat", i)), content).unwrap();
        }
    }

    /// Apply `count` random mutations below `root`
    pub fn mutate(&mut self, root: &Path, count: usize) -> usize {
        let mut applied = 0;
        for n in 0..count {
            let nodes = snapshot(root);
            let files: Vec<&PathBuf> = nodes.iter().filter(|(_, n)| **n != Node::Dir).map(|(p, _)| p).collect();
            let dirs: Vec<PathBuf> = std::iter::once(PathBuf::new())
                .chain(nodes.iter().filter(|(_, n)| **n == Node::Dir).map(|(p, _)| p.clone()))
                .collect();

            match self.rng.random_range(0..6) {
                // flip one byte, keeping the size
                0 if !files.is_empty() => {
                    let path = root.join(files[self.rng.random_range(0..files.len())]);
                    let mut data = fs::read(&path).unwrap();
                    if data.is_empty() {
                        continue;
                    }
                    let at = self.rng.random_range(0..data.len());
                    data[at] = if data[at] == b'A' { b'B' } else { b'A' };
                    fs::write(&path, data).unwrap();
                }
                // append, changing the size
                1 if !files.is_empty() => {
                    let path = root.join(files[self.rng.random_range(0..files.len())]);
                    let mut data = fs::read(&path).unwrap();
                    data.extend_from_slice(b"more");
                    fs::write(&path, data).unwrap();
                }
                2 if !files.is_empty() => {
                    let path = root.join(files[self.rng.random_range(0..files.len())]);
                    fs::remove_file(path).unwrap();
                }
                // file turns into a directory
                3 if !files.is_empty() => {
                    let path = root.join(files[self.rng.random_range(0..files.len())]);
                    fs::remove_file(&path).unwrap();
                    fs::create_dir(&path).unwrap();
                    fs::write(path.join("inner.dat"), b"inner").unwrap();
                }
                4 => {
                    let dir = &dirs[self.rng.random_range(0..dirs.len())];
                    let content = self.content();
                    fs::write(root.join(dir).join(format!("new{}.dat", n)), content).unwrap();
                }
                _ => {
                    let dir = &dirs[self.rng.random_range(0..dirs.len())];
                    fs::create_dir(root.join(dir).join(format!("newdir{}", n))).unwrap();
                }
            }
            applied += 1;
        }
        applied
    }
}

/// Every entry below `root` by relative path
pub fn snapshot(root: &Path) -> BTreeMap<PathBuf, Node> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|entry| {
            let entry = entry.unwrap();
            let rel = entry.path().strip_prefix(root).unwrap().to_path_buf();
            let node = if entry.file_type().is_dir() {
                Node::Dir
            } else {
                Node::File(fs::read(entry.path()).unwrap())
            };
            (rel, node)
        })
        .collect()
}

/// Relative paths a full tree build must report as differences
pub fn expected_differences(left: &Path, right: &Path) -> BTreeSet<PathBuf> {
    let l = snapshot(left);
    let r = snapshot(right);
    let names: BTreeSet<&PathBuf> = l.keys().chain(r.keys()).collect();

    let mismatched = |path: &Path| match (l.get(path), r.get(path)) {
        (Some(a), Some(b)) => (*a == Node::Dir) != (*b == Node::Dir),
        _ => false,
    };

    names
        .into_iter()
        // nothing below a type mismatch is listed
        .filter(|path| !path.ancestors().skip(1).any(|a| mismatched(a)))
        .filter(|path| match (l.get(*path), r.get(*path)) {
            (Some(Node::Dir), Some(Node::Dir)) => false,
            (Some(a), Some(b)) => a != b,
            _ => true,
        })
        .cloned()
        .collect()
}

fn reported_differences(tree: &DiffTree) -> BTreeSet<PathBuf> {
    tree.entries()
        .into_iter()
        .filter(|(_, e)| e.is_difference())
        .map(|(p, _)| p)
        .collect()
}

/// Files and directories made unreadable until dropped
pub struct Locked {
    paths: Vec<PathBuf>,
}

#[cfg(unix)]
impl Locked {
    /// Remove all permissions; `None` when they are not enforced (root)
    pub fn new(paths: &[PathBuf]) -> Option<Self> {
        use std::os::unix::fs::PermissionsExt;

        for path in paths {
            fs::set_permissions(path, fs::Permissions::from_mode(0o000)).unwrap();
        }
        let locked = Self { paths: paths.to_vec() };
        let enforced = paths.iter().all(|p| {
            if p.is_dir() {
                fs::read_dir(p).is_err()
            } else {
                fs::File::open(p).is_err()
            }
        });
        enforced.then_some(locked)
    }
}

#[cfg(unix)]
impl Drop for Locked {
    fn drop(&mut self) {
        use std::os::unix::fs::PermissionsExt;

        for path in &self.paths {
            let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o755));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::TreePair;
    use tracing_test::traced_test;

    fn mirrored(seed: u64) -> (TreePair, ChaosEngine) {
        let pair = TreePair::new();
        let mut engine = ChaosEngine::new(seed);
        engine.populate(&pair.left, 8, 30);
        for (rel, node) in snapshot(&pair.left) {
            match node {
                Node::Dir => fs::create_dir_all(pair.right.join(rel)).unwrap(),
                Node::File(data) => fs::write(pair.right.join(rel), data).unwrap(),
            }
        }
        (pair, engine)
    }

    #[test]
    #[traced_test]
    fn test_random_mutations_match_oracle() {
        for seed in 0..8 {
            let (pair, mut engine) = mirrored(seed);
            let applied = engine.mutate(&pair.right, 6);
            info!("seed {}: {} mutations", seed, applied);

            let expected = expected_differences(&pair.left, &pair.right);
            let comparer = pair.comparer();
            let tree = comparer.build_tree(false).unwrap();
            assert_eq!(reported_differences(&tree), expected, "seed {}", seed);
            assert_eq!(tree.summary.errors, 0);

            // the quick scan agrees on whether anything differs at all
            let (scan, _) = comparer.quick_scan().unwrap();
            assert_eq!(scan.is_empty(), expected.is_empty(), "seed {}", seed);
        }
    }

    #[test]
    fn test_mutations_on_both_sides() {
        for seed in 100..104 {
            let (pair, mut engine) = mirrored(seed);
            engine.mutate(&pair.left, 3);
            engine.mutate(&pair.right, 3);

            let expected = expected_differences(&pair.left, &pair.right);
            let tree = pair.comparer().build_tree(false).unwrap();
            assert_eq!(reported_differences(&tree), expected, "seed {}", seed);
        }
    }

    #[test]
    fn test_mtime_alone_is_no_difference() {
        let pair = TreePair::new();
        pair.both("stamp.txt", "unchanged");
        let old = filetime::FileTime::from_unix_time(1_000_000_000, 0);
        filetime::set_file_mtime(pair.left.join("stamp.txt"), old).unwrap();

        let (listing, summary) = pair.comparer().build_listing(Path::new("")).unwrap();
        let entry = listing.get("stamp.txt").unwrap();
        assert_eq!(entry.status, DiffStatus::Equal);
        assert_eq!(entry.meta(Side::Left).unwrap().mtime, 1_000_000_000);
        assert_eq!(summary.comparisons, 1);
    }

    #[test]
    fn test_hardlinks_skip_content() {
        let pair = TreePair::new();
        fs::write(pair.temp.path().join("shared"), "same inode").unwrap();
        fs::hard_link(pair.temp.path().join("shared"), pair.left.join("link")).unwrap();
        fs::hard_link(pair.temp.path().join("shared"), pair.right.join("link")).unwrap();

        let (listing, summary) = pair.comparer().build_listing(Path::new("")).unwrap();
        assert_eq!(listing.get("link").unwrap().status, DiffStatus::Equal);
        assert_eq!(summary.comparisons, 0);
    }

    #[cfg(unix)]
    #[test]
    #[traced_test]
    fn test_unreadable_directory_is_skipped() {
        let pair = TreePair::new();
        pair.both("ok.txt", "fine");
        pair.both("locked/secret.txt", "hidden");
        pair.write(Side::Right, "after/new.txt", "visible");

        let Some(_guard) = Locked::new(&[pair.left.join("locked")]) else {
            info!("permissions not enforced, skipping");
            return;
        };

        let comparer = pair.comparer();
        let mut reporter = RecordingReporter::new();
        let mut interrupt = interact::NoInterrupt;
        let tree = comparer
            .build_tree_with(false, &mut reporter, &mut interrupt)
            .unwrap();

        assert!(tree.summary.errors >= 1);
        assert!(tree.child("locked").is_none());
        assert!(tree.child("after").is_some());
        assert!(reporter.reports.iter().any(|r| r.operation == "opendir"));
        assert_eq!(tree.listing.get("ok.txt").unwrap().status, DiffStatus::Equal);

        let mut reporter = RecordingReporter::new();
        let (_, summary) = comparer.quick_scan_with(&mut reporter, &mut interrupt).unwrap();
        assert_eq!(summary.unreadable, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_files_and_ignore_all() {
        let pair = TreePair::new();
        pair.both("a.txt", "aaaa");
        pair.both("b.txt", "bbbb");

        let Some(_guard) = Locked::new(&[pair.left.join("a.txt"), pair.left.join("b.txt")]) else {
            return;
        };

        let comparer = pair.comparer();
        let mut reporter = RecordingReporter::answering(ErrorResponse::IgnoreAll);
        let mut interrupt = interact::NoInterrupt;
        let (listing, summary) = comparer
            .build_listing_with(Path::new(""), &mut reporter, &mut interrupt)
            .unwrap();

        for entry in listing.entries() {
            assert_eq!(entry.status, DiffStatus::Error);
        }
        assert_eq!(summary.errors, 2);
        // the first answer silences the rest of the walk
        assert_eq!(reporter.reports.len(), 1);
        assert_eq!(reporter.reports[0].operation, "open");

        let lines = listing_brief(&comparer, &pair);
        assert_eq!(lines.iter().filter(|l| l.starts_with("Error reading")).count(), 2);
    }

    fn listing_brief(comparer: &Comparer, pair: &TreePair) -> Vec<String> {
        comparer.build_tree(false).unwrap().brief_lines(&pair.left, &pair.right)
    }
}
