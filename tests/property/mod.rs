//! Property-based testing for twindir
//!
//! Uses proptest to verify invariants across randomly generated trees,
//! path segments and byte streams.

use ::twindir::compare::compare_streams;
use ::twindir::listing::compare_entries;
use ::twindir::path_builder::PathBuilder;
use ::twindir::*;
use proptest::prelude::*;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Generate random relative file paths
fn path_strategy() -> impl Strategy<Value = PathBuf> {
    let dir_strategy = prop::collection::vec("d[a-c]", 0..=2);
    let filename_strategy = prop_oneof!["f[0-9]", "[a-z]{1,6}\\.txt"];

    (dir_strategy, filename_strategy).prop_map(|(dirs, filename)| {
        let mut path = PathBuf::new();
        for dir in dirs {
            path = path.join(dir);
        }
        path.join(filename)
    })
}

/// Generate random file content
fn content_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        "[a-zA-Z0-9 \n]{0,200}".prop_map(|s| s.into_bytes()),
        prop::collection::vec(any::<u8>(), 1..5000),
    ]
}

fn files_strategy() -> impl Strategy<Value = Vec<(PathBuf, Vec<u8>)>> {
    prop::collection::vec((path_strategy(), content_strategy()), 1..20)
}

/// Write `files` below `root`; later paths that collide with an earlier
/// file or directory are dropped
fn write_files(root: &Path, files: &[(PathBuf, Vec<u8>)]) -> Vec<PathBuf> {
    let mut written = Vec::new();
    for (path, content) in files {
        let full = root.join(path);
        if full.exists() {
            continue;
        }
        let blocked = full
            .ancestors()
            .skip(1)
            .take_while(|a| *a != root)
            .any(|a| a.is_file());
        if blocked {
            continue;
        }
        if let Some(parent) = full.parent() {
            if fs::create_dir_all(parent).is_err() {
                continue;
            }
        }
        fs::write(&full, content).unwrap();
        written.push(path.clone());
    }
    written
}

fn pair() -> (TempDir, PathBuf, PathBuf) {
    let temp = TempDir::new().unwrap();
    let left = temp.path().join("l");
    let right = temp.path().join("r");
    fs::create_dir(&left).unwrap();
    fs::create_dir(&right).unwrap();
    (temp, left, right)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Identical copies never show a difference
    #[test]
    fn identical_trees_have_no_differences(files in files_strategy()) {
        let (_temp, left, right) = pair();
        write_files(&left, &files);
        write_files(&right, &files);

        let comparer = Comparer::new(&left, &right).unwrap();
        let tree = comparer.build_tree(true).unwrap();
        prop_assert_eq!(tree.differences(), 0);
        prop_assert!(tree.brief_lines(&left, &right).is_empty());

        let (scan, _) = comparer.quick_scan().unwrap();
        prop_assert!(scan.is_empty());
    }

    /// Every file of a tree compared with an empty one is one-sided
    #[test]
    fn one_empty_side_lists_everything(files in files_strategy()) {
        let (_temp, left, right) = pair();
        let written = write_files(&left, &files);

        let tree = Comparer::new(&left, &right).unwrap().build_tree(false).unwrap();
        for path in &written {
            let (_, entry) = tree
                .entries()
                .into_iter()
                .find(|(p, _)| p == path)
                .unwrap();
            prop_assert_eq!(entry.only_in(), Some(Side::Left));
        }
    }

    /// Changing one file is found by every walk
    #[test]
    fn single_edit_is_found(files in files_strategy(), pick in any::<prop::sample::Index>()) {
        let (_temp, left, right) = pair();
        let written = write_files(&left, &files);
        write_files(&right, &files);

        let victim = pick.get(&written);
        let mut data = fs::read(right.join(victim)).unwrap();
        data.push(b'!');
        fs::write(right.join(victim), data).unwrap();

        let comparer = Comparer::new(&left, &right).unwrap();
        let tree = comparer.build_tree(false).unwrap();
        let differing: Vec<PathBuf> = tree
            .entries()
            .into_iter()
            .filter(|(_, e)| e.is_difference())
            .map(|(p, _)| p)
            .collect();
        prop_assert_eq!(differing, vec![victim.clone()]);

        let (scan, _) = comparer.quick_scan().unwrap();
        prop_assert!(scan.contains_path(&left.join(victim)));
        for ancestor in victim.ancestors().skip(1) {
            prop_assert!(scan.contains_path(&left.join(ancestor)));
        }
    }

    /// Swapping the roots swaps the one-sided entries
    #[test]
    fn swapping_roots_mirrors_sides(
        left_files in files_strategy(),
        right_files in files_strategy(),
    ) {
        let (_temp, left, right) = pair();
        write_files(&left, &left_files);
        write_files(&right, &right_files);

        let forward = Comparer::new(&left, &right).unwrap().build_tree(false).unwrap();
        let backward = Comparer::new(&right, &left).unwrap().build_tree(false).unwrap();

        let sides = |tree: &DiffTree| -> Vec<(PathBuf, Option<Side>, DiffStatus)> {
            let mut all: Vec<_> = tree
                .entries()
                .into_iter()
                .map(|(p, e)| (p, e.only_in(), e.status))
                .collect();
            all.sort_by(|a, b| a.0.cmp(&b.0));
            all
        };
        let mirrored: Vec<_> = sides(&backward)
            .into_iter()
            .map(|(p, side, status)| (p, side.map(Side::other), status))
            .collect();
        prop_assert_eq!(sides(&forward), mirrored);
    }

    /// Listings are sorted by the requested key
    #[test]
    fn listings_are_sorted(files in files_strategy(), mixed in any::<bool>()) {
        let (_temp, left, right) = pair();
        write_files(&left, &files);
        let key = if mixed { SortKey::Mixed } else { SortKey::DirsFirst };

        let comparer = ComparerBuilder::new().sort(key).build(&left, &right).unwrap();
        let (listing, _) = comparer.build_listing(Path::new("")).unwrap();
        for adjacent in listing.entries().windows(2) {
            prop_assert!(
                compare_entries(&adjacent[0], &adjacent[1], key) != std::cmp::Ordering::Greater
            );
        }
    }

    /// Appending then truncating restores the exact buffer
    #[test]
    fn path_builder_restores(segments in prop::collection::vec("[a-z]{1,12}", 1..10)) {
        let mut pb = PathBuilder::new(Path::new("/base"), 256).unwrap();
        let mut marks = Vec::new();
        for segment in &segments {
            marks.push(pb.len());
            pb.append(segment).unwrap();
        }
        let expected: PathBuf = std::iter::once("/base").chain(segments.iter().map(String::as_str)).collect();
        prop_assert_eq!(pb.as_path().into_owned(), expected);

        for mark in marks.into_iter().rev() {
            pb.truncate(mark);
        }
        prop_assert_eq!(pb.as_bytes(), b"/base");
    }

    /// `..` undoes exactly one append
    #[test]
    fn path_builder_parent_pops(segments in prop::collection::vec("[a-z]{1,12}", 1..10)) {
        let mut pb = PathBuilder::new(Path::new("/base"), 256).unwrap();
        for segment in &segments {
            pb.append(segment).unwrap();
        }
        for _ in &segments {
            pb.append("..").unwrap();
        }
        prop_assert_eq!(pb.as_bytes(), b"/base");
    }

    /// An append that does not fit leaves the buffer untouched
    #[test]
    fn path_builder_overflow_is_atomic(capacity in 16usize..64, segment in "[a-z]{1,80}") {
        let mut pb = PathBuilder::new(Path::new("/r"), capacity).unwrap();
        let before = pb.as_bytes().to_vec();
        match pb.append(&segment) {
            Ok(len) => prop_assert!(len + 2 <= capacity),
            Err(err) => {
                prop_assert!(
                    matches!(err, TwindirError::PathOverflow { .. }),
                    "unexpected error: {}",
                    err
                );
                prop_assert_eq!(pb.as_bytes(), &before[..]);
            }
        }
    }

    /// Stream comparison agrees with slice equality
    #[test]
    fn streams_compare_like_slices(
        a in prop::collection::vec(any::<u8>(), 0..200_000),
        flip in any::<prop::sample::Index>(),
        change in any::<bool>(),
    ) {
        let mut b = a.clone();
        if change && !b.is_empty() {
            let at = flip.index(b.len());
            b[at] = b[at].wrapping_add(1);
        }
        let equal = compare_streams(&mut Cursor::new(&a), &mut Cursor::new(&b), a.len() as u64).unwrap();
        prop_assert_eq!(equal, a == b);
    }

    /// Marking a path marks all of its ancestors up to the root
    #[test]
    fn scan_set_marks_ancestors(segments in prop::collection::vec("[a-z]{1,5}", 1..6)) {
        let root = PathBuf::from("/scan/root");
        let leaf: PathBuf = segments.iter().fold(root.clone(), |p, s| p.join(s));

        let mut set = ScanSet::new();
        let inserted = set.mark(&leaf, &root);
        prop_assert_eq!(inserted, segments.len() + 1);
        for ancestor in leaf.ancestors().take(segments.len() + 1) {
            prop_assert!(set.contains(ancestor));
        }
        prop_assert!(!set.contains(Path::new("/scan")));

        // a second mark of the same leaf inserts nothing
        prop_assert_eq!(set.mark(&leaf, &root), 0);
    }
}
