//! Integration tests for twindir
//!
//! Drive complete comparisons through the public API against real trees on
//! disk: listings, recursive trees, quick scans, find mode and the external
//! diff tool.

use ::twindir::interact::{RecordingReporter, ScriptedInterrupt};
use ::twindir::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Two trees under one temporary directory
pub struct TreePair {
    pub temp: TempDir,
    pub left: PathBuf,
    pub right: PathBuf,
}

impl TreePair {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let left = temp.path().join("left");
        let right = temp.path().join("right");
        fs::create_dir(&left).unwrap();
        fs::create_dir(&right).unwrap();
        Self { temp, left, right }
    }

    /// Write `content` at `rel` in both trees
    pub fn both(&self, rel: &str, content: &str) {
        self.write(Side::Left, rel, content);
        self.write(Side::Right, rel, content);
    }

    /// Write `content` at `rel` in one tree, creating parents
    pub fn write(&self, side: Side, rel: &str, content: &str) {
        let path = self.root(side).join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn mkdir(&self, side: Side, rel: &str) {
        fs::create_dir_all(self.root(side).join(rel)).unwrap();
    }

    pub fn root(&self, side: Side) -> &Path {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn canonical(&self, side: Side, rel: &str) -> PathBuf {
        let root = fs::canonicalize(self.root(side)).unwrap();
        if rel.is_empty() {
            root
        } else {
            root.join(rel)
        }
    }

    pub fn comparer(&self) -> Comparer {
        Comparer::new(&self.left, &self.right).unwrap()
    }
}

/// A small project checked out twice, with a few edits on the right
fn project() -> TreePair {
    let pair = TreePair::new();
    pair.both("Cargo.toml", "[package]\nname = \"demo\"\n");
    pair.both("src/lib.rs", "pub mod a;\npub mod b;\n");
    pair.both("src/a.rs", "pub fn a() {}\n");
    pair.write(Side::Left, "src/b.rs", "pub fn b() {}\n");
    pair.write(Side::Right, "src/b.rs", "pub fn b() { todo!() }\n");
    pair.both("docs/guide.md", "# Guide\n");
    pair.both("docs/img/logo.txt", "logo");
    pair.write(Side::Left, "docs/old.md", "obsolete");
    pair.write(Side::Right, "tests/smoke.rs", "#[test] fn smoke() {}\n");
    pair
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn test_project_tree() {
        let pair = project();
        let comparer = pair.comparer();
        let tree = comparer.build_tree(false).unwrap();

        let top: Vec<&str> = tree.listing.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(top, ["docs", "src", "tests", "Cargo.toml"]);
        assert_eq!(tree.listing.get("tests").unwrap().only_in(), Some(Side::Right));

        let src = tree.child("src").unwrap();
        assert_eq!(src.listing.get("a.rs").unwrap().status, DiffStatus::Equal);
        assert_eq!(src.listing.get("b.rs").unwrap().status, DiffStatus::Differ);

        let docs = tree.child("docs").unwrap();
        assert_eq!(docs.listing.get("old.md").unwrap().only_in(), Some(Side::Left));
        assert!(docs.child("img").is_some());

        // one-sided directories are descended too
        let tests = tree.child("tests").unwrap();
        assert_eq!(tests.listing.get("smoke.rs").unwrap().only_in(), Some(Side::Right));

        assert_eq!(tree.differences(), 4);
        assert_eq!(tree.summary.errors, 0);
        assert!(!tree.summary.cancelled);
    }

    #[test]
    fn test_listing_below_root() {
        let pair = project();
        let comparer = pair.comparer();

        let (listing, summary) = comparer.build_listing(Path::new("src")).unwrap();
        let names: Vec<&str> = listing.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["a.rs", "b.rs", "lib.rs"]);
        assert_eq!(summary.entries, 3);
        // b.rs differs in size and is never read
        assert_eq!(summary.comparisons, 2);

        // a directory present on one side lists as one-sided entries
        let (listing, _) = comparer.build_listing(Path::new("tests")).unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing.entries()[0].only_in(), Some(Side::Right));
        assert_eq!(listing.right_pass_count(), 1);

        assert!(comparer.build_listing(Path::new("nowhere")).is_err());
    }

    #[test]
    fn test_quick_scan_marks_differing_directories() {
        let pair = project();
        let (scan, summary) = pair.comparer().quick_scan().unwrap();

        assert!(scan.contains(&pair.canonical(Side::Left, "src")));
        assert!(scan.contains(&pair.canonical(Side::Left, "docs")));
        assert!(scan.contains(&pair.canonical(Side::Left, "")));
        assert!(!scan.contains(&pair.canonical(Side::Left, "docs/img")));
        assert!(scan.contains(&pair.canonical(Side::Right, "tests")));
        assert_eq!(summary.hits, 3);
        assert_eq!(summary.unreadable, 0);
    }

    #[test]
    fn test_prescan_flags_directory_entries() {
        let pair = project();
        let tree = pair.comparer().build_tree(true).unwrap();

        assert_eq!(tree.listing.get("src").unwrap().subtree_differs, Some(true));
        assert_eq!(tree.listing.get("docs").unwrap().subtree_differs, Some(true));
        let docs = tree.child("docs").unwrap();
        assert_eq!(docs.listing.get("img").unwrap().subtree_differs, Some(false));
        // plain files carry no flag
        assert_eq!(tree.listing.get("Cargo.toml").unwrap().subtree_differs, None);
    }

    #[test]
    fn test_identical_trees_scan_clean() {
        let pair = TreePair::new();
        for i in 0..5 {
            pair.both(&format!("d{}/f{}.txt", i % 2, i), &"x".repeat(i * 1000));
        }
        let comparer = pair.comparer();
        let (scan, _) = comparer.quick_scan().unwrap();
        assert!(scan.is_empty());
        assert_eq!(comparer.build_tree(false).unwrap().differences(), 0);
    }

    #[test]
    fn test_brief_report() {
        let pair = project();
        let comparer = pair.comparer();
        let tree = comparer.build_tree(false).unwrap();
        let lines = tree.brief_lines(&pair.left, &pair.right);

        let expected = [
            format!("Only in {}: old.md", pair.left.join("docs").display()),
            format!(
                "Files {} and {} differ",
                pair.left.join("src/b.rs").display(),
                pair.right.join("src/b.rs").display()
            ),
            format!("Only in {}: tests", pair.right.display()),
            format!("Only in {}: smoke.rs", pair.right.join("tests").display()),
        ];
        for line in &expected {
            assert!(lines.contains(line), "missing {:?} in {:?}", line, lines);
        }
        assert_eq!(lines.len(), expected.len());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_compare_targets() {
        use std::os::unix::fs::symlink;

        let pair = TreePair::new();
        symlink("target-a", pair.left.join("same")).unwrap();
        symlink("target-a", pair.right.join("same")).unwrap();
        symlink("target-a", pair.left.join("moved")).unwrap();
        symlink("target-b", pair.right.join("moved")).unwrap();

        let tree = pair.comparer().build_tree(false).unwrap();
        let same = tree.listing.get("same").unwrap();
        assert_eq!(same.status, DiffStatus::Equal);
        assert_eq!(same.link_target(Side::Right), Some("target-a"));

        let moved = tree.listing.get("moved").unwrap();
        assert_eq!(moved.status, DiffStatus::Differ);
        assert_eq!(moved.kind(), Some(FileKind::Symlink));

        let lines = tree.brief_lines(&pair.left, &pair.right);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Symbolic links "));
    }

    #[cfg(unix)]
    #[test]
    fn test_follow_symlinks() {
        use std::os::unix::fs::symlink;

        let pair = TreePair::new();
        pair.write(Side::Left, "real.txt", "same");
        pair.write(Side::Right, "real.txt", "same");
        symlink("real.txt", pair.left.join("alias")).unwrap();
        fs::write(pair.right.join("alias"), "same").unwrap();

        let plain = pair.comparer().build_tree(false).unwrap();
        assert!(plain.listing.get("alias").unwrap().is_type_mismatch());

        let followed = ComparerBuilder::new()
            .follow_symlinks(true)
            .build(&pair.left, &pair.right)
            .unwrap()
            .build_tree(false)
            .unwrap();
        assert_eq!(followed.listing.get("alias").unwrap().status, DiffStatus::Equal);
    }

    #[test]
    fn test_skip_compare_signal() {
        let pair = TreePair::new();
        pair.write(Side::Left, "a.txt", "aaaa");
        pair.write(Side::Right, "a.txt", "bbbb");
        pair.write(Side::Left, "b.txt", "cccc");
        pair.write(Side::Right, "b.txt", "dddd");

        let comparer = pair.comparer();
        let mut reporter = RecordingReporter::new();
        let mut interrupt = ScriptedInterrupt::at(0, Signal::SkipCompare);
        let (listing, summary) = comparer
            .build_listing_with(Path::new(""), &mut reporter, &mut interrupt)
            .unwrap();

        // skipped pairs are assumed equal
        for entry in listing.entries() {
            assert_eq!(entry.status, DiffStatus::Equal);
        }
        assert_eq!(summary.comparisons, 0);
        assert_eq!(summary.comparisons_skipped, 2);

        // an explicit recompare still reads
        assert_eq!(comparer.recompare(Path::new("a.txt")).unwrap(), ContentOutcome::Differ);
    }

    #[test]
    fn test_stop_signal_keeps_partial_tree() {
        let pair = project();
        let comparer = pair.comparer();
        let mut reporter = RecordingReporter::new();
        let mut interrupt = ScriptedInterrupt::at(3, Signal::Stop);
        let tree = comparer
            .build_tree_with(false, &mut reporter, &mut interrupt)
            .unwrap();

        assert!(tree.summary.cancelled);
        assert!(tree.entries().len() < 12);
    }

    #[test]
    fn test_find_in_both_trees() {
        let pair = project();
        let comparer = ComparerBuilder::new()
            .name_pattern(r"\.rs$")
            .build(&pair.left, &pair.right)
            .unwrap();

        let (scan, summary) = comparer.find().unwrap();
        // names on both sides are matched on the left, right-only ones on the right
        assert_eq!(summary.hits, 4);
        assert!(scan.contains(&pair.canonical(Side::Left, "src/b.rs")));
        assert!(scan.contains(&pair.canonical(Side::Left, "src")));
        assert!(!scan.contains(&pair.canonical(Side::Right, "src/b.rs")));
        assert!(scan.contains(&pair.canonical(Side::Right, "tests/smoke.rs")));
        assert!(scan.contains(&pair.canonical(Side::Right, "tests")));
    }

    #[test]
    fn test_find_by_content() {
        let pair = project();
        let comparer = ComparerBuilder::new()
            .content_pattern("todo")
            .build(&pair.left, &pair.right)
            .unwrap();

        // only the right b.rs mentions it, and paired names are read on the left
        let (scan, summary) = comparer.find().unwrap();
        assert_eq!(summary.hits, 0);
        assert!(scan.is_empty());
    }

    #[test]
    fn test_find_single_tree() {
        let pair = project();
        let comparer = ComparerBuilder::new()
            .name_pattern(r"\.md$")
            .build_single(&pair.left)
            .unwrap();

        let (scan, summary) = comparer.find().unwrap();
        assert_eq!(summary.hits, 2);
        assert!(scan.contains(&pair.canonical(Side::Left, "docs/guide.md")));
        assert!(scan.contains(&pair.canonical(Side::Left, "docs/old.md")));
        assert!(scan.iter().all(|p| p.starts_with(pair.canonical(Side::Left, ""))));
    }

    #[test]
    fn test_case_sensitive_find() {
        let pair = TreePair::new();
        pair.write(Side::Left, "notes.txt", "Fixme later");

        let insensitive = ComparerBuilder::new()
            .content_pattern("FIXME")
            .build_single(&pair.left)
            .unwrap();
        assert_eq!(insensitive.find().unwrap().1.hits, 1);

        let sensitive = ComparerBuilder::new()
            .ignore_case(false)
            .content_pattern("FIXME")
            .build_single(&pair.left)
            .unwrap();
        assert_eq!(sensitive.find().unwrap().1.hits, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_diff_tool_on_pair() {
        let pair = project();
        let comparer = ComparerBuilder::new()
            .diff_tool("cmp -s $1 $2")
            .build(&pair.left, &pair.right)
            .unwrap();

        let status = comparer.diff_command(Path::new("src/a.rs")).status().unwrap();
        assert!(status.success());
        let status = comparer.diff_command(Path::new("src/b.rs")).status().unwrap();
        assert!(!status.success());
    }

    #[test]
    fn test_tree_serializes_to_json() {
        let pair = project();
        let tree = pair.comparer().build_tree(true).unwrap();

        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["summary"]["cancelled"], false);
        assert!(json["listing"]["entries"].as_array().unwrap().len() >= 4);

        let back: DiffTree = serde_json::from_value(json).unwrap();
        assert_eq!(back.entries().len(), tree.entries().len());
    }
}
