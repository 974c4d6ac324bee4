//! Top-level entry point
//!
//! A [`Comparer`] owns the two validated roots, the options, the compiled
//! filters and the diff tool. Every operation starts a fresh
//! [`WalkContext`], so the sticky "ignore errors", "skip comparisons" and
//! "stop" states of one walk never leak into the next.
//!
//! Operations come in two flavours: the plain one logs errors and cannot be
//! interrupted; the `_with` variant takes the front end's
//! [`ErrorReporter`] and [`InterruptSource`].
//!
//! ## Examples
//!
//! ```rust,no_run
//! use twindir::{ComparerBuilder, SortKey};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let comparer = ComparerBuilder::new()
//!     .follow_symlinks(true)
//!     .sort(SortKey::FilesFirst)
//!     .build("./old", "./new")?;
//!
//! let (listing, _) = comparer.build_listing(Path::new(""))?;
//! for entry in listing.entries() {
//!     println!("{} {}", entry.status.symbol(), entry.name);
//! }
//! # Ok(())
//! # }
//! ```

use crate::compare::{compare_files, CompareMode, ContentOutcome};
use crate::context::WalkContext;
use crate::difftool::DiffTool;
use crate::error::{Result, TwindirError};
use crate::filter::Filters;
use crate::interact::{ErrorReporter, InterruptSource, LogReporter, NoInterrupt};
use crate::listing::DiffListing;
use crate::probe::{probe, Probe};
use crate::scan_set::ScanSet;
use crate::tree::DiffTree;
use crate::types::{
    CompareOptions, FileKind, ScanSummary, Side, SideMask, SideMeta, SortKey, WalkSummary,
};
use crate::utils::path_to_bytes;
use crate::walker;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, instrument};

/// Smallest accepted path buffer capacity
pub const MIN_PATH_CAPACITY: usize = 16;

/// Comparison of two directory trees
#[derive(Debug, Clone)]
pub struct Comparer {
    left: PathBuf,
    right: PathBuf,
    options: CompareOptions,
    filters: Filters,
    diff_tool: DiffTool,
    single: bool,
}

impl Comparer {
    /// Compare `left` and `right` with default options
    ///
    /// # Errors
    ///
    /// See [`ComparerBuilder::build`].
    pub fn new(left: impl Into<PathBuf>, right: impl Into<PathBuf>) -> Result<Self> {
        ComparerBuilder::new().build(left, right)
    }

    /// Left root as given
    pub fn left_root(&self) -> &Path {
        &self.left
    }

    /// Right root as given; equals the left root for a single-tree comparer
    pub fn right_root(&self) -> &Path {
        &self.right
    }

    /// Options in effect
    pub fn options(&self) -> &CompareOptions {
        &self.options
    }

    /// Configured diff tool
    pub fn diff_tool(&self) -> &DiffTool {
        &self.diff_tool
    }

    /// Only the left root is examined
    pub fn is_single_tree(&self) -> bool {
        self.single
    }

    fn context<'a>(
        &'a self,
        rel: &Path,
        reporter: &'a mut dyn ErrorReporter,
        interrupt: &'a mut dyn InterruptSource,
    ) -> Result<WalkContext<'a>> {
        WalkContext::new(
            &self.left.join(rel),
            &self.right.join(rel),
            &self.options,
            reporter,
            interrupt,
        )
    }

    fn require_pair(&self) -> Result<()> {
        if self.single {
            return Err(TwindirError::config("a single-tree comparer can only find"));
        }
        Ok(())
    }

    /// Sides on which `rel` is a directory
    fn dir_mask(&self, rel: &Path) -> Result<SideMask> {
        let mut mask = SideMask::empty();
        let mut failure = None;
        for (side, root) in [(Side::Left, &self.left), (Side::Right, &self.right)] {
            let dir = root.join(rel);
            match fs::metadata(&dir) {
                Ok(md) if md.is_dir() => mask |= side.mask(),
                Ok(_) => {}
                Err(err) => {
                    failure.get_or_insert(TwindirError::open_dir(dir, err));
                }
            }
        }
        if mask.is_empty() {
            return Err(failure.unwrap_or_else(|| TwindirError::NotADirectory(self.left.join(rel))));
        }
        Ok(mask)
    }

    /// One directory level, `rel` below both roots
    ///
    /// A directory that exists on one side only lists as one-sided entries.
    ///
    /// # Errors
    ///
    /// - [`TwindirError::OpenDir`] if `rel` cannot be listed
    /// - [`TwindirError::NotADirectory`] if `rel` is a directory on neither side
    pub fn build_listing(&self, rel: &Path) -> Result<(DiffListing, WalkSummary)> {
        self.build_listing_with(rel, &mut LogReporter, &mut NoInterrupt)
    }

    /// [`build_listing`](Self::build_listing) with front-end hooks
    #[instrument(skip(self, reporter, interrupt))]
    pub fn build_listing_with(
        &self,
        rel: &Path,
        reporter: &mut dyn ErrorReporter,
        interrupt: &mut dyn InterruptSource,
    ) -> Result<(DiffListing, WalkSummary)> {
        self.require_pair()?;
        let mask = self.dir_mask(rel)?;
        let mut ctx = self.context(rel, reporter, interrupt)?;
        let mut listing = DiffListing::new();
        let summary = walker::build_level(&mut ctx, &mut listing, mask)?;
        debug!("{:?}: {} entries", rel, summary.entries);
        Ok((listing, summary))
    }

    /// The whole tree
    ///
    /// With `prescan` a quick scan runs first and its result is stored in
    /// [`subtree_differs`](crate::types::DiffEntry::subtree_differs) of every
    /// directory entry.
    ///
    /// # Errors
    ///
    /// - [`TwindirError::OpenDir`] if a root cannot be listed
    pub fn build_tree(&self, prescan: bool) -> Result<DiffTree> {
        self.build_tree_with(prescan, &mut LogReporter, &mut NoInterrupt)
    }

    /// [`build_tree`](Self::build_tree) with front-end hooks
    #[instrument(skip(self, reporter, interrupt))]
    pub fn build_tree_with(
        &self,
        prescan: bool,
        reporter: &mut dyn ErrorReporter,
        interrupt: &mut dyn InterruptSource,
    ) -> Result<DiffTree> {
        self.require_pair()?;
        let mask = self.dir_mask(Path::new(""))?;
        let mut ctx = self.context(Path::new(""), reporter, interrupt)?;

        let scan = if prescan {
            let mut set = ScanSet::new();
            walker::quick_scan(&mut ctx, &mut set, &Filters::default(), mask)?;
            Some(set)
        } else {
            None
        };

        let mut tree = walker::build_tree(&mut ctx, mask)?;
        if let Some(scan) = scan {
            tree.apply_scan(&scan, &self.left, &self.right);
        }
        Ok(tree)
    }

    /// Mark every directory containing a difference
    ///
    /// # Errors
    ///
    /// - [`TwindirError::OpenDir`] if a root cannot be resolved or listed
    pub fn quick_scan(&self) -> Result<(ScanSet, ScanSummary)> {
        self.quick_scan_with(&mut LogReporter, &mut NoInterrupt)
    }

    /// [`quick_scan`](Self::quick_scan) with front-end hooks
    #[instrument(skip(self, reporter, interrupt))]
    pub fn quick_scan_with(
        &self,
        reporter: &mut dyn ErrorReporter,
        interrupt: &mut dyn InterruptSource,
    ) -> Result<(ScanSet, ScanSummary)> {
        self.require_pair()?;
        let mask = self.dir_mask(Path::new(""))?;
        let mut ctx = self.context(Path::new(""), reporter, interrupt)?;
        let mut set = ScanSet::new();
        let summary = walker::quick_scan(&mut ctx, &mut set, &Filters::default(), mask)?;
        Ok((set, summary))
    }

    /// Mark every entry matching the configured name and content patterns
    ///
    /// # Errors
    ///
    /// - [`TwindirError::InvalidConfiguration`] if no pattern is configured
    /// - [`TwindirError::OpenDir`] if a root cannot be resolved or listed
    pub fn find(&self) -> Result<(ScanSet, ScanSummary)> {
        self.find_with(&mut LogReporter, &mut NoInterrupt)
    }

    /// [`find`](Self::find) with front-end hooks
    #[instrument(skip(self, reporter, interrupt))]
    pub fn find_with(
        &self,
        reporter: &mut dyn ErrorReporter,
        interrupt: &mut dyn InterruptSource,
    ) -> Result<(ScanSet, ScanSummary)> {
        if !self.filters.is_active() {
            return Err(TwindirError::config("find needs a name or content pattern"));
        }
        let mask = if self.single {
            SideMask::LEFT
        } else {
            self.dir_mask(Path::new(""))?
        };
        let mut ctx = self.context(Path::new(""), reporter, interrupt)?;
        let mut set = ScanSet::new();
        let summary = walker::quick_scan(&mut ctx, &mut set, &self.filters, mask)?;
        info!("find: {} matches", summary.hits);
        Ok((set, summary))
    }

    /// Compare the file pair at `rel` byte by byte, ignoring any skip request
    ///
    /// # Errors
    ///
    /// - [`TwindirError::Custom`] if `rel` is not a regular file on both sides
    /// - [`TwindirError::PathOverflow`] if `rel` does not fit the path buffer
    pub fn recompare(&self, rel: &Path) -> Result<ContentOutcome> {
        self.require_pair()?;
        let mut reporter = LogReporter;
        let mut interrupt = NoInterrupt;
        let mut ctx = self.context(Path::new(""), &mut reporter, &mut interrupt)?;
        let bytes = path_to_bytes(rel);
        for side in Side::ALL {
            ctx.path_mut(side).append_bytes(&bytes)?;
        }

        let probes = Side::ALL.map(|side| probe(&mut ctx, side, false));
        match (&probes[0], &probes[1]) {
            (Probe::Present(l), Probe::Present(r)) if is_regular(l) && is_regular(r) => {
                Ok(compare_files(&mut ctx, l.size, r.size, CompareMode::Forced))
            }
            _ => Err(TwindirError::custom(format!(
                "{} is not a regular file on both sides",
                rel.display()
            ))),
        }
    }

    /// External diff command for the pair at `rel`
    pub fn diff_command(&self, rel: &Path) -> Command {
        self.diff_tool.command(&self.left.join(rel), &self.right.join(rel))
    }
}

fn is_regular(meta: &SideMeta) -> bool {
    meta.kind == FileKind::Regular
}

/// Builder for [`Comparer`]
///
/// Starts from [`CompareOptions::default`]; every setter overrides one
/// option. Patterns and the diff tool are validated by
/// [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct ComparerBuilder {
    options: CompareOptions,
}

impl ComparerBuilder {
    /// Builder with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all options at once, e.g. from a JSON file
    pub fn options(mut self, options: CompareOptions) -> Self {
        self.options = options;
        self
    }

    /// Fetch metadata through symlinks
    ///
    /// A link whose target is missing still shows as a link. The link
    /// target is recorded next to the followed metadata.
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.options.follow_symlinks = follow;
        self
    }

    /// Only count regular files (and symlinks) as differences
    ///
    /// Devices, fifos and sockets are listed but not compared, and the quick
    /// scan ignores names present on one side only.
    pub fn regular_only(mut self, regular_only: bool) -> Self {
        self.options.regular_only = regular_only;
        self
    }

    /// Listing order
    pub fn sort(mut self, key: SortKey) -> Self {
        self.options.sort = key;
        self
    }

    /// Capacity of each side's path buffer
    pub fn path_capacity(mut self, capacity: usize) -> Self {
        self.options.path_capacity = capacity;
        self
    }

    /// Match patterns regardless of case (default)
    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        self.options.ignore_case = ignore_case;
        self
    }

    /// Basename regex for [`Comparer::find`]
    pub fn name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.options.name_pattern = Some(pattern.into());
        self
    }

    /// Add a content regex for [`Comparer::find`]; all must match
    pub fn content_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.options.content_patterns.push(pattern.into());
        self
    }

    /// External diff command
    pub fn diff_tool(mut self, command: impl Into<String>) -> Self {
        self.options.diff_tool = command.into();
        self
    }

    fn validate(&self) -> Result<(Filters, DiffTool)> {
        if self.options.path_capacity < MIN_PATH_CAPACITY {
            return Err(TwindirError::config(format!(
                "path capacity {} is below the minimum of {}",
                self.options.path_capacity, MIN_PATH_CAPACITY
            )));
        }
        let filters = Filters::from_options(&self.options)?;
        let diff_tool = DiffTool::new(&self.options.diff_tool)?;
        Ok((filters, diff_tool))
    }

    /// Compare two roots
    ///
    /// # Errors
    ///
    /// - [`TwindirError::OpenDir`] if a root does not exist or cannot be read
    /// - [`TwindirError::NotADirectory`] if a root is not a directory
    /// - [`TwindirError::SameDirectory`] if both roots are the same directory
    /// - [`TwindirError::InvalidPattern`] / [`TwindirError::InvalidConfiguration`]
    ///   for bad options
    pub fn build(self, left: impl Into<PathBuf>, right: impl Into<PathBuf>) -> Result<Comparer> {
        let left = left.into();
        let right = right.into();
        let (filters, diff_tool) = self.validate()?;

        let left_md = check_root(&left)?;
        let right_md = check_root(&right)?;
        let same = SideMeta::from_metadata(&left_md).same_inode(&SideMeta::from_metadata(&right_md))
            || fs::canonicalize(&left)? == fs::canonicalize(&right)?;
        if same {
            return Err(TwindirError::SameDirectory { left, right });
        }

        debug!("comparing {:?} with {:?}", left, right);
        Ok(Comparer {
            left,
            right,
            options: self.options,
            filters,
            diff_tool,
            single: false,
        })
    }

    /// Examine one root only; such a comparer can only [`find`](Comparer::find)
    ///
    /// # Errors
    ///
    /// As [`build`](Self::build), except that there is no second root.
    pub fn build_single(self, root: impl Into<PathBuf>) -> Result<Comparer> {
        let root = root.into();
        let (filters, diff_tool) = self.validate()?;
        check_root(&root)?;
        Ok(Comparer {
            right: root.clone(),
            left: root,
            options: self.options,
            filters,
            diff_tool,
            single: true,
        })
    }
}

fn check_root(path: &Path) -> Result<fs::Metadata> {
    let md = fs::metadata(path).map_err(|err| TwindirError::open_dir(path, err))?;
    if !md.is_dir() {
        return Err(TwindirError::NotADirectory(path.to_path_buf()));
    }
    Ok(md)
}
