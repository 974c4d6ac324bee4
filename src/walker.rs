//! Dual-rooted directory walker
//!
//! The walker drives the probe, the classifier and the content comparator
//! over the two trees. Both path builders of the [`WalkContext`] point at the
//! directory being walked; every entry is appended, probed and classified,
//! and the builders are truncated back before the next one.
//!
//! ## Build mode
//!
//! [`build_level`] lists one directory level. The left directory is listed
//! first and every name is probed on both sides; the right directory is
//! listed second and only names not seen on the left are recorded. The sink
//! sorts once both passes are done. [`build_tree`] repeats this depth-first,
//! pre-order, descending into directories present on both sides and into
//! directories present on one side only.
//!
//! ## Quick scan
//!
//! [`quick_scan`] does not record entries. It only looks for the first
//! evidence of a difference in each directory and marks the differing leaf
//! and its ancestors in a [`ScanSet`], which a front end uses to flag
//! directories worth opening. Pending directories live on an explicit
//! stack. With a [`Filters`] set active the scan becomes a find: entries
//! matching the filters are marked instead of differing ones.
//!
//! ## Failures
//!
//! Only a directory that cannot be opened at the top of a walk aborts it
//! with [`TwindirError::OpenDir`]. Everything else is reported through the
//! context and the walk goes on: failed metadata becomes an entry with
//! [`DiffStatus::Error`], unreadable directory entries and sub-directories
//! are skipped.

use crate::classify::{classify, Classification, SideView};
use crate::collections::{HashSet, HashSetExt};
use crate::compare::{compare_files, CompareMode};
use crate::context::WalkContext;
use crate::error::{Result, TwindirError};
use crate::filter::Filters;
use crate::listing::{DiffListing, EntrySink};
use crate::probe::{probe, read_link, Probe};
use crate::scan_set::ScanSet;
use crate::tree::DiffTree;
use crate::types::{
    DiffEntry, DiffStatus, FileKind, ScanSummary, Side, SideMask, SideMeta, SortHint, WalkSummary,
};
use crate::utils::{name_bytes, path_to_bytes};
use std::ffi::{OsStr, OsString};
use std::fs::{self, ReadDir};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

/// Directory waiting to be scanned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDir {
    /// Path below the roots
    pub rel: PathBuf,
    /// Sides on which the directory exists
    pub mask: SideMask,
}

fn sides(mask: SideMask) -> impl Iterator<Item = Side> {
    Side::ALL.into_iter().filter(move |side| mask.contains(side.mask()))
}

fn view(probe: &Probe) -> SideView<'_> {
    match probe {
        Probe::Present(meta) => SideView::Present(meta),
        Probe::Absent => SideView::Absent,
        Probe::Failed(_) => SideView::Failed,
    }
}

fn open_dir(ctx: &WalkContext<'_>, side: Side) -> Result<ReadDir> {
    let dir = ctx.path(side).as_path().into_owned();
    fs::read_dir(&dir).map_err(|err| TwindirError::open_dir(dir, err))
}

/// Next name of a listing; unreadable entries are reported and skipped
fn next_name(ctx: &mut WalkContext<'_>, listing: &mut ReadDir, dir: &Path) -> Option<OsString> {
    loop {
        match listing.next()? {
            Ok(item) => return Some(item.file_name()),
            Err(err) => ctx.report(dir, "readdir", &err),
        }
    }
}

/// Append `segment` to the builders of every side in `mask`
fn enter(ctx: &mut WalkContext<'_>, mask: SideMask, segment: &[u8]) -> Result<()> {
    for side in sides(mask) {
        ctx.path_mut(side).append_bytes(segment)?;
    }
    Ok(())
}

/// Report an error that made the walk skip a path
fn report_skipped(ctx: &mut WalkContext<'_>, path: &Path, err: TwindirError) {
    match err {
        TwindirError::OpenDir { path, source } => ctx.report(&path, "opendir", &source),
        other => ctx.report(path, "path", &io::Error::other(other)),
    }
}

/// Build one directory level into `sink`
///
/// The builders must point at the directory on every side in `mask`; a side
/// outside the mask counts as absent for every name.
///
/// # Errors
///
/// - [`TwindirError::OpenDir`] if a directory in `mask` cannot be listed
pub fn build_level(ctx: &mut WalkContext<'_>, sink: &mut dyn EntrySink, mask: SideMask) -> Result<WalkSummary> {
    let left = if mask.contains(SideMask::LEFT) {
        Some(open_dir(ctx, Side::Left)?)
    } else {
        None
    };
    let right = if mask.contains(SideMask::RIGHT) {
        Some(open_dir(ctx, Side::Right)?)
    } else {
        None
    };

    debug!(
        "building {:?} | {:?}",
        ctx.path(Side::Left).as_path(),
        ctx.path(Side::Right).as_path()
    );

    let mut summary = WalkSummary {
        directories: 1,
        ..Default::default()
    };
    let mut seen: HashSet<OsString> = HashSet::new();

    if let Some(mut listing) = left {
        let dir = ctx.path(Side::Left).as_path().into_owned();
        while let Some(name) = next_name(ctx, &mut listing, &dir) {
            if ctx.should_stop() {
                summary.cancelled = true;
                break;
            }
            visit(ctx, sink, &name, mask, SortHint::LeftPass, &mut summary);
            if right.is_some() {
                seen.insert(name);
            }
        }
    }

    if let Some(mut listing) = right.filter(|_| !summary.cancelled) {
        let dir = ctx.path(Side::Right).as_path().into_owned();
        while let Some(name) = next_name(ctx, &mut listing, &dir) {
            if ctx.should_stop() {
                summary.cancelled = true;
                break;
            }
            if seen.contains(&name) {
                continue;
            }
            visit(ctx, sink, &name, SideMask::RIGHT, SortHint::RightPass, &mut summary);
        }
    }

    sink.sort(ctx.options.sort);
    Ok(summary)
}

/// Probe, classify and record one name
///
/// `present` lists the sides on which the name is probed; the others are
/// absent without a lookup.
fn visit(
    ctx: &mut WalkContext<'_>,
    sink: &mut dyn EntrySink,
    name: &OsStr,
    present: SideMask,
    hint: SortHint,
    summary: &mut WalkSummary,
) {
    let mark = ctx.mark();
    if let Err(err) = enter(ctx, present, &name_bytes(name)) {
        ctx.restore(mark);
        let side = sides(present).next().unwrap_or(Side::Left);
        let path = ctx.path(side).as_path().join(name);
        report_skipped(ctx, &path, err);
        return;
    }

    let probes = Side::ALL.map(|side| {
        if present.contains(side.mask()) {
            probe(ctx, side, false)
        } else {
            Probe::Absent
        }
    });
    let targets = Side::ALL.map(|side| match probes[side.index()].meta() {
        Some(meta) if meta.is_link => read_link(ctx, side, meta.link_len.unwrap_or(0)),
        _ => None,
    });

    let regular_only = ctx.options.regular_only;
    let mut compared = 0;
    let mut skipped = 0;
    let classification = classify(
        view(&probes[0]),
        view(&probes[1]),
        (targets[0].as_deref(), targets[1].as_deref()),
        regular_only,
        |l: &SideMeta, r: &SideMeta| {
            let outcome = compare_files(ctx, l.size, r.size, CompareMode::Interactive);
            if l.size == r.size && l.size > 0 {
                if ctx.skip_compare() {
                    skipped += 1;
                } else {
                    compared += 1;
                }
            }
            outcome
        },
    );
    ctx.restore(mark);
    summary.comparisons += compared;
    summary.comparisons_skipped += skipped;

    let Some(status) = classification.status() else {
        if classification == Classification::Vanished {
            trace!("{:?} vanished on both sides", name);
        } else {
            // only reachable when a link is replaced between lstat and readlink
            debug!("omitting {:?}: link target unreadable", name);
            summary.omitted += 1;
        }
        return;
    };

    let [left, right] = probes;
    let Some(mut entry) = DiffEntry::new(name.to_string_lossy(), left.into_state(), right.into_state()) else {
        return;
    };
    entry.status = status;
    let [left_target, right_target] = targets;
    entry.set_link_target(Side::Left, left_target);
    entry.set_link_target(Side::Right, right_target);

    if status == DiffStatus::Error {
        summary.errors += 1;
    }
    trace!("{} {:?}", status.symbol(), entry.name);
    sink.add(entry, hint);
    summary.entries += 1;
}

/// Sides to descend into below `entry`
fn descent_mask(entry: &DiffEntry) -> SideMask {
    match entry.only_in() {
        Some(side) if entry.is_dir() => side.mask(),
        Some(_) => SideMask::empty(),
        None if entry.dir_mask() == SideMask::BOTH => SideMask::BOTH,
        None => SideMask::empty(),
    }
}

/// Build the whole tree below the builders' current directories
///
/// Sub-directories that cannot be opened are reported and left out; only a
/// failure at the top level is returned.
///
/// # Errors
///
/// - [`TwindirError::OpenDir`] if a directory in `mask` cannot be listed
pub fn build_tree(ctx: &mut WalkContext<'_>, mask: SideMask) -> Result<DiffTree> {
    let tree = build_subtree(ctx, mask, PathBuf::new())?;
    info!(
        "built {} directories, {} entries, {} errors{}",
        tree.summary.directories,
        tree.summary.entries,
        tree.summary.errors,
        if tree.summary.cancelled { " (stopped)" } else { "" }
    );
    Ok(tree)
}

fn build_subtree(ctx: &mut WalkContext<'_>, mask: SideMask, rel: PathBuf) -> Result<DiffTree> {
    let mut listing = DiffListing::new();
    let mut summary = build_level(ctx, &mut listing, mask)?;
    let mut children = Vec::new();

    for entry in listing.entries() {
        if summary.cancelled || ctx.is_stopped() {
            summary.cancelled = true;
            break;
        }
        let child_mask = descent_mask(entry);
        if child_mask.is_empty() {
            continue;
        }

        let mark = ctx.mark();
        let child = match enter(ctx, child_mask, entry.name.as_bytes()) {
            Ok(()) => build_subtree(ctx, child_mask, rel.join(&entry.name)),
            Err(err) => Err(err),
        };
        ctx.restore(mark);

        match child {
            Ok(child) => {
                summary.absorb(&child.summary);
                children.push(child);
            }
            Err(err) if err.is_recoverable() => {
                let side = sides(child_mask).next().unwrap_or(Side::Left);
                let path = ctx.path(side).as_path().join(&entry.name);
                report_skipped(ctx, &path, err);
                summary.errors += 1;
            }
            Err(err) => return Err(err),
        }
    }

    Ok(DiffTree {
        path: rel,
        listing,
        children,
        summary,
    })
}

/// Directory being scanned, with lazily resolved canonical paths
struct Level<'a> {
    rel: &'a Path,
    roots: &'a [PathBuf; 2],
    dirs: [PathBuf; 2],
    canonical: [Option<PathBuf>; 2],
}

impl<'a> Level<'a> {
    fn new(ctx: &WalkContext<'_>, roots: &'a [PathBuf; 2], rel: &'a Path, mask: SideMask) -> Self {
        Self {
            rel,
            roots,
            dirs: Side::ALL.map(|side| {
                if mask.contains(side.mask()) {
                    ctx.path(side).as_path().into_owned()
                } else {
                    PathBuf::new()
                }
            }),
            canonical: [None, None],
        }
    }

    fn dir(&self, side: Side) -> &Path {
        &self.dirs[side.index()]
    }

    /// Canonical directory path; falls back to the root-relative path when
    /// the directory resolves outside the scan root
    fn canonical(&mut self, side: Side) -> &Path {
        let i = side.index();
        let dir = &self.dirs[i];
        let root = &self.roots[i];
        let rel = self.rel;
        self.canonical[i].get_or_insert_with(|| {
            fs::canonicalize(dir)
                .ok()
                .filter(|path| path.starts_with(root))
                .unwrap_or_else(|| root.join(rel))
        })
    }

    fn is_marked(&mut self, scan: &ScanSet, side: Side) -> bool {
        scan.contains(self.canonical(side))
    }

    fn mark(&mut self, scan: &mut ScanSet, side: Side, name: &OsStr, summary: &mut ScanSummary) {
        let leaf = self.canonical(side).join(name);
        let inserted = scan.mark(&leaf, &self.roots[side.index()]);
        trace!("hit {:?} ({} new)", leaf, inserted);
        summary.hits += 1;
        summary.marked += inserted;
    }
}

/// Mark the differing (or, with filters, matching) entries below the
/// builders' current directories
///
/// `mask` selects the trees to scan; a single side scans one tree, which is
/// only useful together with filters.
///
/// # Errors
///
/// - [`TwindirError::OpenDir`] if a root in `mask` cannot be resolved or listed
pub fn quick_scan(
    ctx: &mut WalkContext<'_>,
    scan: &mut ScanSet,
    filters: &Filters,
    mask: SideMask,
) -> Result<ScanSummary> {
    let base = ctx.mark();
    let mut roots = [PathBuf::new(), PathBuf::new()];
    for side in sides(mask) {
        let root = ctx.path(side).as_path().into_owned();
        roots[side.index()] = fs::canonicalize(&root).map_err(|err| TwindirError::open_dir(root, err))?;
    }

    let mut summary = ScanSummary::default();
    let mut stack = vec![PendingDir {
        rel: PathBuf::new(),
        mask,
    }];

    while let Some(dir) = stack.pop() {
        if ctx.is_stopped() {
            summary.cancelled = true;
            break;
        }
        ctx.restore(base);
        let top = dir.rel.as_os_str().is_empty();

        let result = if top {
            Ok(())
        } else {
            enter(ctx, dir.mask, &path_to_bytes(&dir.rel))
        }
        .and_then(|()| scan_dir(ctx, scan, filters, &roots, &dir, &mut stack, &mut summary));

        match result {
            Ok(()) => {}
            Err(err) if !top && err.is_recoverable() => {
                let side = sides(dir.mask).next().unwrap_or(Side::Left);
                let path = roots[side.index()].join(&dir.rel);
                report_skipped(ctx, &path, err);
                summary.unreadable += 1;
            }
            Err(err) => {
                ctx.restore(base);
                return Err(err);
            }
        }
    }

    ctx.restore(base);
    info!(
        "scanned {} directories, {} hits, {} paths marked{}",
        summary.directories,
        summary.hits,
        summary.marked,
        if summary.cancelled { " (stopped)" } else { "" }
    );
    Ok(summary)
}

fn scan_dir(
    ctx: &mut WalkContext<'_>,
    scan: &mut ScanSet,
    filters: &Filters,
    roots: &[PathBuf; 2],
    dir: &PendingDir,
    stack: &mut Vec<PendingDir>,
    summary: &mut ScanSummary,
) -> Result<()> {
    let first = if dir.mask.contains(SideMask::LEFT) {
        Side::Left
    } else {
        Side::Right
    };
    let other = first.other();
    let paired = dir.mask.contains(other.mask());

    let mut first_listing = open_dir(ctx, first)?;
    let other_listing = if paired { Some(open_dir(ctx, other)?) } else { None };
    let mut level = Level::new(ctx, roots, &dir.rel, dir.mask);
    let filtering = filters.is_active();
    let mut seen: HashSet<OsString> = HashSet::new();

    summary.directories += 1;
    trace!("scanning {:?} {:?}", dir.rel, dir.mask);

    while let Some(name) = next_name(ctx, &mut first_listing, level.dir(first)) {
        if ctx.should_stop() {
            summary.cancelled = true;
            return Ok(());
        }
        let mark = ctx.mark();
        let entered = enter(ctx, dir.mask, &name_bytes(&name));
        let hit = match entered {
            Ok(()) => scan_entry(ctx, filters, &name, first, paired, dir, stack),
            Err(err) => {
                ctx.restore(mark);
                let path = level.dir(first).join(&name);
                report_skipped(ctx, &path, err);
                None
            }
        };
        ctx.restore(mark);
        if let Some(side) = hit {
            level.mark(scan, side, &name, summary);
        }
        if paired {
            seen.insert(name);
        }
    }

    let Some(mut other_listing) = other_listing else {
        return Ok(());
    };
    if !filtering && (ctx.options.regular_only || level.is_marked(scan, first)) {
        return Ok(());
    }

    while let Some(name) = next_name(ctx, &mut other_listing, level.dir(other)) {
        if seen.contains(&name) {
            continue;
        }
        if ctx.should_stop() {
            summary.cancelled = true;
            return Ok(());
        }
        if !filtering {
            level.mark(scan, other, &name, summary);
            break;
        }

        let mark = ctx.mark();
        let hit = match enter(ctx, other.mask(), &name_bytes(&name)) {
            Ok(()) => match probe(ctx, other, true) {
                Probe::Present(meta) => {
                    if meta.kind == FileKind::Directory {
                        stack.push(PendingDir {
                            rel: dir.rel.join(&name),
                            mask: other.mask(),
                        });
                    }
                    filter_hit(ctx, filters, &name, other, &meta)
                }
                _ => false,
            },
            Err(err) => {
                ctx.restore(mark);
                let path = level.dir(other).join(&name);
                report_skipped(ctx, &path, err);
                false
            }
        };
        ctx.restore(mark);
        if hit {
            level.mark(scan, other, &name, summary);
        }
    }

    Ok(())
}

/// Probe one name during the quick scan, queue its directories and tell
/// on which side it is a hit
fn scan_entry(
    ctx: &mut WalkContext<'_>,
    filters: &Filters,
    name: &OsStr,
    first: Side,
    paired: bool,
    dir: &PendingDir,
    stack: &mut Vec<PendingDir>,
) -> Option<Side> {
    let other = first.other();
    let primary = probe(ctx, first, true);
    let secondary = if paired { probe(ctx, other, true) } else { Probe::Absent };
    if matches!(primary, Probe::Failed(_)) || matches!(secondary, Probe::Failed(_)) {
        return None;
    }

    let filtering = filters.is_active();
    let push_mask = match (primary.kind(), secondary.kind()) {
        (Some(FileKind::Directory), Some(FileKind::Directory)) => Some(SideMask::BOTH),
        (Some(FileKind::Directory), _) if filtering => Some(first.mask()),
        (_, Some(FileKind::Directory)) if filtering => Some(other.mask()),
        _ => None,
    };
    if let Some(mask) = push_mask {
        stack.push(PendingDir {
            rel: dir.rel.join(name),
            mask,
        });
    }

    if filtering {
        // grep the first side with data, the other one otherwise
        let grep = filters.content.is_some();
        let (side, meta) = match (primary.meta(), secondary.meta()) {
            (Some(meta), _) if !grep || (meta.kind == FileKind::Regular && meta.size > 0) => (first, meta),
            (_, Some(meta)) => (other, meta),
            (Some(meta), None) => (first, meta),
            (None, None) => return None,
        };
        return filter_hit(ctx, filters, name, side, meta).then_some(side);
    }

    let (left, right) = match first {
        Side::Left => (&primary, &secondary),
        Side::Right => (&secondary, &primary),
    };
    let links = match (left.meta(), right.meta()) {
        (Some(l), Some(r)) if l.kind == FileKind::Symlink && r.kind == FileKind::Symlink => (
            read_link(ctx, Side::Left, l.link_len.unwrap_or(0)),
            read_link(ctx, Side::Right, r.link_len.unwrap_or(0)),
        ),
        _ => (None, None),
    };

    let regular_only = ctx.options.regular_only;
    classify(
        view(left),
        view(right),
        (links.0.as_deref(), links.1.as_deref()),
        regular_only,
        |l: &SideMeta, r: &SideMeta| compare_files(ctx, l.size, r.size, CompareMode::Interactive),
    )
    .is_hit(regular_only)
    .then_some(first)
}

/// Whether the entry at the current path of `side` passes the filters
///
/// Once content comparison is skipped, every name that passes the name
/// filter counts as a content match.
fn filter_hit(ctx: &mut WalkContext<'_>, filters: &Filters, name: &OsStr, side: Side, meta: &SideMeta) -> bool {
    if let Some(name_filter) = &filters.name {
        if !name_filter.is_match(&name.to_string_lossy()) {
            return false;
        }
    }
    let Some(content) = &filters.content else {
        return true;
    };
    if ctx.skip_compare() {
        return true;
    }
    ctx.poll();
    if ctx.skip_compare() {
        return true;
    }
    if meta.kind != FileKind::Regular || meta.size == 0 {
        return false;
    }

    let path = ctx.path(side).as_path().into_owned();
    match content.matches_path(&path) {
        Ok(matched) => matched,
        Err(err) => {
            ctx.report(&path, "read", &err);
            false
        }
    }
}
