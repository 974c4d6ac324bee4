//! Metadata fetch and symlink resolution for one side of an entry
//!
//! [`probe`] turns a `stat`/`lstat` of the current path of one side into a
//! tri-state: present with metadata, absent (the expected case for names that
//! exist in one tree only), or failed. Failures other than "not found" go to
//! the context's error reporter.
//!
//! [`read_link`] reads a symlink target into an owned string whose length is
//! bounded by the size the link reported when it was probed.

use crate::context::WalkContext;
use crate::types::{FileKind, Side, SideMeta, SideState};
use crate::utils::path_to_bytes;
use std::fs;
use std::io;
use tracing::trace;

/// Outcome of a metadata fetch
#[derive(Debug)]
pub enum Probe {
    /// The name exists
    Present(SideMeta),
    /// The name does not exist on this side
    Absent,
    /// The fetch failed for another reason; already reported
    Failed(io::Error),
}

impl Probe {
    /// Metadata if present
    pub fn meta(&self) -> Option<&SideMeta> {
        match self {
            Probe::Present(meta) => Some(meta),
            _ => None,
        }
    }

    /// Kind if present
    pub fn kind(&self) -> Option<FileKind> {
        self.meta().map(|m| m.kind)
    }

    /// Owned state for a [`crate::types::DiffEntry`]
    pub fn into_state(self) -> SideState {
        match self {
            Probe::Present(meta) => SideState::Present(meta),
            Probe::Absent => SideState::Absent,
            Probe::Failed(err) => SideState::Failed(err.to_string()),
        }
    }
}

/// Fetch metadata for the current path of `side`
///
/// With `follow_symlinks` the link is followed first and the entry falls back
/// to the link itself when that fails (dangling link). Outside of quick-scan
/// mode an extra `lstat` notes whether the name itself is a link, so that its
/// target can still be shown next to the followed metadata.
pub fn probe(ctx: &mut WalkContext<'_>, side: Side, scan: bool) -> Probe {
    let follow = ctx.options.follow_symlinks;
    let path = ctx.path(side).as_path();

    let mut link_len = None;
    if follow && !scan {
        if let Ok(md) = fs::symlink_metadata(&path) {
            if md.file_type().is_symlink() {
                link_len = Some(md.len());
            }
        }
    }

    let result = if follow {
        fs::metadata(&path).or_else(|_| fs::symlink_metadata(&path))
    } else {
        fs::symlink_metadata(&path)
    };

    match result {
        Ok(md) => {
            let mut meta = SideMeta::from_metadata(&md);
            if meta.kind == FileKind::Symlink {
                meta.is_link = true;
                meta.link_len = Some(meta.size);
            } else if let Some(len) = link_len {
                meta.is_link = true;
                meta.link_len = Some(len);
            }
            trace!("stat {:?}: {:?}", path, meta.kind);
            Probe::Present(meta)
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Probe::Absent,
        Err(err) => {
            let path = path.into_owned();
            ctx.report(&path, "stat", &err);
            Probe::Failed(err)
        }
    }
}

/// Read the target of the symlink at the current path of `side`
///
/// The result is cut to `expected_len` bytes when the target grew since it
/// was probed; a shorter target is accepted as is. A failed read is reported
/// and yields `None`.
pub fn read_link(ctx: &mut WalkContext<'_>, side: Side, expected_len: u64) -> Option<String> {
    let path = ctx.path(side).as_path();
    match fs::read_link(&path) {
        Ok(target) => {
            let bytes = path_to_bytes(&target);
            let limit = usize::try_from(expected_len).unwrap_or(usize::MAX);
            let end = if limit == 0 { bytes.len() } else { bytes.len().min(limit) };
            Some(String::from_utf8_lossy(&bytes[..end]).into_owned())
        }
        Err(err) => {
            let path = path.into_owned();
            ctx.report(&path, "readlink", &err);
            None
        }
    }
}
