//! Entry classification
//!
//! [`classify`] is a pure function of the two sides' metadata, the already
//! resolved link targets, and a content comparison it may call. It performs
//! no I/O of its own, so every rule can be tested with synthetic metadata.
//!
//! Decision table, first match wins:
//!
//! | left / right                        | result                          |
//! |-------------------------------------|---------------------------------|
//! | either side failed                  | [`Classification::Error`]       |
//! | absent on both (vanished)           | [`Classification::Vanished`]    |
//! | present on one side only            | [`Classification::OneSided`]    |
//! | kinds differ                        | [`Classification::TypeMismatch`]|
//! | same device and inode               | [`Classification::Hardlink`]    |
//! | regular files                       | [`Classification::Content`]     |
//! | directories                         | [`Classification::Directory`]   |
//! | symlinks                            | [`Classification::Links`]       |
//! | same special kind                   | [`Classification::Special`] or [`Classification::NotCompared`] |
//!
//! A special pair records whether the full mode words differ; only the quick
//! scan looks at it.

use crate::compare::ContentOutcome;
use crate::types::{DiffStatus, FileKind, Side, SideMeta};

/// Borrowed view of one side for classification
#[derive(Debug, Clone, Copy)]
pub enum SideView<'a> {
    /// Not in this tree
    Absent,
    /// Metadata fetch failed
    Failed,
    /// Present with metadata
    Present(&'a SideMeta),
}

/// Symlink pair verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Same target string
    Equal,
    /// Different target strings
    Differ,
    /// A target could not be read; the pair is left out
    Unresolved,
}

/// Closed set of classification results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Exists in one tree only
    OneSided(Side),
    /// At least one side could not be read
    Error,
    /// Listed, but gone on both sides when probed
    Vanished,
    /// Present on both sides with different file kinds
    TypeMismatch,
    /// Both names refer to the same inode
    Hardlink,
    /// Regular files, with the comparison result
    Content(ContentOutcome),
    /// Directories on both sides; descent is the walker's business
    Directory,
    /// Symlinks on both sides
    Links(LinkOutcome),
    /// Same special kind (device, fifo, socket)
    Special {
        /// Permission or type bits differ
        mode_differs: bool,
    },
    /// Same special kind in regular-files-only mode
    NotCompared,
}

impl Classification {
    /// Status to record, or `None` if the entry is left out
    pub fn status(self) -> Option<DiffStatus> {
        Some(match self {
            Classification::OneSided(_) | Classification::NotCompared => DiffStatus::Unknown,
            Classification::Error | Classification::Content(ContentOutcome::Error) => DiffStatus::Error,
            Classification::TypeMismatch
            | Classification::Content(ContentOutcome::Differ)
            | Classification::Links(LinkOutcome::Differ) => DiffStatus::Differ,
            Classification::Hardlink
            | Classification::Content(ContentOutcome::Equal)
            | Classification::Directory
            | Classification::Links(LinkOutcome::Equal)
            | Classification::Special { .. } => DiffStatus::Equal,
            Classification::Vanished | Classification::Links(LinkOutcome::Unresolved) => return None,
        })
    }

    /// Counts as a difference for the quick scan
    ///
    /// With `regular_only` only differing regular files and symlinks count.
    pub fn is_hit(self, regular_only: bool) -> bool {
        match self {
            Classification::Content(ContentOutcome::Differ) | Classification::Links(LinkOutcome::Differ) => true,
            Classification::OneSided(_) | Classification::TypeMismatch => !regular_only,
            Classification::Special { mode_differs } => mode_differs && !regular_only,
            _ => false,
        }
    }
}

/// Classify one name
///
/// `links` are the targets already read for the two sides; they only matter
/// when both sides are symlinks. `content` is called at most once, and only
/// for two regular files that are not the same inode.
pub fn classify<F>(
    left: SideView<'_>,
    right: SideView<'_>,
    links: (Option<&str>, Option<&str>),
    regular_only: bool,
    content: F,
) -> Classification
where
    F: FnOnce(&SideMeta, &SideMeta) -> ContentOutcome,
{
    let (l, r) = match (left, right) {
        (SideView::Failed, _) | (_, SideView::Failed) => return Classification::Error,
        (SideView::Absent, SideView::Absent) => return Classification::Vanished,
        (SideView::Present(_), SideView::Absent) => return Classification::OneSided(Side::Left),
        (SideView::Absent, SideView::Present(_)) => return Classification::OneSided(Side::Right),
        (SideView::Present(l), SideView::Present(r)) => (l, r),
    };

    if l.kind != r.kind {
        return Classification::TypeMismatch;
    }

    if l.same_inode(r) {
        return Classification::Hardlink;
    }

    match l.kind {
        FileKind::Regular => Classification::Content(content(l, r)),
        FileKind::Directory => Classification::Directory,
        FileKind::Symlink => match links {
            (Some(a), Some(b)) if a == b => Classification::Links(LinkOutcome::Equal),
            (Some(_), Some(_)) => Classification::Links(LinkOutcome::Differ),
            _ => Classification::Links(LinkOutcome::Unresolved),
        },
        _ if regular_only => Classification::NotCompared,
        _ => Classification::Special {
            mode_differs: l.mode != r.mode,
        },
    }
}
