//! Core data types used throughout the twindir library
//!
//! ## Overview
//!
//! The types in this module represent:
//! - **Per-side state**: [`SideMeta`], [`SideState`], [`FileKind`] - what one tree
//!   says about a name
//! - **Results**: [`DiffEntry`], [`DiffStatus`], [`WalkSummary`], [`ScanSummary`]
//! - **Addressing**: [`Side`], [`SideMask`] - which tree(s) an operation concerns
//! - **Configuration**: [`CompareOptions`], [`SortKey`]
//!
//! ## Examples
//!
//! ```rust
//! use twindir::types::{CompareOptions, SortKey};
//!
//! let options = CompareOptions {
//!     follow_symlinks: true,
//!     sort: SortKey::FilesFirst,
//!     ..Default::default()
//! };
//! assert!(!options.regular_only);
//! ```

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fs;

/// Default capacity of each side's path buffer, in bytes
pub const DEFAULT_PATH_CAPACITY: usize = 4096;

bitflags! {
    /// Which root(s) an operation concerns
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SideMask: u8 {
        /// Left root only
        const LEFT = 0b01;
        /// Right root only
        const RIGHT = 0b10;
        /// Both roots
        const BOTH = Self::LEFT.bits() | Self::RIGHT.bits();
    }
}

/// One of the two compared trees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// First root given
    Left,
    /// Second root given
    Right,
}

impl Side {
    /// Both sides, left first
    pub const ALL: [Side; 2] = [Side::Left, Side::Right];

    /// Array index of this side
    pub fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }

    /// Mask selecting only this side
    pub fn mask(self) -> SideMask {
        match self {
            Side::Left => SideMask::LEFT,
            Side::Right => SideMask::RIGHT,
        }
    }

    /// The opposite side
    pub fn other(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// File type family as reported by the metadata fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileKind {
    /// Regular file
    Regular,
    /// Directory
    Directory,
    /// Symbolic link (only seen when links are not followed, or dangling)
    Symlink,
    /// Character device
    CharDevice,
    /// Block device
    BlockDevice,
    /// Named pipe
    Fifo,
    /// Unix domain socket
    Socket,
    /// Anything the platform reports that is none of the above
    Other,
}

impl FileKind {
    /// Map a std file type onto a kind
    pub fn from_file_type(ft: fs::FileType) -> Self {
        if ft.is_file() {
            return FileKind::Regular;
        }
        if ft.is_dir() {
            return FileKind::Directory;
        }
        if ft.is_symlink() {
            return FileKind::Symlink;
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileTypeExt;
            if ft.is_char_device() {
                return FileKind::CharDevice;
            }
            if ft.is_block_device() {
                return FileKind::BlockDevice;
            }
            if ft.is_fifo() {
                return FileKind::Fifo;
            }
            if ft.is_socket() {
                return FileKind::Socket;
            }
        }
        FileKind::Other
    }

    /// One-character tag used in listings (`ls -F` style)
    pub fn tag(self) -> char {
        match self {
            FileKind::Regular => ' ',
            FileKind::Directory => '/',
            FileKind::Symlink => '@',
            FileKind::CharDevice => 'c',
            FileKind::BlockDevice => 'b',
            FileKind::Fifo => '|',
            FileKind::Socket => '=',
            FileKind::Other => '?',
        }
    }
}

/// Metadata of one side of an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideMeta {
    /// File type family
    pub kind: FileKind,
    /// Unix permission and type bits (0 where unavailable)
    pub mode: u32,
    /// Owner user id
    pub uid: u32,
    /// Owner group id
    pub gid: u32,
    /// Size in bytes; for symlinks the length of the target
    pub size: u64,
    /// Modification time, seconds since the epoch
    pub mtime: i64,
    /// Device id for character and block devices
    pub rdev: u64,
    /// Device holding the inode
    pub dev: u64,
    /// Inode number
    pub ino: u64,
    /// The name itself is a symlink, even though `kind` describes its target
    pub is_link: bool,
    /// Length of the link target when `is_link` is set
    pub link_len: Option<u64>,
}

impl SideMeta {
    /// Build from std metadata
    pub fn from_metadata(md: &fs::Metadata) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            SideMeta {
                kind: FileKind::from_file_type(md.file_type()),
                mode: md.mode(),
                uid: md.uid(),
                gid: md.gid(),
                size: md.size(),
                mtime: md.mtime(),
                rdev: md.rdev(),
                dev: md.dev(),
                ino: md.ino(),
                is_link: false,
                link_len: None,
            }
        }
        #[cfg(not(unix))]
        {
            let mtime = md
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);
            SideMeta {
                kind: FileKind::from_file_type(md.file_type()),
                mode: 0,
                uid: 0,
                gid: 0,
                size: md.len(),
                mtime,
                rdev: 0,
                dev: 0,
                ino: 0,
                is_link: false,
                link_len: None,
            }
        }
    }

    /// Same device and inode as `other`, i.e. the very same file
    ///
    /// Platforms without inode numbers report zero for both, which never
    /// counts as a match.
    pub fn same_inode(&self, other: &SideMeta) -> bool {
        self.ino != 0 && self.ino == other.ino && self.dev == other.dev
    }
}

/// What one tree says about a name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SideState {
    /// The name does not exist in this tree
    Absent,
    /// Metadata fetch failed with something other than "not found"
    Failed(String),
    /// The name exists with this metadata
    Present(SideMeta),
}

impl SideState {
    /// Metadata if present
    pub fn meta(&self) -> Option<&SideMeta> {
        match self {
            SideState::Present(meta) => Some(meta),
            _ => None,
        }
    }

    /// Name does not exist on this side
    pub fn is_absent(&self) -> bool {
        matches!(self, SideState::Absent)
    }

    /// Metadata fetch failed on this side
    pub fn is_failed(&self) -> bool {
        matches!(self, SideState::Failed(_))
    }

    /// Kind of the present entry
    pub fn kind(&self) -> Option<FileKind> {
        self.meta().map(|m| m.kind)
    }
}

/// Verdict recorded on an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DiffStatus {
    /// Not classified; also the status of one-sided entries
    #[default]
    Unknown,
    /// Both sides hold the same content
    Equal,
    /// Contents, link targets or types differ
    Differ,
    /// Metadata of at least one side could not be read
    Error,
}

impl DiffStatus {
    /// Single-character marker for compact listings
    pub fn symbol(self) -> char {
        match self {
            DiffStatus::Unknown => ' ',
            DiffStatus::Equal => '=',
            DiffStatus::Differ => '!',
            DiffStatus::Error => '-',
        }
    }
}

/// One record per compared name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    /// Basename
    pub name: String,
    /// Left and right state, indexed by [`Side::index`]
    pub sides: [SideState; 2],
    /// Resolved target when the left side is a symlink
    pub left_link_target: Option<String>,
    /// Resolved target when the right side is a symlink
    pub right_link_target: Option<String>,
    /// Classification result
    pub status: DiffStatus,
    /// Quick-scan verdict for directories: `Some(true)` if anything below differs
    pub subtree_differs: Option<bool>,
}

impl DiffEntry {
    /// Create an unclassified entry
    ///
    /// Returns `None` when the name is absent on both sides; such an entry
    /// carries no information and is never recorded.
    pub fn new(name: impl Into<String>, left: SideState, right: SideState) -> Option<Self> {
        if left.is_absent() && right.is_absent() {
            return None;
        }
        let status = if left.is_failed() || right.is_failed() {
            DiffStatus::Error
        } else {
            DiffStatus::Unknown
        };
        Some(DiffEntry {
            name: name.into(),
            sides: [left, right],
            left_link_target: None,
            right_link_target: None,
            status,
            subtree_differs: None,
        })
    }

    /// State of one side
    pub fn side(&self, side: Side) -> &SideState {
        &self.sides[side.index()]
    }

    /// Metadata of one side, if present
    pub fn meta(&self, side: Side) -> Option<&SideMeta> {
        self.sides[side.index()].meta()
    }

    /// Link target of one side, if resolved
    pub fn link_target(&self, side: Side) -> Option<&str> {
        match side {
            Side::Left => self.left_link_target.as_deref(),
            Side::Right => self.right_link_target.as_deref(),
        }
    }

    /// Store the link target of one side
    pub fn set_link_target(&mut self, side: Side, target: Option<String>) {
        match side {
            Side::Left => self.left_link_target = target,
            Side::Right => self.right_link_target = target,
        }
    }

    /// The side holding the name when the entry exists in one tree only
    pub fn only_in(&self) -> Option<Side> {
        match (&self.sides[0], &self.sides[1]) {
            (SideState::Present(_), SideState::Absent) => Some(Side::Left),
            (SideState::Absent, SideState::Present(_)) => Some(Side::Right),
            _ => None,
        }
    }

    /// Kind used for sorting and display: left wins, right as fallback
    pub fn kind(&self) -> Option<FileKind> {
        self.sides[0].kind().or_else(|| self.sides[1].kind())
    }

    /// Directory on at least one side
    pub fn is_dir(&self) -> bool {
        self.sides.iter().any(|s| s.kind() == Some(FileKind::Directory))
    }

    /// Sides on which this name is a directory, for descent
    pub fn dir_mask(&self) -> SideMask {
        let mut mask = SideMask::empty();
        for side in Side::ALL {
            if self.side(side).kind() == Some(FileKind::Directory) {
                mask |= side.mask();
            }
        }
        mask
    }

    /// Present on both sides with different kinds
    pub fn is_type_mismatch(&self) -> bool {
        match (self.sides[0].kind(), self.sides[1].kind()) {
            (Some(l), Some(r)) => l != r,
            _ => false,
        }
    }

    /// Anything a "show differences only" view would keep
    pub fn is_difference(&self) -> bool {
        self.only_in().is_some()
            || matches!(self.status, DiffStatus::Differ | DiffStatus::Error)
            || self.subtree_differs == Some(true)
    }
}

/// How an [`crate::listing::EntrySink`] orders a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    /// Directories before everything else, then by name
    #[default]
    DirsFirst,
    /// Non-directories before directories, then by name
    FilesFirst,
    /// By name only
    Mixed,
}

/// Which listing pass produced an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortHint {
    /// Found while listing the left directory (may exist on both sides)
    LeftPass,
    /// Found only while listing the right directory
    RightPass,
}

/// Statistics of one build walk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkSummary {
    /// Directory levels listed
    pub directories: usize,
    /// Entries handed to the sink
    pub entries: usize,
    /// Symlink pairs left out because a target could not be read
    pub omitted: usize,
    /// Entries recorded with [`DiffStatus::Error`]
    pub errors: usize,
    /// Content comparisons performed
    pub comparisons: usize,
    /// Content comparisons answered by the skip flag
    pub comparisons_skipped: usize,
    /// The walk was stopped by the user
    pub cancelled: bool,
}

impl WalkSummary {
    /// Fold another summary into this one
    pub fn absorb(&mut self, other: &WalkSummary) {
        self.directories += other.directories;
        self.entries += other.entries;
        self.omitted += other.omitted;
        self.errors += other.errors;
        self.comparisons += other.comparisons;
        self.comparisons_skipped += other.comparisons_skipped;
        self.cancelled |= other.cancelled;
    }
}

/// Statistics of one quick scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Directory levels scanned
    pub directories: usize,
    /// Leaves found to differ (or to match, in find mode)
    pub hits: usize,
    /// Paths newly inserted into the scan set
    pub marked: usize,
    /// Directories that could not be opened
    pub unreadable: usize,
    /// The scan was stopped by the user
    pub cancelled: bool,
}

/// Options controlling a comparison
///
/// Serializable so a front end can keep them in a JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareOptions {
    /// Fetch metadata through symlinks
    pub follow_symlinks: bool,
    /// Only regular files count as differences; specials are not compared
    pub regular_only: bool,
    /// Listing order
    pub sort: SortKey,
    /// Capacity of each side's path buffer
    pub path_capacity: usize,
    /// Match filters without regard to case
    pub ignore_case: bool,
    /// Basename regex for find mode
    pub name_pattern: Option<String>,
    /// Content regexes for grep mode, all of which must match
    pub content_patterns: Vec<String>,
    /// External diff tool; `$1` and `$2` stand for the two paths
    pub diff_tool: String,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            regular_only: false,
            sort: SortKey::DirsFirst,
            path_capacity: DEFAULT_PATH_CAPACITY,
            ignore_case: true,
            name_pattern: None,
            content_patterns: Vec::new(),
            diff_tool: crate::difftool::DEFAULT_DIFF_TOOL.to_string(),
        }
    }
}
