//! # twindir - Two-pane directory comparison
//!
//! An engine that walks two directory trees in lockstep and tells, for every
//! name, whether it is identical on both sides, differs, exists on one side
//! only, or could not be read.
//!
//! ## Overview
//!
//! twindir answers three questions about a pair of directories:
//! - What does one directory level look like on both sides? ([`Comparer::build_listing`])
//! - What does the whole tree look like? ([`Comparer::build_tree`])
//! - Which directories contain a difference at all? ([`Comparer::quick_scan`])
//!
//! It can also search one or both trees for names or contents
//! ([`Comparer::find`]) and hand a pair of files to an external diff tool
//! ([`Comparer::diff_command`]).
//!
//! ## Architecture
//!
//! - **Path builders**: one length-tracked byte buffer per side; entries are
//!   appended and truncated away instead of allocating a path per entry
//! - **Probe**: metadata of one side as present / absent / failed
//! - **Classifier**: a pure decision table over two metadata records
//! - **Content comparator**: lockstep chunked reads, short-circuited by size
//!   and by inode identity
//! - **Walker**: one level, a recursive tree, or an iterative quick scan
//!   that marks differing paths in a [`ScanSet`]
//!
//! The engine is single-threaded and never blocks on the user. A front end
//! plugs in through [`ErrorReporter`] (recoverable I/O errors) and
//! [`InterruptSource`] (skip remaining comparisons, or stop).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use twindir::{Comparer, DiffStatus};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let comparer = Comparer::new("./before", "./after")?;
//!
//! let tree = comparer.build_tree(true)?;
//! for (path, entry) in tree.entries() {
//!     if entry.status == DiffStatus::Differ {
//!         println!("{} differs", path.display());
//!     }
//! }
//!
//! for line in tree.brief_lines(comparer.left_root(), comparer.right_root()) {
//!     println!("{}", line);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Only problems that make an operation meaningless are returned as
//! [`TwindirError`]: a root that cannot be opened, invalid options, the same
//! directory given twice. Per-entry failures are recorded on the entry with
//! [`DiffStatus::Error`] and shown to the [`ErrorReporter`].
//!
//! ## Module Organization
//!
//! - [`comparer`]: entry point and builder
//! - [`walker`]: build and quick-scan walks
//! - [`classify`], [`compare`], [`probe`]: per-entry decisions
//! - [`listing`], [`tree`], [`scan_set`]: results
//! - [`filter`], [`difftool`]: find mode and external tools
//! - [`interact`]: front-end seams
//! - [`types`]: common types and options
//! - [`error`]: error types and handling

// Public API modules
pub mod classify;
pub mod compare;
pub mod comparer;
pub mod context;
pub mod difftool;
pub mod error;
pub mod filter;
pub mod interact;
pub mod listing;
pub mod path_builder;
pub mod probe;
pub mod scan_set;
pub mod tree;
pub mod types;
pub mod utils;
pub mod walker;

// Internal modules (not part of public API)
mod collections;

// Re-export main types for convenience
pub use compare::ContentOutcome;
pub use comparer::{Comparer, ComparerBuilder};
pub use difftool::DiffTool;
pub use error::{Result, TwindirError};
pub use filter::Filters;
pub use interact::{ErrorReporter, ErrorResponse, InterruptSource, Signal};
pub use listing::{DiffListing, EntrySink};
pub use scan_set::ScanSet;
pub use tree::DiffTree;
pub use types::*;
