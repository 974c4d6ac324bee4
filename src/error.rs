//! Error types for the twindir library
//!
//! Only a small part of what goes wrong during a comparison is an *error* in
//! the `Result` sense. Entries that exist on one side only are ordinary
//! results, and per-entry I/O failures are recorded on the entry itself
//! (see [`crate::types::DiffStatus::Error`]). The variants below cover the
//! cases that abort an operation: a root that cannot be opened, an invalid
//! configuration, or a path that no longer fits the path buffer.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the twindir library
pub type Result<T> = std::result::Result<T, TwindirError>;

/// Main error type for all twindir operations
#[derive(Debug, Error)]
pub enum TwindirError {
    /// I/O errors outside of a directory walk
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A requested directory could not be opened; fatal for that walk
    #[error("Cannot open directory {path:?}: {source}")]
    OpenDir {
        /// Directory that failed to open
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// Appending a segment would exceed the path buffer capacity
    #[error("Path buffer overflow: {attempted} bytes exceeds capacity of {capacity} bytes")]
    PathOverflow {
        /// Configured buffer capacity
        capacity: usize,
        /// Length the append would have produced
        attempted: usize,
    },

    /// A root argument is not a directory
    #[error("Not a directory: {0:?}")]
    NotADirectory(PathBuf),

    /// Both roots refer to the same directory
    #[error("{left:?} and {right:?} are the same directory")]
    SameDirectory {
        /// Left root as given
        left: PathBuf,
        /// Right root as given
        right: PathBuf,
    },

    /// Name or content pattern failed to compile
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Errors during JSON serialization/deserialization of options or reports
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),

    /// Custom error type for extensions
    #[error("{0}")]
    Custom(String),
}

impl TwindirError {
    /// Create an open-directory error for `path`
    pub fn open_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TwindirError::OpenDir {
            path: path.into(),
            source,
        }
    }

    /// Create a configuration error with a custom message
    pub fn config(msg: impl Into<String>) -> Self {
        TwindirError::InvalidConfiguration(msg.into())
    }

    /// Create a custom error with a custom message
    pub fn custom(msg: impl Into<String>) -> Self {
        TwindirError::Custom(msg.into())
    }

    /// Check if the caller can reasonably continue with the other side only
    ///
    /// A root that fails to open on one side still leaves the other side
    /// browsable; everything else points at a programming or configuration
    /// mistake.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TwindirError::OpenDir { .. } | TwindirError::PathOverflow { .. })
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            TwindirError::OpenDir { path, source } => match source.kind() {
                std::io::ErrorKind::PermissionDenied => format!(
                    "Permission denied opening {:?}. Check directory permissions or run with appropriate privileges.",
                    path
                ),
                std::io::ErrorKind::NotFound => {
                    format!("Directory {:?} does not exist (it may have been removed during the walk).", path)
                }
                _ => self.to_string(),
            },
            TwindirError::SameDirectory { left, right } => {
                format!("{:?} and {:?} are the same directory, nothing to compare.", left, right)
            }
            TwindirError::PathOverflow { capacity, .. } => format!(
                "Path too long for the {} byte path buffer. Increase `path_capacity` in the options.",
                capacity
            ),
            _ => self.to_string(),
        }
    }
}
