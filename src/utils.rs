//! Utility functions for twindir
//!
//! ## Categories of Utilities
//!
//! ### Path bytes
//! The path builders work on raw bytes so that names which are not valid
//! UTF-8 survive the round trip on Unix. [`path_to_bytes`] and
//! [`bytes_to_path`] are the only places that know how a platform encodes
//! paths.
//!
//! ### Display helpers
//! Human-readable sizes and modification times.

use chrono::{Local, TimeZone};
use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::Path;

/// Raw bytes of a path
#[cfg(unix)]
pub fn path_to_bytes(path: &Path) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(path.as_os_str().as_bytes())
}

/// Raw bytes of a path
#[cfg(not(unix))]
pub fn path_to_bytes(path: &Path) -> Cow<'_, [u8]> {
    match path.to_string_lossy() {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    }
}

/// Path view of raw bytes produced by [`path_to_bytes`]
#[cfg(unix)]
pub fn bytes_to_path(bytes: &[u8]) -> Cow<'_, Path> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(Path::new(OsStr::from_bytes(bytes)))
}

/// Path view of raw bytes produced by [`path_to_bytes`]
#[cfg(not(unix))]
pub fn bytes_to_path(bytes: &[u8]) -> Cow<'_, Path> {
    Cow::Owned(std::path::PathBuf::from(String::from_utf8_lossy(bytes).into_owned()))
}

/// Raw bytes of a directory entry name
#[cfg(unix)]
pub fn name_bytes(name: &OsStr) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(name.as_bytes())
}

/// Raw bytes of a directory entry name
#[cfg(not(unix))]
pub fn name_bytes(name: &OsStr) -> Cow<'_, [u8]> {
    match name.to_string_lossy() {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    }
}

/// Format bytes as human-readable string
///
/// # Example
///
/// ```rust,ignore
/// assert_eq!(format_bytes(1536), "1.50 KB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Format an mtime (seconds since the epoch) in local time
///
/// Out-of-range values are shown as `-`.
pub fn format_mtime(secs: i64) -> String {
    match Local.timestamp_opt(secs, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => "-".to_string(),
    }
}
