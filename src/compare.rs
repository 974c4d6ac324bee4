//! Streaming byte comparison of two regular files
//!
//! The comparison never hashes and never reads more than it must:
//!
//! 1. Different sizes differ without any I/O.
//! 2. Two empty files are equal without any I/O.
//! 3. Otherwise both files are read in lockstep in [`CHUNK_SIZE`] pieces and
//!    the first mismatching chunk ends the comparison. Reading stops as soon
//!    as the size known from the metadata has been consumed, so two equal
//!    files cost `ceil(size / CHUNK_SIZE)` reads per side.
//!
//! Before each pair the interrupt source is polled once. A
//! [`Signal::SkipCompare`](crate::interact::Signal::SkipCompare) turns every
//! remaining comparison of the walk into [`ContentOutcome::Equal`].

use crate::context::WalkContext;
use crate::types::Side;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::trace;

/// Bytes read per side and step
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Result of a content comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentOutcome {
    /// Same bytes, or comparison skipped by the user
    Equal,
    /// Sizes or bytes differ
    Differ,
    /// A file could not be opened or read; already reported
    Error,
}

/// Whether the interactive skip applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareMode {
    /// Normal walk comparison: polls for and honours the skip signal
    Interactive,
    /// Explicit request: always reads
    Forced,
}

/// Which side failed during [`compare_streams`]
#[derive(Debug)]
pub struct StreamError {
    /// Side whose read failed
    pub side: Side,
    /// The read error
    pub error: io::Error,
}

/// Compare the files currently addressed by the two path builders
pub fn compare_files(
    ctx: &mut WalkContext<'_>,
    left_size: u64,
    right_size: u64,
    mode: CompareMode,
) -> ContentOutcome {
    if left_size != right_size {
        return ContentOutcome::Differ;
    }
    if left_size == 0 {
        return ContentOutcome::Equal;
    }

    if mode == CompareMode::Interactive {
        if ctx.skip_compare() {
            return ContentOutcome::Equal;
        }
        ctx.poll();
        if ctx.skip_compare() {
            return ContentOutcome::Equal;
        }
    }

    let left_path = ctx.path(Side::Left).as_path().into_owned();
    let right_path = ctx.path(Side::Right).as_path().into_owned();
    compare_paths(ctx, &left_path, &right_path, left_size)
}

fn compare_paths(ctx: &mut WalkContext<'_>, left: &Path, right: &Path, size: u64) -> ContentOutcome {
    let mut left_file = match File::open(left) {
        Ok(f) => f,
        Err(err) => {
            ctx.report(left, "open", &err);
            return ContentOutcome::Error;
        }
    };
    let mut right_file = match File::open(right) {
        Ok(f) => f,
        Err(err) => {
            ctx.report(right, "open", &err);
            return ContentOutcome::Error;
        }
    };

    match compare_streams(&mut left_file, &mut right_file, size) {
        Ok(equal) => {
            trace!("compared {:?} and {:?}: {}", left, right, if equal { "equal" } else { "differ" });
            if equal {
                ContentOutcome::Equal
            } else {
                ContentOutcome::Differ
            }
        }
        Err(StreamError { side, error }) => {
            let path = match side {
                Side::Left => left,
                Side::Right => right,
            };
            ctx.report(path, "read", &error);
            ContentOutcome::Error
        }
    }
}

/// Compare two readers expected to hold `size` bytes each
///
/// Returns `Ok(true)` when both yield the same bytes. A reader ending before
/// the other, or before `size`, counts as a difference. Bytes beyond `size`
/// are not looked at.
pub fn compare_streams<L: Read, R: Read>(left: &mut L, right: &mut R, size: u64) -> Result<bool, StreamError> {
    let mut lbuf = vec![0u8; CHUNK_SIZE];
    let mut rbuf = vec![0u8; CHUNK_SIZE];
    let mut remaining = size;

    while remaining > 0 {
        let want = usize::try_from(remaining).map_or(CHUNK_SIZE, |r| r.min(CHUNK_SIZE));
        let l = read_chunk(left, &mut lbuf[..want]).map_err(|error| StreamError { side: Side::Left, error })?;
        let r = read_chunk(right, &mut rbuf[..want]).map_err(|error| StreamError { side: Side::Right, error })?;

        if l != r || lbuf[..l] != rbuf[..r] {
            return Ok(false);
        }
        if l < want {
            // both ended early and identically: file shrank since the stat
            return Ok(true);
        }
        remaining -= l as u64;
    }

    Ok(true)
}

/// Fill `buf` as far as the reader allows; short only at end of stream
fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}
