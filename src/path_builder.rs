//! Length-tracked path buffer, one per compared tree
//!
//! The walker never allocates a fresh `PathBuf` per entry. Each side keeps a
//! single buffer; a name is appended before the entry is probed and the
//! buffer is truncated back to the saved length afterwards. Appending the
//! parent reference `..` pops the last segment instead.
//!
//! The capacity is fixed when the builder is created. An append that would
//! not leave room for one more separator and terminator fails with
//! [`TwindirError::PathOverflow`] and leaves the buffer untouched.

use crate::error::{Result, TwindirError};
use crate::utils::{bytes_to_path, path_to_bytes};
use std::borrow::Cow;
use std::path::Path;

const SEPARATOR: u8 = b'/';
const PARENT: &[u8] = b"..";

/// Mutable path buffer with a bounded capacity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathBuilder {
    buf: Vec<u8>,
    capacity: usize,
}

impl PathBuilder {
    /// Create a builder holding `root`
    ///
    /// # Errors
    ///
    /// - [`TwindirError::PathOverflow`] if `root` alone does not fit
    pub fn new(root: &Path, capacity: usize) -> Result<Self> {
        let mut builder = Self {
            buf: Vec::with_capacity(capacity),
            capacity,
        };
        builder.append_bytes(&path_to_bytes(root))?;
        Ok(builder)
    }

    /// Current length in bytes
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Buffer holds nothing
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current path
    pub fn as_path(&self) -> Cow<'_, Path> {
        bytes_to_path(&self.buf)
    }

    /// Raw bytes of the current path
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Append a segment, or pop one when `segment` is `..`
    ///
    /// Returns the new length.
    pub fn append(&mut self, segment: &str) -> Result<usize> {
        self.append_bytes(segment.as_bytes())
    }

    /// Byte-level [`append`](Self::append) for names that are not UTF-8
    pub fn append_bytes(&mut self, segment: &[u8]) -> Result<usize> {
        if segment == PARENT {
            return Ok(self.pop());
        }

        let needs_separator = !segment.is_empty()
            && !self.buf.is_empty()
            && self.buf.last() != Some(&SEPARATOR);
        let new_len = self.buf.len() + usize::from(needs_separator) + segment.len();

        // one more byte each for a following separator and the terminator
        if new_len + 2 > self.capacity {
            return Err(TwindirError::PathOverflow {
                capacity: self.capacity,
                attempted: new_len,
            });
        }

        if needs_separator {
            self.buf.push(SEPARATOR);
        }
        self.buf.extend_from_slice(segment);
        Ok(self.buf.len())
    }

    /// Remove the last segment
    ///
    /// `/x/y` becomes `/x`, `/x` becomes `/`, and `/` stays `/`. A relative
    /// single segment becomes empty. Returns the new length.
    pub fn pop(&mut self) -> usize {
        if self.buf.len() <= 1 {
            return self.buf.len();
        }
        match self.buf.iter().rposition(|&b| b == SEPARATOR) {
            Some(0) => self.buf.truncate(1),
            Some(pos) => self.buf.truncate(pos),
            None => self.buf.clear(),
        }
        self.buf.len()
    }

    /// Restore a length previously returned by [`len`](Self::len)
    ///
    /// Lengths beyond the current one are ignored.
    pub fn truncate(&mut self, len: usize) {
        self.buf.truncate(len);
    }
}
