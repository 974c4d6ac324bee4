//! Set type used for the scan set and the per-level name sets.
//!
//! With the `gxhash` feature the faster gxhash hasher is used; it needs AES
//! and SSE2 intrinsics, so the std hasher stays the default build.

#[cfg(feature = "gxhash")]
pub use gxhash::{HashSet as GxHashSet, HashSetExt};

#[cfg(not(feature = "gxhash"))]
use std::collections::HashSet as StdHashSet;

/// Hash set that uses gxhash when available, std otherwise
#[cfg(feature = "gxhash")]
pub type HashSet<T> = GxHashSet<T>;

/// Hash set that uses gxhash when available, std otherwise
#[cfg(not(feature = "gxhash"))]
pub type HashSet<T> = StdHashSet<T>;

/// Constructor shim so both set flavours are built the same way
#[cfg(not(feature = "gxhash"))]
pub trait HashSetExt {
    /// Creates an empty set
    fn new() -> Self;

    /// Creates an empty set with room for `capacity` elements
    fn with_capacity(capacity: usize) -> Self;
}

#[cfg(not(feature = "gxhash"))]
impl<T> HashSetExt for StdHashSet<T> {
    fn new() -> Self {
        StdHashSet::new()
    }

    fn with_capacity(capacity: usize) -> Self {
        StdHashSet::with_capacity(capacity)
    }
}
