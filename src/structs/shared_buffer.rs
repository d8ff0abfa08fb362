//! # **SharedBuffer Module** - *Reference-counted Byte Region*
//!
//! Zero-copy, read-only window into an `Arc<[u8]>` owner.
//!
//! ## Purpose
//! - The reader interprets an entire IPC byte region as one `SharedBuffer`
//!   and hands out sub-windows for message metadata, record-batch bodies and
//!   individual array buffers without copying.
//! - `Buffer<T>` layers typed access on top; this type stays byte-oriented.
//!
//! ## Behaviour
//! - `slice` narrows the window; the owner stays alive for as long as any
//!   window does.
//! - Equality compares the viewed bytes, not the owner identity.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// # SharedBuffer
///
/// A `(owner, offset, len)` window over reference-counted bytes.
///
/// Sibling windows may overlap; none of them can mutate the region.
#[derive(Clone)]
pub struct SharedBuffer {
    owner: Arc<[u8]>,
    offset: usize,
    len: usize,
}

impl SharedBuffer {
    /// Wraps an owner, viewing all of it.
    #[inline]
    pub fn from_owner(owner: Arc<[u8]>) -> Self {
        let len = owner.len();
        Self {
            owner,
            offset: 0,
            len,
        }
    }

    /// Copies a `Vec<u8>` into a fresh shared region.
    #[inline]
    pub fn from_vec(v: Vec<u8>) -> Self {
        Self::from_owner(Arc::from(v.into_boxed_slice()))
    }

    /// Returns the viewed bytes.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.owner[self.offset..self.offset + self.len]
    }

    /// Number of bytes in the window.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Narrows the window to `range` (relative to this window).
    ///
    /// Panics when the range exceeds the window; callers on untrusted input
    /// bounds-check first and surface `MalformedFrame`.
    #[inline]
    pub fn slice(&self, range: Range<usize>) -> SharedBuffer {
        assert!(
            range.start <= range.end && range.end <= self.len,
            "SharedBuffer::slice out of bounds ({:?} of {})",
            range,
            self.len
        );
        SharedBuffer {
            owner: self.owner.clone(),
            offset: self.offset + range.start,
            len: range.end - range.start,
        }
    }
}

impl Default for SharedBuffer {
    #[inline]
    fn default() -> Self {
        Self::from_owner(Arc::from(Vec::new().into_boxed_slice()))
    }
}

impl PartialEq for SharedBuffer {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedBuffer([u8; {}])", self.len)
    }
}

impl From<Vec<u8>> for SharedBuffer {
    #[inline]
    fn from(v: Vec<u8>) -> Self {
        Self::from_vec(v)
    }
}

impl From<Arc<[u8]>> for SharedBuffer {
    #[inline]
    fn from(owner: Arc<[u8]>) -> Self {
        Self::from_owner(owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_and_slice() {
        let sb = SharedBuffer::from_vec((0u8..32).collect());
        assert_eq!(sb.len(), 32);
        let mid = sb.slice(8..16);
        assert_eq!(mid.as_slice(), &(8u8..16).collect::<Vec<_>>()[..]);
        let inner = mid.slice(2..4);
        assert_eq!(inner.as_slice(), &[10, 11]);
    }

    #[test]
    fn test_equality_by_bytes() {
        let a = SharedBuffer::from_vec(vec![1, 2, 3]);
        let b = SharedBuffer::from_vec(vec![0, 1, 2, 3]).slice(1..4);
        assert_eq!(a, b);
    }

    #[test]
    #[should_panic]
    fn test_slice_out_of_bounds() {
        let sb = SharedBuffer::from_vec(vec![1, 2, 3]);
        let _ = sb.slice(1..5);
    }
}
