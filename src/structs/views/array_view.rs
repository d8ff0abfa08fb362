//! # **ArrayV Module** - *Zero-copy Array Window*
//!
//! `(array, offset, len)` view used for list, fixed-size-list and map
//! element access. The wrapped `Array` holds its payload behind `Arc`, so
//! cloning into a view is constant-time and copy-free.

use std::fmt::{Debug, Display, Formatter};

use crate::{Array, Value};

/// # ArrayV
///
/// A logical window `[offset, offset + len)` over an array.
#[derive(Clone)]
pub struct ArrayV {
    pub array: Array,
    pub offset: usize,
    pub len: usize,
}

impl ArrayV {
    #[inline]
    pub fn new(array: Array, offset: usize, len: usize) -> Self {
        debug_assert!(offset + len <= array.len(), "ArrayV window out of bounds");
        Self { array, offset, len }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Element access relative to the window.
    #[inline]
    pub fn value(&self, idx: usize) -> Value<'_> {
        assert!(idx < self.len, "ArrayV::value out of bounds");
        self.array.value(self.offset + idx)
    }

    /// Materialises the window as an owned array.
    pub fn to_array(&self) -> Array {
        self.array.slice_clone(self.offset, self.len)
    }

    /// Iterates the windowed elements.
    pub fn iter(&self) -> impl Iterator<Item = Value<'_>> + '_ {
        (0..self.len).map(|i| self.value(i))
    }
}

impl PartialEq for ArrayV {
    /// Element-wise equality: two windows are equal when they expose the
    /// same value sequence, regardless of backing layout.
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && (0..self.len).all(|i| self.value(i) == other.value(i))
    }
}

impl Debug for ArrayV {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ArrayV [{}..{}]", self.offset, self.offset + self.len)
    }
}

impl Display for ArrayV {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for i in 0..self.len {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", self.value(i))?;
        }
        write!(f, "]")
    }
}
