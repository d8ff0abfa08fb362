//! Core `MaskedArray` trait, providing a common interface for all base array
//! types, including support for null masks.

use crate::Bitmask;

/// MaskedArray is implemented by all inner, nullable arrays.
///
/// ### Purpose
/// - Ensures interface consistency across `PrimitiveArray`, `BooleanArray`,
///   `StringArray`, `BinaryArray` and the nested variants.
/// - Null handling is uniform, so it lives on the trait as default
///   implementations; only `len` and mask access differ per type.
pub trait MaskedArray {
    /// Returns the number of elements in the array.
    fn len(&self) -> usize;

    /// Returns true if the array is empty.
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the validity mask, if any. `None` means all elements valid.
    fn null_mask(&self) -> Option<&Bitmask>;

    /// Number of null elements.
    #[inline]
    fn null_count(&self) -> usize {
        match self.null_mask() {
            Some(mask) => self.len() - mask.count_ones(),
            None => 0,
        }
    }

    /// Whether element `idx` is valid (non-null). Out-of-mask indices are
    /// valid by convention.
    #[inline]
    fn is_valid(&self, idx: usize) -> bool {
        match self.null_mask() {
            Some(mask) => mask.get(idx),
            None => true,
        }
    }

    /// Returns true when the array carries a validity mask at all.
    #[inline]
    fn is_nullable(&self) -> bool {
        self.null_mask().is_some()
    }
}
