//! # **FixedSizeListArray Module** - *Fixed-width List Array*
//!
//! Arrow `FixedSizeList(N)`: every element is a window of exactly `N` child
//! elements, so no offsets buffer is needed. Element *i* is
//! `values[i·N .. (i+1)·N)`.

use std::fmt::{Display, Formatter};

use crate::traits::masked_array::MaskedArray;
use crate::utils::validate_null_mask_len;
use crate::{Array, ArrayV, Bitmask};

/// # FixedSizeListArray
///
/// Child array of length `N · n` plus the element width `N`.
#[repr(C, align(64))]
#[derive(PartialEq, Clone, Debug)]
pub struct FixedSizeListArray {
    /// The single child array; length is always `size * len`.
    pub values: Array,

    /// Child elements per list element.
    pub size: usize,

    /// Optional null mask (bit-packed; 1=valid, 0=null).
    pub null_mask: Option<Bitmask>,
}

impl FixedSizeListArray {
    #[inline]
    pub fn new(values: Array, size: usize, null_mask: Option<Bitmask>) -> Self {
        assert!(size > 0, "FixedSizeListArray size must be positive");
        assert_eq!(
            values.len() % size,
            0,
            "child length not a multiple of list size"
        );
        validate_null_mask_len(values.len() / size, &null_mask);
        Self {
            values,
            size,
            null_mask,
        }
    }

    /// The element at `idx` as a zero-copy child window, or `None` when
    /// null. Panics out of bounds.
    #[inline]
    pub fn value(&self, idx: usize) -> Option<ArrayV> {
        assert!(idx < self.len(), "FixedSizeListArray::value out of bounds");
        if !self.is_valid(idx) {
            return None;
        }
        Some(ArrayV::new(
            self.values.clone(),
            idx * self.size,
            self.size,
        ))
    }

    /// Returns an owned copy of `[offset, offset + len)`.
    pub fn slice_clone(&self, offset: usize, len: usize) -> Self {
        assert!(
            offset + len <= self.len(),
            "FixedSizeListArray::slice_clone out of bounds"
        );
        Self {
            values: self
                .values
                .slice_clone(offset * self.size, len * self.size),
            size: self.size,
            null_mask: self.null_mask.as_ref().map(|m| m.slice_clone(offset, len)),
        }
    }

    /// Concatenates arrays end to end. All items must share one size.
    pub fn concat(items: &[&Self]) -> crate::enums::error::Result<Self> {
        let size = items.first().map(|a| a.size).unwrap_or(1);
        let n: usize = items.iter().map(|a| a.len()).sum();
        let children: Vec<&Array> = items.iter().map(|a| &a.values).collect();
        let any_mask = items.iter().any(|a| a.null_mask.is_some());
        let mut mask = any_mask.then(|| Bitmask::new_set_all(n, true));
        let mut row = 0usize;
        for item in items {
            assert_eq!(item.size, size, "FixedSizeListArray size mismatch");
            for i in 0..item.len() {
                if let Some(mask) = &mut mask {
                    if !item.is_valid(i) {
                        mask.set(row, false);
                    }
                }
                row += 1;
            }
        }
        Ok(Self {
            values: Array::concat(&children)?,
            size,
            null_mask: mask,
        })
    }
}

impl MaskedArray for FixedSizeListArray {
    #[inline]
    fn len(&self) -> usize {
        self.values.len() / self.size
    }

    #[inline]
    fn null_mask(&self) -> Option<&Bitmask> {
        self.null_mask.as_ref()
    }
}

impl Display for FixedSizeListArray {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FixedSizeListArray [{} values, size {}]",
            self.len(),
            self.size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PrimitiveArray;

    #[test]
    fn test_value_windows() {
        let child = Array::from_int32(PrimitiveArray::from_slice(&[1, 2, 3, 4, 5, 6]));
        let arr = FixedSizeListArray::new(child, 3, None);
        assert_eq!(arr.len(), 2);
        let v = arr.value(1).unwrap();
        assert_eq!(v.len(), 3);
    }

    #[test]
    fn test_slice_and_concat() {
        let child = Array::from_int32(PrimitiveArray::from_slice(&[1, 2, 3, 4]));
        let arr = FixedSizeListArray::new(child, 2, None);
        let s = arr.slice_clone(1, 1);
        assert_eq!(s.len(), 1);
        assert_eq!(s.values.len(), 2);
        let c = FixedSizeListArray::concat(&[&arr, &s]).unwrap();
        assert_eq!(c.len(), 3);
    }
}
