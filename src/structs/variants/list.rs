//! # **ListArray Module** - *Variable-size List Array*
//!
//! Arrow `List` (`u32` offsets) and `LargeList` (`u64` offsets): an offsets
//! buffer delimiting windows into a single child array.
//!
//! Element *i* is the child range `[offsets[i], offsets[i+1])`, surfaced as
//! a zero-copy [`ArrayV`] window.

use std::fmt::{Display, Formatter};

use num_traits::NumCast;

use crate::enums::error::{MinstreamError, Result, malformed};
use crate::traits::masked_array::MaskedArray;
use crate::traits::type_unions::Integer;
use crate::utils::validate_null_mask_len;
use crate::{Array, ArrayV, Bitmask, Buffer, Vec64};

/// # ListArray
///
/// Offsets + child array + optional validity.
#[repr(C, align(64))]
#[derive(PartialEq, Clone, Debug)]
pub struct ListArray<T> {
    /// Element windows into `values`. Length = `len + 1`.
    pub offsets: Buffer<T>,

    /// The single child array all elements slice into.
    pub values: Array,

    /// Optional null mask (bit-packed; 1=valid, 0=null).
    pub null_mask: Option<Bitmask>,
}

impl<T: Integer> ListArray<T> {
    /// Take ownership of offsets, child and optional mask. Arrow invariants
    /// must hold (`offsets[0] == 0`, monotone, last offset == child length).
    #[inline]
    pub fn from_parts(
        offsets: impl Into<Buffer<T>>,
        values: Array,
        null_mask: Option<Bitmask>,
    ) -> Self {
        let offsets: Buffer<T> = offsets.into();
        debug_assert!(!offsets.is_empty() && offsets[0].to_usize() == 0);
        validate_null_mask_len(offsets.len().saturating_sub(1), &null_mask);
        Self {
            offsets,
            values,
            null_mask,
        }
    }

    /// Builds a list array from per-element child lengths.
    pub fn from_lengths(lengths: &[usize], values: Array, null_mask: Option<Bitmask>) -> Self {
        let mut offsets = Vec64::with_capacity(lengths.len() + 1);
        let mut acc = 0usize;
        offsets.push(T::zero());
        for l in lengths {
            acc += l;
            offsets.push(NumCast::from(acc).expect("offset conversion failed"));
        }
        Self::from_parts(offsets, values, null_mask)
    }

    /// The element at `idx` as a zero-copy child window, or `None` when
    /// null. Panics out of bounds.
    #[inline]
    pub fn value(&self, idx: usize) -> Option<ArrayV> {
        assert!(idx < self.len(), "ListArray::value out of bounds");
        if !self.is_valid(idx) {
            return None;
        }
        let lo = self.offsets[idx].to_usize();
        let hi = self.offsets[idx + 1].to_usize();
        Some(ArrayV::new(self.values.clone(), lo, hi - lo))
    }

    /// Validates offsets against the child length.
    pub fn validate_offsets(&self) -> Result<()> {
        let offsets = self.offsets.as_slice();
        if offsets.is_empty() || offsets[0] != T::zero() {
            return Err(malformed("list offsets must start at 0"));
        }
        for w in offsets.windows(2) {
            if w[1] < w[0] {
                return Err(malformed("list offsets must be monotonically non-decreasing"));
            }
        }
        let last = offsets[offsets.len() - 1].to_usize();
        if last > self.values.len() {
            return Err(MinstreamError::OutOfBounds {
                index: last,
                len: self.values.len(),
            });
        }
        Ok(())
    }

    /// Returns an owned copy of `[offset, offset + len)`: rebased offsets
    /// over the sliced child range.
    pub fn slice_clone(&self, offset: usize, len: usize) -> Self {
        assert!(
            offset + len <= self.len(),
            "ListArray::slice_clone out of bounds"
        );
        let lo = self.offsets[offset].to_usize();
        let hi = self.offsets[offset + len].to_usize();
        let mut offsets = Vec64::with_capacity(len + 1);
        for i in 0..=len {
            offsets.push(
                NumCast::from(self.offsets[offset + i].to_usize() - lo)
                    .expect("offset conversion failed"),
            );
        }
        Self {
            offsets: offsets.into(),
            values: self.values.slice_clone(lo, hi - lo),
            null_mask: self.null_mask.as_ref().map(|m| m.slice_clone(offset, len)),
        }
    }

    /// Concatenates arrays end to end: children concatenated, offsets
    /// rebased.
    pub fn concat(items: &[&Self]) -> Result<Self> {
        let n: usize = items.iter().map(|a| a.len()).sum();
        let mut offsets = Vec64::with_capacity(n + 1);
        offsets.push(T::zero());
        let mut base = 0usize;
        let any_mask = items.iter().any(|a| a.null_mask.is_some());
        let mut mask = any_mask.then(|| Bitmask::new_set_all(n, true));
        let mut row = 0usize;
        let children: Vec<Array> = items.iter().map(|a| a.values.clone()).collect();
        for item in items {
            for i in 0..item.len() {
                let hi = item.offsets[i + 1].to_usize();
                offsets.push(NumCast::from(base + hi).expect("offset conversion failed"));
                if let Some(mask) = &mut mask {
                    if !item.is_valid(i) {
                        mask.set(row, false);
                    }
                }
                row += 1;
            }
            base += item.values.len();
        }
        Ok(Self {
            offsets: offsets.into(),
            values: Array::concat(&children.iter().collect::<Vec<_>>())?,
            null_mask: mask,
        })
    }
}

impl<T: Integer> MaskedArray for ListArray<T> {
    #[inline]
    fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    #[inline]
    fn null_mask(&self) -> Option<&Bitmask> {
        self.null_mask.as_ref()
    }
}

impl<T: Integer> Display for ListArray<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ListArray [{} values]", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PrimitiveArray;

    fn child() -> Array {
        Array::from_int64(PrimitiveArray::from_slice(&[1, 2, 3, 4, 5, 6]))
    }

    #[test]
    fn test_value_windows() {
        let arr = ListArray::<u32>::from_lengths(&[2, 0, 4], child(), None);
        assert_eq!(arr.len(), 3);
        let v0 = arr.value(0).unwrap();
        assert_eq!(v0.len(), 2);
        let v2 = arr.value(2).unwrap();
        assert_eq!(v2.len(), 4);
        assert!(arr.validate_offsets().is_ok());
    }

    #[test]
    fn test_null_element() {
        let mask = Bitmask::from_bools(&[true, false, true]);
        let arr = ListArray::<u32>::from_lengths(&[2, 0, 4], child(), Some(mask));
        assert!(arr.value(1).is_none());
        assert_eq!(arr.null_count(), 1);
    }

    #[test]
    fn test_slice_clone() {
        let arr = ListArray::<u32>::from_lengths(&[2, 1, 3], child(), None);
        let s = arr.slice_clone(1, 2);
        assert_eq!(s.len(), 2);
        assert_eq!(s.offsets.as_slice(), &[0, 1, 4]);
        assert_eq!(s.values.len(), 4);
    }

    #[test]
    fn test_concat() {
        let a = ListArray::<u32>::from_lengths(
            &[1, 2],
            Array::from_int64(PrimitiveArray::from_slice(&[1, 2, 3])),
            None,
        );
        let b = ListArray::<u32>::from_lengths(
            &[3],
            Array::from_int64(PrimitiveArray::from_slice(&[4, 5, 6])),
            None,
        );
        let c = ListArray::concat(&[&a, &b]).unwrap();
        assert_eq!(c.len(), 3);
        assert_eq!(c.offsets.as_slice(), &[0, 1, 3, 6]);
        assert_eq!(c.values.len(), 6);
    }
}
