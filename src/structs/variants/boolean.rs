//! # **BooleanArray Module** - *Bit-packed Boolean Array*
//!
//! Arrow-compatible boolean array: a bit-packed data mask plus an optional
//! validity mask, both LSB-first.

use std::fmt::{Display, Formatter};

use crate::traits::masked_array::MaskedArray;
use crate::traits::print::MAX_PREVIEW;
use crate::{Bitmask, Length};

/// # BooleanArray
///
/// Bit-packed boolean values with optional validity.
///
/// The `len` field is authoritative; both masks carry at least `len` logical
/// bits.
#[repr(C, align(64))]
#[derive(PartialEq, Clone, Debug, Default)]
pub struct BooleanArray {
    pub data: Bitmask,
    pub null_mask: Option<Bitmask>,
    pub len: Length,
}

impl BooleanArray {
    /// Constructs from a data mask and optional validity.
    #[inline]
    pub fn new(data: Bitmask, null_mask: Option<Bitmask>) -> Self {
        let len = data.len();
        if let Some(mask) = &null_mask {
            assert_eq!(mask.len(), len, "BooleanArray mask length mismatch");
        }
        Self {
            data,
            null_mask,
            len,
        }
    }

    /// Constructs a dense array from a bool slice (no nulls).
    pub fn from_slice(slice: &[bool]) -> Self {
        Self {
            data: Bitmask::from_bools(slice),
            null_mask: None,
            len: slice.len(),
        }
    }

    /// Constructs from optional values, building a validity mask.
    pub fn from_opt_slice(slice: &[Option<bool>]) -> Self {
        let mut data = Bitmask::new_set_all(slice.len(), false);
        let mut mask = Bitmask::new_set_all(slice.len(), false);
        for (i, v) in slice.iter().enumerate() {
            if let Some(v) = v {
                data.set(i, *v);
                mask.set(i, true);
            }
        }
        Self {
            data,
            null_mask: Some(mask),
            len: slice.len(),
        }
    }

    /// Appends a valid value.
    pub fn push(&mut self, value: bool) {
        self.data.set(self.len, value);
        if let Some(mask) = &mut self.null_mask {
            mask.set(self.len, true);
        }
        self.len += 1;
    }

    /// Appends a null slot, materialising the mask if absent.
    pub fn push_null(&mut self) {
        self.data.set(self.len, false);
        let len = self.len;
        let mask = self
            .null_mask
            .get_or_insert_with(|| Bitmask::new_set_all(len, true));
        mask.set(len, false);
        self.len += 1;
    }

    /// Value at `idx`, or `None` when null. Panics out of bounds.
    #[inline]
    pub fn get(&self, idx: usize) -> Option<bool> {
        assert!(idx < self.len, "BooleanArray::get out of bounds");
        if self.is_valid(idx) {
            Some(self.data.get(idx))
        } else {
            None
        }
    }

    /// Returns an owned copy of `[offset, offset + len)`.
    pub fn slice_clone(&self, offset: usize, len: usize) -> Self {
        assert!(
            offset + len <= self.len,
            "BooleanArray::slice_clone out of bounds"
        );
        Self {
            data: self.data.slice_clone(offset, len),
            null_mask: self.null_mask.as_ref().map(|m| m.slice_clone(offset, len)),
            len,
        }
    }

    /// Concatenates arrays end to end.
    pub fn concat(items: &[&Self]) -> Self {
        let mut out = BooleanArray::default();
        for item in items {
            for i in 0..item.len {
                match item.get(i) {
                    Some(v) => out.push(v),
                    None => out.push_null(),
                }
            }
        }
        out
    }
}

impl MaskedArray for BooleanArray {
    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn null_mask(&self) -> Option<&Bitmask> {
        self.null_mask.as_ref()
    }
}

impl Display for BooleanArray {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "BooleanArray [{} values] [", self.len)?;
        for i in 0..self.len.min(MAX_PREVIEW) {
            if i > 0 {
                write!(f, ", ")?;
            }
            match self.get(i) {
                Some(v) => write!(f, "{v}")?,
                None => write!(f, "null")?,
            }
        }
        if self.len > MAX_PREVIEW {
            write!(f, ", … ({} total)", self.len)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_values() {
        let arr = BooleanArray::from_slice(&[true, false, true]);
        assert_eq!(arr.len(), 3);
        assert_eq!(arr.get(0), Some(true));
        assert_eq!(arr.get(1), Some(false));
    }

    #[test]
    fn test_nulls() {
        let arr = BooleanArray::from_opt_slice(&[Some(true), None, Some(false)]);
        assert_eq!(arr.null_count(), 1);
        assert_eq!(arr.get(1), None);
    }

    #[test]
    fn test_push_and_concat() {
        let mut a = BooleanArray::from_slice(&[true]);
        a.push_null();
        let b = BooleanArray::from_slice(&[false]);
        let c = BooleanArray::concat(&[&a, &b]);
        assert_eq!(c.len(), 3);
        assert_eq!(c.get(0), Some(true));
        assert_eq!(c.get(1), None);
        assert_eq!(c.get(2), Some(false));
    }

    #[test]
    fn test_slice_clone() {
        let arr = BooleanArray::from_opt_slice(&[Some(true), None, Some(false), Some(true)]);
        let s = arr.slice_clone(1, 3);
        assert_eq!(s.get(0), None);
        assert_eq!(s.get(2), Some(true));
    }
}
