//! # **StringArray Module** - *Variable-length UTF-8 Array*
//!
//! Arrow-compatible UTF-8 string array backed by a compact
//! `offsets + data (+ optional null_mask)` layout.
//!
//! ## Overview
//! - Supports Arrow's `String` (`u32` offsets) and `LargeString`
//!   (`u64` offsets).
//! - Storage:
//!   - **offsets**: length = `len + 1`; i-th string =
//!     `data[offsets[i]..offsets[i+1]]`
//!   - **data**: concatenated UTF-8 bytes
//!   - **null_mask** *(optional)*: `Bitmask` where `1 = valid`, `0 = null`
//! - Offsets are stored unsigned in memory and serialized as Arrow's
//!   signed `i32`/`i64` wire values.

use std::fmt::{Display, Formatter};

use num_traits::NumCast;

use crate::enums::error::{MinstreamError, Result, malformed};
use crate::traits::masked_array::MaskedArray;
use crate::traits::print::MAX_PREVIEW;
use crate::traits::type_unions::Integer;
use crate::utils::validate_null_mask_len;
use crate::{Bitmask, Buffer, Vec64};

/// # StringArray
///
/// UTF-8 encoded, variable-length string array.
///
/// Specify `u32` or `u64` as the offset parameter depending on the target
/// Arrow type (`String` vs `LargeString`); the memory layout then matches
/// the corresponding wire layout directly.
#[repr(C, align(64))]
#[derive(PartialEq, Clone, Debug)]
pub struct StringArray<T> {
    /// Offsets into the data buffer. The i-th string is at
    /// `data[offsets[i]..offsets[i+1]]`.
    pub offsets: Buffer<T>,

    /// Concatenated UTF-8 byte values for all strings.
    pub data: Buffer<u8>,

    /// Optional null mask (bit-packed; 1=valid, 0=null).
    pub null_mask: Option<Bitmask>,
}

impl<T: Integer> Default for StringArray<T> {
    fn default() -> Self {
        let mut offsets = Vec64::with_capacity(1);
        offsets.push(T::zero());
        Self {
            offsets: offsets.into(),
            data: Buffer::default(),
            null_mask: None,
        }
    }
}

impl<T: Integer> StringArray<T> {
    /// Take ownership of offsets, data and an optional null mask. The usual
    /// Arrow invariants must hold (`offsets[0] == 0`, last offset ==
    /// `data.len()`, monotonically non-decreasing).
    #[inline]
    pub fn from_parts(
        offsets: impl Into<Buffer<T>>,
        data: impl Into<Buffer<u8>>,
        null_mask: Option<Bitmask>,
    ) -> Self {
        let offsets: Buffer<T> = offsets.into();
        let data: Buffer<u8> = data.into();
        debug_assert!(!offsets.is_empty() && offsets[0].to_usize() == 0);
        validate_null_mask_len(offsets.len().saturating_sub(1), &null_mask);
        Self {
            offsets,
            data,
            null_mask,
        }
    }

    /// Constructs a dense StringArray from string slices (no nulls).
    pub fn from_slice(slice: &[&str]) -> Self {
        let mut offsets = Vec64::with_capacity(slice.len() + 1);
        let mut data = Vec64::new();
        offsets.push(T::zero());
        for s in slice {
            data.extend_from_slice(s.as_bytes());
            offsets.push(NumCast::from(data.len()).expect("offset conversion failed"));
        }
        Self {
            offsets: offsets.into(),
            data: data.into(),
            null_mask: None,
        }
    }

    /// Constructs from optional strings, building a validity mask.
    pub fn from_opt_slice(slice: &[Option<&str>]) -> Self {
        let mut arr = Self::with_capacity(slice.len(), 0, true);
        for v in slice {
            match v {
                Some(s) => arr.push_str(s),
                None => arr.push_null(),
            }
        }
        arr
    }

    /// Constructs a StringArray with reserved capacity.
    pub fn with_capacity(n_strings: usize, values_cap: usize, null_mask: bool) -> Self {
        let mut offsets = Vec64::with_capacity(n_strings + 1);
        offsets.push(T::zero());
        Self {
            offsets: offsets.into(),
            data: Buffer::from_vec64(Vec64::with_capacity(values_cap)),
            null_mask: null_mask.then(|| Bitmask::with_capacity(n_strings)),
        }
    }

    /// Appends a valid string.
    pub fn push_str(&mut self, s: &str) {
        let idx = self.len();
        self.data.extend_from_slice(s.as_bytes());
        self.offsets
            .push(NumCast::from(self.data.len()).expect("offset conversion failed"));
        if let Some(mask) = &mut self.null_mask {
            mask.set(idx, true);
        }
    }

    /// Appends a null slot, materialising the mask if absent.
    pub fn push_null(&mut self) {
        let idx = self.len();
        let end = *self.offsets.as_slice().last().unwrap();
        self.offsets.push(end);
        let mask = self
            .null_mask
            .get_or_insert_with(|| Bitmask::new_set_all(idx, true));
        mask.set(idx, false);
    }

    /// The string at `idx`, or `None` when null. Panics out of bounds.
    #[inline]
    pub fn get_str(&self, idx: usize) -> Option<&str> {
        assert!(idx < self.len(), "StringArray::get_str out of bounds");
        if !self.is_valid(idx) {
            return None;
        }
        let lo = self.offsets[idx].to_usize();
        let hi = self.offsets[idx + 1].to_usize();
        // constructed from valid UTF-8
        Some(unsafe { std::str::from_utf8_unchecked(&self.data[lo..hi]) })
    }

    /// Validates the offsets invariants against the data buffer.
    pub fn validate_offsets(&self) -> Result<()> {
        let offsets = self.offsets.as_slice();
        if offsets.is_empty() || offsets[0] != T::zero() {
            return Err(malformed("offsets must start at 0"));
        }
        for w in offsets.windows(2) {
            if w[1] < w[0] {
                return Err(malformed("offsets must be monotonically non-decreasing"));
            }
        }
        let last = offsets[offsets.len() - 1].to_usize();
        if last > self.data.len() {
            return Err(MinstreamError::OutOfBounds {
                index: last,
                len: self.data.len(),
            });
        }
        Ok(())
    }

    /// Returns an owned copy of `[offset, offset + len)` with rebased
    /// offsets.
    pub fn slice_clone(&self, offset: usize, len: usize) -> Self {
        assert!(
            offset + len <= self.len(),
            "StringArray::slice_clone out of bounds"
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
            data: Buffer::from_slice(&self.data[lo..hi]),
            null_mask: self.null_mask.as_ref().map(|m| m.slice_clone(offset, len)),
        }
    }

    /// Concatenates arrays end to end.
    pub fn concat(items: &[&Self]) -> Self {
        let n: usize = items.iter().map(|a| a.len()).sum();
        let bytes: usize = items.iter().map(|a| a.data.len()).sum();
        let mut out = Self::with_capacity(n, bytes, items.iter().any(|a| a.null_mask.is_some()));
        for item in items {
            for i in 0..item.len() {
                match item.get_str(i) {
                    Some(s) => out.push_str(s),
                    None => out.push_null(),
                }
            }
        }
        out
    }

    /// Iterates elements as `Option<&str>`.
    pub fn iter_opt(&self) -> impl Iterator<Item = Option<&str>> + '_ {
        (0..self.len()).map(|i| self.get_str(i))
    }
}

impl<T: Integer> MaskedArray for StringArray<T> {
    #[inline]
    fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    #[inline]
    fn null_mask(&self) -> Option<&Bitmask> {
        self.null_mask.as_ref()
    }
}

impl<T: Integer> Display for StringArray<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "StringArray [{} values] [", self.len())?;
        for i in 0..self.len().min(MAX_PREVIEW) {
            if i > 0 {
                write!(f, ", ")?;
            }
            match self.get_str(i) {
                Some(s) => write!(f, "\"{s}\"")?,
                None => write!(f, "null")?,
            }
        }
        if self.len() > MAX_PREVIEW {
            write!(f, ", … ({} total)", self.len())?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice() {
        let arr = StringArray::<u32>::from_slice(&["alpha", "beta", "gamma"]);
        assert_eq!(arr.len(), 3);
        assert_eq!(arr.get_str(0), Some("alpha"));
        assert_eq!(arr.get_str(2), Some("gamma"));
        assert!(arr.validate_offsets().is_ok());
    }

    #[test]
    fn test_nulls_and_push() {
        let mut arr = StringArray::<u32>::default();
        arr.push_str("x");
        arr.push_null();
        arr.push_str("z");
        assert_eq!(arr.len(), 3);
        assert_eq!(arr.get_str(1), None);
        assert_eq!(arr.null_count(), 1);
    }

    #[test]
    fn test_slice_clone_rebases() {
        let arr = StringArray::<u32>::from_slice(&["aa", "bb", "cc", "dd"]);
        let s = arr.slice_clone(1, 2);
        assert_eq!(s.get_str(0), Some("bb"));
        assert_eq!(s.get_str(1), Some("cc"));
        assert_eq!(s.offsets[0], 0);
    }

    #[test]
    fn test_concat() {
        let a = StringArray::<u32>::from_opt_slice(&[Some("a"), None]);
        let b = StringArray::<u32>::from_slice(&["b"]);
        let c = StringArray::concat(&[&a, &b]);
        assert_eq!(c.len(), 3);
        assert_eq!(c.get_str(1), None);
        assert_eq!(c.get_str(2), Some("b"));
    }

    #[test]
    fn test_large_offsets() {
        let arr = StringArray::<u64>::from_slice(&["one", "two"]);
        assert_eq!(arr.get_str(1), Some("two"));
    }
}
