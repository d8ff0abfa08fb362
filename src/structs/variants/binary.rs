//! # **BinaryArray Module** - *Variable and Fixed-length Byte Arrays*
//!
//! `BinaryArray<O>` mirrors the `StringArray` layout for arbitrary bytes:
//! Arrow's `Binary` (`u32` offsets) and `LargeBinary` (`u64` offsets).
//! `FixedSizeBinaryArray` packs `width` bytes per element with no offsets.

use std::fmt::{Display, Formatter};

use num_traits::NumCast;

use crate::enums::error::{MinstreamError, Result, malformed};
use crate::traits::masked_array::MaskedArray;
use crate::traits::print::MAX_PREVIEW;
use crate::traits::type_unions::Integer;
use crate::utils::validate_null_mask_len;
use crate::{Bitmask, Buffer, Vec64};

/// # BinaryArray
///
/// Variable-length byte array with `offsets + data (+ optional null_mask)`
/// storage.
#[repr(C, align(64))]
#[derive(PartialEq, Clone, Debug)]
pub struct BinaryArray<T> {
    /// Offsets into the data buffer. The i-th element is at
    /// `data[offsets[i]..offsets[i+1]]`.
    pub offsets: Buffer<T>,

    /// Concatenated byte values for all elements.
    pub data: Buffer<u8>,

    /// Optional null mask (bit-packed; 1=valid, 0=null).
    pub null_mask: Option<Bitmask>,
}

impl<T: Integer> Default for BinaryArray<T> {
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

impl<T: Integer> BinaryArray<T> {
    /// Take ownership of offsets, data and an optional null mask.
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

    /// Constructs a dense BinaryArray from byte slices (no nulls).
    pub fn from_slices(slice: &[&[u8]]) -> Self {
        let mut out = Self::default();
        for s in slice {
            out.push_bytes(s);
        }
        out
    }

    /// Constructs from optional byte slices, building a validity mask.
    pub fn from_opt_slices(slice: &[Option<&[u8]>]) -> Self {
        let mut out = Self::default();
        for v in slice {
            match v {
                Some(s) => out.push_bytes(s),
                None => out.push_null(),
            }
        }
        out
    }

    /// Appends a valid element.
    pub fn push_bytes(&mut self, s: &[u8]) {
        let idx = self.len();
        self.data.extend_from_slice(s);
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

    /// The bytes at `idx`, or `None` when null. Panics out of bounds.
    #[inline]
    pub fn get_bytes(&self, idx: usize) -> Option<&[u8]> {
        assert!(idx < self.len(), "BinaryArray::get_bytes out of bounds");
        if !self.is_valid(idx) {
            return None;
        }
        let lo = self.offsets[idx].to_usize();
        let hi = self.offsets[idx + 1].to_usize();
        Some(&self.data[lo..hi])
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
            "BinaryArray::slice_clone out of bounds"
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
        let mut out = Self::default();
        for item in items {
            for i in 0..item.len() {
                match item.get_bytes(i) {
                    Some(s) => out.push_bytes(s),
                    None => out.push_null(),
                }
            }
        }
        out
    }
}

impl<T: Integer> MaskedArray for BinaryArray<T> {
    #[inline]
    fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    #[inline]
    fn null_mask(&self) -> Option<&Bitmask> {
        self.null_mask.as_ref()
    }
}

impl<T: Integer> Display for BinaryArray<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "BinaryArray [{} values]", self.len())
    }
}

/// # FixedSizeBinaryArray
///
/// `width` bytes per element, no offsets buffer. The Arrow
/// `FixedSizeBinary(n)` layout; also the physical carrier for `Decimal256`.
#[repr(C, align(64))]
#[derive(PartialEq, Clone, Debug)]
pub struct FixedSizeBinaryArray {
    pub data: Buffer<u8>,
    pub width: usize,
    pub null_mask: Option<Bitmask>,
}

impl FixedSizeBinaryArray {
    #[inline]
    pub fn new(data: impl Into<Buffer<u8>>, width: usize, null_mask: Option<Bitmask>) -> Self {
        assert!(width > 0, "FixedSizeBinaryArray width must be positive");
        let data: Buffer<u8> = data.into();
        assert_eq!(data.len() % width, 0, "data length not a multiple of width");
        validate_null_mask_len(data.len() / width, &null_mask);
        Self {
            data,
            width,
            null_mask,
        }
    }

    /// Constructs from equally sized byte slices (no nulls).
    pub fn from_slices(width: usize, slices: &[&[u8]]) -> Self {
        let mut data = Vec64::with_capacity(width * slices.len());
        for s in slices {
            assert_eq!(s.len(), width, "element width mismatch");
            data.extend_from_slice(s);
        }
        Self::new(data, width, None)
    }

    /// Appends a valid element of exactly `width` bytes.
    pub fn push_bytes(&mut self, s: &[u8]) {
        assert_eq!(s.len(), self.width, "element width mismatch");
        let idx = self.len();
        self.data.extend_from_slice(s);
        if let Some(mask) = &mut self.null_mask {
            mask.set(idx, true);
        }
    }

    /// Appends a null slot (zero bytes), materialising the mask if absent.
    pub fn push_null(&mut self) {
        let idx = self.len();
        let width = self.width;
        let start = self.data.len();
        self.data.resize(start + width, 0);
        let mask = self
            .null_mask
            .get_or_insert_with(|| Bitmask::new_set_all(idx, true));
        mask.set(idx, false);
    }

    /// The bytes at `idx`, or `None` when null. Panics out of bounds.
    #[inline]
    pub fn get_bytes(&self, idx: usize) -> Option<&[u8]> {
        assert!(idx < self.len(), "FixedSizeBinaryArray::get out of bounds");
        if !self.is_valid(idx) {
            return None;
        }
        let lo = idx * self.width;
        Some(&self.data[lo..lo + self.width])
    }

    /// Returns an owned copy of `[offset, offset + len)`.
    pub fn slice_clone(&self, offset: usize, len: usize) -> Self {
        assert!(
            offset + len <= self.len(),
            "FixedSizeBinaryArray::slice_clone out of bounds"
        );
        Self {
            data: Buffer::from_slice(&self.data[offset * self.width..(offset + len) * self.width]),
            width: self.width,
            null_mask: self.null_mask.as_ref().map(|m| m.slice_clone(offset, len)),
        }
    }

    /// Concatenates arrays end to end. All items must share one width.
    pub fn concat(items: &[&Self]) -> Self {
        let width = items.first().map(|a| a.width).unwrap_or(1);
        let mut out = Self::new(Buffer::default(), width, None);
        for item in items {
            assert_eq!(item.width, width, "FixedSizeBinaryArray width mismatch");
            for i in 0..item.len() {
                match item.get_bytes(i) {
                    Some(s) => out.push_bytes(s),
                    None => out.push_null(),
                }
            }
        }
        out
    }
}

impl MaskedArray for FixedSizeBinaryArray {
    #[inline]
    fn len(&self) -> usize {
        self.data.len() / self.width
    }

    #[inline]
    fn null_mask(&self) -> Option<&Bitmask> {
        self.null_mask.as_ref()
    }
}

impl Display for FixedSizeBinaryArray {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FixedSizeBinaryArray [{} values, width {}]",
            self.len(),
            self.width
        )
    }
}
