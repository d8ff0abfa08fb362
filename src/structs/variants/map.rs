//! # **MapArray Module** - *Key/Value Pair List Array*
//!
//! Arrow `Map`: physically a `List(Struct{key, value})`. Element *i* is the
//! entries window `[offsets[i], offsets[i+1])`; the entries struct's
//! validity is conceptually all-true.

use std::fmt::{Display, Formatter};

use num_traits::NumCast;

use crate::enums::error::{Result, malformed};
use crate::traits::masked_array::MaskedArray;
use crate::utils::validate_null_mask_len;
use crate::{Array, ArrayV, Bitmask, Buffer, Vec64};

/// # MapArray
///
/// Offsets over a struct-of-entries child. Keys must be non-null; the
/// entries struct itself carries no validity.
#[repr(C, align(64))]
#[derive(PartialEq, Clone, Debug)]
pub struct MapArray {
    /// Entry windows into `entries`. Length = `len + 1`.
    pub offsets: Buffer<u32>,

    /// Struct array of `key`, `value` children, all entries valid.
    pub entries: Array,

    /// Optional null mask for the map elements themselves.
    pub null_mask: Option<Bitmask>,
}

impl MapArray {
    /// Take ownership of offsets, the entries struct and an optional mask.
    pub fn from_parts(
        offsets: impl Into<Buffer<u32>>,
        entries: Array,
        null_mask: Option<Bitmask>,
    ) -> Self {
        let offsets: Buffer<u32> = offsets.into();
        debug_assert!(!offsets.is_empty() && offsets[0] == 0);
        validate_null_mask_len(offsets.len().saturating_sub(1), &null_mask);
        Self {
            offsets,
            entries,
            null_mask,
        }
    }

    /// Builds a map array from per-element entry counts.
    pub fn from_lengths(lengths: &[usize], entries: Array, null_mask: Option<Bitmask>) -> Self {
        let mut offsets = Vec64::with_capacity(lengths.len() + 1);
        let mut acc = 0usize;
        offsets.push(0u32);
        for l in lengths {
            acc += l;
            offsets.push(NumCast::from(acc).expect("offset conversion failed"));
        }
        Self::from_parts(offsets, entries, null_mask)
    }

    /// Key child of the entries struct.
    pub fn keys(&self) -> &Array {
        match &self.entries {
            Array::Struct(s) => s.child(0),
            _ => unreachable!("map entries must be a struct"),
        }
    }

    /// Value child of the entries struct.
    pub fn values(&self) -> &Array {
        match &self.entries {
            Array::Struct(s) => s.child(1),
            _ => unreachable!("map entries must be a struct"),
        }
    }

    /// The entries window for element `idx`, or `None` when null. Panics out
    /// of bounds.
    #[inline]
    pub fn value(&self, idx: usize) -> Option<ArrayV> {
        assert!(idx < self.len(), "MapArray::value out of bounds");
        if !self.is_valid(idx) {
            return None;
        }
        let lo = self.offsets[idx] as usize;
        let hi = self.offsets[idx + 1] as usize;
        Some(ArrayV::new(self.entries.clone(), lo, hi - lo))
    }

    /// Validates offsets and the entries-struct shape.
    pub fn validate(&self) -> Result<()> {
        let offsets = self.offsets.as_slice();
        if offsets.is_empty() || offsets[0] != 0 {
            return Err(malformed("map offsets must start at 0"));
        }
        for w in offsets.windows(2) {
            if w[1] < w[0] {
                return Err(malformed("map offsets must be monotonically non-decreasing"));
            }
        }
        match &self.entries {
            Array::Struct(s) if s.n_children() == 2 => Ok(()),
            _ => Err(malformed("map entries must be a two-child struct")),
        }
    }

    /// Returns an owned copy of `[offset, offset + len)`.
    pub fn slice_clone(&self, offset: usize, len: usize) -> Self {
        assert!(
            offset + len <= self.len(),
            "MapArray::slice_clone out of bounds"
        );
        let lo = self.offsets[offset] as usize;
        let hi = self.offsets[offset + len] as usize;
        let mut offsets = Vec64::with_capacity(len + 1);
        for i in 0..=len {
            offsets.push(self.offsets[offset + i] - lo as u32);
        }
        Self {
            offsets: offsets.into(),
            entries: self.entries.slice_clone(lo, hi - lo),
            null_mask: self.null_mask.as_ref().map(|m| m.slice_clone(offset, len)),
        }
    }

    /// Concatenates arrays end to end.
    pub fn concat(items: &[&Self]) -> Result<Self> {
        let n: usize = items.iter().map(|a| a.len()).sum();
        let mut offsets = Vec64::with_capacity(n + 1);
        offsets.push(0u32);
        let mut base = 0usize;
        let any_mask = items.iter().any(|a| a.null_mask.is_some());
        let mut mask = any_mask.then(|| Bitmask::new_set_all(n, true));
        let mut row = 0usize;
        let entries: Vec<&Array> = items.iter().map(|a| &a.entries).collect();
        for item in items {
            for i in 0..item.len() {
                let hi = item.offsets[i + 1] as usize;
                offsets.push(NumCast::from(base + hi).expect("offset conversion failed"));
                if let Some(mask) = &mut mask {
                    if !item.is_valid(i) {
                        mask.set(row, false);
                    }
                }
                row += 1;
            }
            base += item.entries.len();
        }
        Ok(Self {
            offsets: offsets.into(),
            entries: Array::concat(&entries)?,
            null_mask: mask,
        })
    }
}

impl MaskedArray for MapArray {
    #[inline]
    fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    #[inline]
    fn null_mask(&self) -> Option<&Bitmask> {
        self.null_mask.as_ref()
    }
}

impl Display for MapArray {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MapArray [{} values]", self.len())
    }
}
