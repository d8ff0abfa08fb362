//! # **PrimitiveArray Module** - *Fixed-width Typed Array*
//!
//! Arrow-compatible fixed-width array backed by a single `data` buffer and an
//! optional validity bitmask.
//!
//! ## Overview
//! - One generic covers every fixed-width lane: `i8..=i64`, `u8..=u64`,
//!   `f32`/`f64`, raw `u16` half-float bits and `i128` decimal lanes.
//! - Storage:
//!   - **data**: `n · size_of::<T>()` bytes, 64-byte aligned when owned
//!   - **null_mask** *(optional)*: `Bitmask` where `1 = valid`, `0 = null`
//! - Zero-copy friendly: the reader builds these directly over IPC body
//!   windows.

use std::fmt::{Display, Formatter};

use crate::structs::shared_buffer::SharedBuffer;
use crate::traits::masked_array::MaskedArray;
use crate::traits::print::MAX_PREVIEW;
use crate::traits::type_unions::Primitive;
use crate::utils::validate_null_mask_len;
use crate::{Bitmask, Buffer, Vec64};

/// # PrimitiveArray
///
/// Fixed-width scalar array with optional validity.
///
/// ## Fields
/// - **data**: the value lanes.
/// - **null_mask**: optional bit-packed validity (1=valid, 0=null).
#[repr(C, align(64))]
#[derive(PartialEq, Clone, Debug, Default)]
pub struct PrimitiveArray<T> {
    pub data: Buffer<T>,
    pub null_mask: Option<Bitmask>,
}

impl<T: Primitive> PrimitiveArray<T> {
    /// Constructs from a data buffer and optional mask.
    #[inline]
    pub fn new(data: impl Into<Buffer<T>>, null_mask: Option<Bitmask>) -> Self {
        let data: Buffer<T> = data.into();
        validate_null_mask_len(data.len(), &null_mask);
        Self { data, null_mask }
    }

    /// Constructs a dense array from a slice (no nulls).
    #[inline]
    pub fn from_slice(slice: &[T]) -> Self {
        Self {
            data: Buffer::from_slice(slice),
            null_mask: None,
        }
    }

    /// Constructs from optional values, building a validity mask. Null slots
    /// store `T::default()`.
    pub fn from_opt_slice(slice: &[Option<T>]) -> Self {
        let mut data = Vec64::with_capacity(slice.len());
        let mut mask = Bitmask::new_set_all(slice.len(), false);
        for (i, v) in slice.iter().enumerate() {
            match v {
                Some(v) => {
                    data.push(*v);
                    mask.set(i, true);
                }
                None => data.push(T::default()),
            }
        }
        Self {
            data: data.into(),
            null_mask: Some(mask),
        }
    }

    /// Constructs with reserved capacity.
    #[inline]
    pub fn with_capacity(cap: usize, null_mask: bool) -> Self {
        Self {
            data: Buffer::from_vec64(Vec64::with_capacity(cap)),
            null_mask: if null_mask {
                Some(Bitmask::with_capacity(cap))
            } else {
                None
            },
        }
    }

    /// Zero-copy view over a shared values region of `len` elements.
    pub fn from_shared(region: SharedBuffer, len: usize, null_mask: Option<Bitmask>) -> Self {
        let byte_len = len * std::mem::size_of::<T>();
        let data = Buffer::from_shared(region.slice(0..byte_len));
        validate_null_mask_len(len, &null_mask);
        Self { data, null_mask }
    }

    /// Appends a valid value.
    #[inline]
    pub fn push(&mut self, value: T) {
        let idx = self.data.len();
        self.data.push(value);
        if let Some(mask) = &mut self.null_mask {
            mask.set(idx, true);
        }
    }

    /// Appends a null slot, materialising the mask if absent.
    pub fn push_null(&mut self) {
        let idx = self.data.len();
        self.data.push(T::default());
        let mask = self
            .null_mask
            .get_or_insert_with(|| Bitmask::new_set_all(idx, true));
        mask.set(idx, false);
    }

    /// Value at `idx`, or `None` when null. Panics out of bounds.
    #[inline]
    pub fn get(&self, idx: usize) -> Option<T> {
        assert!(idx < self.len(), "PrimitiveArray::get out of bounds");
        if self.is_valid(idx) {
            Some(self.data[idx])
        } else {
            None
        }
    }

    /// Returns an owned copy of `[offset, offset + len)`.
    pub fn slice_clone(&self, offset: usize, len: usize) -> Self {
        assert!(
            offset + len <= self.len(),
            "PrimitiveArray::slice_clone out of bounds"
        );
        Self {
            data: Buffer::from_slice(&self.data[offset..offset + len]),
            null_mask: self.null_mask.as_ref().map(|m| m.slice_clone(offset, len)),
        }
    }

    /// Concatenates arrays end to end.
    pub fn concat(items: &[&Self]) -> Self {
        let total: usize = items.iter().map(|a| a.len()).sum();
        let mut data = Vec64::with_capacity(total);
        let any_mask = items.iter().any(|a| a.null_mask.is_some());
        let mut mask = any_mask.then(|| Bitmask::new_set_all(total, true));
        let mut base = 0;
        for item in items {
            data.extend_from_slice(&item.data);
            if let (Some(out), Some(m)) = (&mut mask, &item.null_mask) {
                for i in 0..m.len() {
                    if !m.get(i) {
                        out.set(base + i, false);
                    }
                }
            }
            base += item.len();
        }
        Self {
            data: data.into(),
            null_mask: mask,
        }
    }

    /// Iterates elements as `Option<T>`.
    pub fn iter_opt(&self) -> impl Iterator<Item = Option<T>> + '_ {
        (0..self.len()).map(|i| self.get(i))
    }
}

impl<T: Primitive> MaskedArray for PrimitiveArray<T> {
    #[inline]
    fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    fn null_mask(&self) -> Option<&Bitmask> {
        self.null_mask.as_ref()
    }
}

impl<T: Primitive + Display> Display for PrimitiveArray<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrimitiveArray [{} values] [", self.len())?;
        for i in 0..self.len().min(MAX_PREVIEW) {
            if i > 0 {
                write!(f, ", ")?;
            }
            match self.get(i) {
                Some(v) => write!(f, "{v}")?,
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
    fn test_from_slice_and_get() {
        let arr = PrimitiveArray::<i64>::from_slice(&[1, 2, 3]);
        assert_eq!(arr.len(), 3);
        assert_eq!(arr.get(1), Some(2));
        assert_eq!(arr.null_count(), 0);
    }

    #[test]
    fn test_nulls() {
        let arr = PrimitiveArray::<i64>::from_opt_slice(&[Some(1), None, Some(3)]);
        assert_eq!(arr.null_count(), 1);
        assert_eq!(arr.get(1), None);
        assert_eq!(arr.get(2), Some(3));
        assert!(!arr.is_valid(1));
    }

    #[test]
    fn test_push_null_materialises_mask() {
        let mut arr = PrimitiveArray::<i32>::from_slice(&[5, 6]);
        assert!(arr.null_mask.is_none());
        arr.push_null();
        assert_eq!(arr.len(), 3);
        assert_eq!(arr.null_count(), 1);
        assert!(arr.is_valid(0) && arr.is_valid(1) && !arr.is_valid(2));
    }

    #[test]
    fn test_slice_clone() {
        let arr = PrimitiveArray::<i64>::from_opt_slice(&[Some(1), None, Some(3), Some(4)]);
        let s = arr.slice_clone(1, 2);
        assert_eq!(s.len(), 2);
        assert_eq!(s.get(0), None);
        assert_eq!(s.get(1), Some(3));
    }

    #[test]
    fn test_concat() {
        let a = PrimitiveArray::<i64>::from_slice(&[1, 2]);
        let b = PrimitiveArray::<i64>::from_opt_slice(&[None, Some(4)]);
        let c = PrimitiveArray::concat(&[&a, &b]);
        assert_eq!(c.len(), 4);
        assert_eq!(c.get(0), Some(1));
        assert_eq!(c.get(2), None);
        assert_eq!(c.get(3), Some(4));
    }
}
