//! # **StructArray Module** - *Equal-length Child Columns*
//!
//! Arrow `Struct`: `k` child arrays all of length `n`, plus optional
//! struct-level validity. Element *i* is the tuple of `children[j][i]`.

use std::fmt::{Display, Formatter};

use crate::enums::error::Result;
use crate::traits::masked_array::MaskedArray;
use crate::utils::validate_null_mask_len;
use crate::{Array, Bitmask};

/// # StructArray
///
/// Child arrays with enforced equal lengths. Field names live on the
/// enclosing `Field`'s `Struct` type, not here.
#[repr(C, align(64))]
#[derive(PartialEq, Clone, Debug)]
pub struct StructArray {
    pub children: Vec<Array>,
    pub len: usize,
    pub null_mask: Option<Bitmask>,
}

impl StructArray {
    /// Constructs from children of equal length.
    pub fn new(children: Vec<Array>, null_mask: Option<Bitmask>) -> Self {
        let len = children.first().map(|c| c.len()).unwrap_or(0);
        for (i, c) in children.iter().enumerate() {
            assert_eq!(c.len(), len, "struct child {i} length mismatch");
        }
        validate_null_mask_len(len, &null_mask);
        Self {
            children,
            len,
            null_mask,
        }
    }

    /// Child count.
    #[inline]
    pub fn n_children(&self) -> usize {
        self.children.len()
    }

    #[inline]
    pub fn child(&self, idx: usize) -> &Array {
        &self.children[idx]
    }

    /// Returns an owned copy of `[offset, offset + len)`.
    pub fn slice_clone(&self, offset: usize, len: usize) -> Self {
        assert!(
            offset + len <= self.len,
            "StructArray::slice_clone out of bounds"
        );
        Self {
            children: self
                .children
                .iter()
                .map(|c| c.slice_clone(offset, len))
                .collect(),
            len,
            null_mask: self.null_mask.as_ref().map(|m| m.slice_clone(offset, len)),
        }
    }

    /// Concatenates arrays end to end; children are concatenated pairwise.
    pub fn concat(items: &[&Self]) -> Result<Self> {
        let k = items.first().map(|a| a.n_children()).unwrap_or(0);
        let n: usize = items.iter().map(|a| a.len).sum();
        let mut children = Vec::with_capacity(k);
        for j in 0..k {
            let parts: Vec<&Array> = items.iter().map(|a| &a.children[j]).collect();
            children.push(Array::concat(&parts)?);
        }
        let any_mask = items.iter().any(|a| a.null_mask.is_some());
        let mut mask = any_mask.then(|| Bitmask::new_set_all(n, true));
        if let Some(mask) = &mut mask {
            let mut row = 0usize;
            for item in items {
                for i in 0..item.len {
                    if !item.is_valid(i) {
                        mask.set(row, false);
                    }
                    row += 1;
                }
            }
        }
        Ok(Self {
            children,
            len: n,
            null_mask: mask,
        })
    }
}

impl MaskedArray for StructArray {
    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn null_mask(&self) -> Option<&Bitmask> {
        self.null_mask.as_ref()
    }
}

impl Display for StructArray {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "StructArray [{} values, {} children]",
            self.len,
            self.n_children()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PrimitiveArray, StringArray};

    #[test]
    fn test_equal_lengths_enforced() {
        let a = Array::from_int64(PrimitiveArray::from_slice(&[1, 2]));
        let b = Array::from_string32(StringArray::from_slice(&["x", "y"]));
        let s = StructArray::new(vec![a, b], None);
        assert_eq!(s.len(), 2);
        assert_eq!(s.n_children(), 2);
    }

    #[test]
    #[should_panic]
    fn test_length_mismatch_panics() {
        let a = Array::from_int64(PrimitiveArray::from_slice(&[1, 2]));
        let b = Array::from_int64(PrimitiveArray::from_slice(&[1]));
        let _ = StructArray::new(vec![a, b], None);
    }

    #[test]
    fn test_concat_and_slice() {
        let a = StructArray::new(
            vec![Array::from_int64(PrimitiveArray::from_slice(&[1, 2]))],
            None,
        );
        let b = StructArray::new(
            vec![Array::from_int64(PrimitiveArray::from_slice(&[3]))],
            Some(Bitmask::from_bools(&[false])),
        );
        let c = StructArray::concat(&[&a, &b]).unwrap();
        assert_eq!(c.len(), 3);
        assert_eq!(c.null_count(), 1);
        let s = c.slice_clone(2, 1);
        assert!(!s.is_valid(0));
    }
}
