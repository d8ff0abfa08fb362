//! # **DictionaryArray Module** - *Index + Pool Encoding*
//!
//! Arrow dictionary encoding: a (nullable) integer index array plus a shared
//! pool of values. Element *i* is `pool[indices[i]]` when valid, with
//! 0-based indices bounds-checked against the pool.
//!
//! Pool identity across record batches is managed by the IPC layer
//! (`ipc::dictionary`); this type is the in-memory view.

use std::fmt::{Display, Formatter};

use crate::enums::error::{Result, malformed};
use crate::enums::collections::numeric_array::NumericArray;
use crate::traits::masked_array::MaskedArray;
use crate::{Array, Bitmask, Value};

/// # DictionaryArray
///
/// Validity travels on the index array; the pool is ordinary array data
/// shared (via `Arc` inside `Array`) between batches of one stream.
#[repr(C, align(64))]
#[derive(PartialEq, Clone, Debug)]
pub struct DictionaryArray {
    /// Integer keys into `values`; nulls are null elements.
    pub indices: NumericArray,

    /// The value pool.
    pub values: Array,

    /// Whether pool ordering is semantically meaningful.
    pub ordered: bool,
}

impl DictionaryArray {
    #[inline]
    pub fn from_parts(indices: NumericArray, values: Array, ordered: bool) -> Self {
        Self {
            indices,
            values,
            ordered,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pool cardinality.
    #[inline]
    pub fn pool_len(&self) -> usize {
        self.values.len()
    }

    /// The pool index at `idx`, or `None` when null.
    #[inline]
    pub fn key(&self, idx: usize) -> Option<usize> {
        self.indices.usize_value(idx)
    }

    /// The element at `idx` resolved through the pool.
    pub fn value(&self, idx: usize) -> Value<'_> {
        match self.key(idx) {
            Some(k) => self.values.value(k),
            None => Value::Null,
        }
    }

    /// Checks every valid index satisfies `0 <= idx < pool_len()`.
    pub fn validate(&self) -> Result<()> {
        let pool = self.pool_len();
        for i in 0..self.len() {
            if let Some(k) = self.key(i) {
                if k >= pool {
                    return Err(malformed(format!(
                        "dictionary index {k} at element {i} outside pool of {pool}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Returns an owned copy of `[offset, offset + len)`; the pool is kept
    /// whole.
    pub fn slice_clone(&self, offset: usize, len: usize) -> Self {
        Self {
            indices: self.indices.slice_clone(offset, len),
            values: self.values.clone(),
            ordered: self.ordered,
        }
    }

    /// Concatenates arrays end to end.
    ///
    /// Pools inside one stream are append-only, so the longest pool is a
    /// superset of the others; earlier indices stay valid against it.
    pub fn concat(items: &[&Self]) -> Result<Self> {
        let first = items.first().expect("concat of zero dictionaries");
        let mut pool = &first.values;
        for item in items {
            if item.pool_len() > pool.len() {
                pool = &item.values;
            }
        }
        let indices: Vec<&NumericArray> = items.iter().map(|a| &a.indices).collect();
        Ok(Self {
            indices: NumericArray::concat(&indices)?,
            values: pool.clone(),
            ordered: first.ordered,
        })
    }
}

impl MaskedArray for DictionaryArray {
    #[inline]
    fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    fn null_mask(&self) -> Option<&Bitmask> {
        self.indices.null_mask()
    }
}

impl Display for DictionaryArray {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "DictionaryArray [{} values, pool {}{}]",
            self.len(),
            self.pool_len(),
            if self.ordered { ", ordered" } else { "" }
        )
    }
}
