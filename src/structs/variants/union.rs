//! # **UnionArray Module** - *Dense and Sparse Unions*
//!
//! Arrow unions: a `type_ids` buffer (one `i8` code per element) selecting a
//! child, plus (for the dense layout) an `i32` offsets buffer locating the
//! element inside the selected child. Sparse unions keep every child at full
//! length and index children by the element position itself.
//!
//! Unions carry no top-level validity; nulls are expressed inside children.

use std::fmt::{Display, Formatter};

use crate::enums::arrow_type::UnionMode;
use crate::enums::error::{Result, malformed};
use crate::{Array, Buffer, Value, Vec64};

/// # UnionArray
///
/// One struct covers both layouts; `offsets` is `Some` iff the mode is
/// dense.
#[repr(C, align(64))]
#[derive(PartialEq, Clone, Debug)]
pub struct UnionArray {
    pub mode: UnionMode,

    /// One type code per element.
    pub type_ids: Buffer<i8>,

    /// Dense layout only: per-element index into the selected child.
    pub offsets: Option<Buffer<i32>>,

    /// One child per variant, parallel to `type_codes`.
    pub children: Vec<Array>,

    /// The code child *j* answers to.
    pub type_codes: Vec<i8>,
}

impl UnionArray {
    /// Constructs a dense union.
    pub fn new_dense(
        type_ids: impl Into<Buffer<i8>>,
        offsets: impl Into<Buffer<i32>>,
        children: Vec<Array>,
        type_codes: Vec<i8>,
    ) -> Self {
        let type_ids: Buffer<i8> = type_ids.into();
        let offsets: Buffer<i32> = offsets.into();
        assert_eq!(type_ids.len(), offsets.len(), "union buffer length mismatch");
        assert_eq!(children.len(), type_codes.len(), "one code per child");
        Self {
            mode: UnionMode::Dense,
            type_ids,
            offsets: Some(offsets),
            children,
            type_codes,
        }
    }

    /// Constructs a sparse union; children must all have the element count
    /// of `type_ids`.
    pub fn new_sparse(
        type_ids: impl Into<Buffer<i8>>,
        children: Vec<Array>,
        type_codes: Vec<i8>,
    ) -> Self {
        let type_ids: Buffer<i8> = type_ids.into();
        for (j, c) in children.iter().enumerate() {
            assert_eq!(
                c.len(),
                type_ids.len(),
                "sparse union child {j} length mismatch"
            );
        }
        assert_eq!(children.len(), type_codes.len(), "one code per child");
        Self {
            mode: UnionMode::Sparse,
            type_ids,
            offsets: None,
            children,
            type_codes,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.type_ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.type_ids.is_empty()
    }

    /// Index of the child registered for `code`.
    #[inline]
    pub fn child_index(&self, code: i8) -> Option<usize> {
        self.type_codes.iter().position(|c| *c == code)
    }

    /// The element at `idx` routed through the selected child. Panics out of
    /// bounds; unregistered codes surface as an error from `validate`, not
    /// here.
    pub fn value(&self, idx: usize) -> Value<'_> {
        assert!(idx < self.len(), "UnionArray::value out of bounds");
        let code = self.type_ids[idx];
        let j = self
            .child_index(code)
            .expect("type id not registered; run validate() on untrusted input");
        match self.mode {
            UnionMode::Dense => {
                let o = self.offsets.as_ref().unwrap()[idx] as usize;
                self.children[j].value(o)
            }
            UnionMode::Sparse => self.children[j].value(idx),
        }
    }

    /// Checks every type id maps to a registered child and dense offsets
    /// land inside their targeted child.
    pub fn validate(&self) -> Result<()> {
        for (i, code) in self.type_ids.as_slice().iter().enumerate() {
            let Some(j) = self.child_index(*code) else {
                return Err(malformed(format!(
                    "union type id {code} at element {i} has no registered child"
                )));
            };
            if self.mode == UnionMode::Dense {
                let o = self.offsets.as_ref().unwrap()[i];
                if o < 0 || o as usize >= self.children[j].len() {
                    return Err(malformed(format!(
                        "dense union offset {o} at element {i} outside child {j}"
                    )));
                }
            }
        }
        if self.mode == UnionMode::Sparse {
            for (j, c) in self.children.iter().enumerate() {
                if c.len() != self.len() {
                    return Err(malformed(format!(
                        "sparse union child {j} length {} != {}",
                        c.len(),
                        self.len()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Converts a sparse union into the dense layout, gathering each child
    /// down to its selected elements. Dense input is returned unchanged.
    pub fn to_dense(&self) -> Result<UnionArray> {
        if self.mode == UnionMode::Dense {
            return Ok(self.clone());
        }
        let mut offsets = Vec64::with_capacity(self.len());
        let mut selected: Vec<Vec<usize>> = vec![Vec::new(); self.children.len()];
        for i in 0..self.len() {
            let code = self.type_ids[i];
            let j = self
                .child_index(code)
                .ok_or_else(|| malformed(format!("union type id {code} has no child")))?;
            offsets.push(selected[j].len() as i32);
            selected[j].push(i);
        }
        let mut children = Vec::with_capacity(self.children.len());
        for (j, idx) in selected.iter().enumerate() {
            children.push(self.children[j].take(idx)?);
        }
        Ok(UnionArray::new_dense(
            self.type_ids.clone(),
            offsets,
            children,
            self.type_codes.clone(),
        ))
    }

    /// Returns an owned copy of `[offset, offset + len)`. Children are kept
    /// whole for the dense layout (offsets keep indexing them) and sliced
    /// for the sparse layout.
    pub fn slice_clone(&self, offset: usize, len: usize) -> Self {
        assert!(
            offset + len <= self.len(),
            "UnionArray::slice_clone out of bounds"
        );
        match self.mode {
            UnionMode::Dense => Self {
                mode: self.mode,
                type_ids: Buffer::from_slice(&self.type_ids[offset..offset + len]),
                offsets: self
                    .offsets
                    .as_ref()
                    .map(|o| Buffer::from_slice(&o[offset..offset + len])),
                children: self.children.clone(),
                type_codes: self.type_codes.clone(),
            },
            UnionMode::Sparse => Self {
                mode: self.mode,
                type_ids: Buffer::from_slice(&self.type_ids[offset..offset + len]),
                offsets: None,
                children: self
                    .children
                    .iter()
                    .map(|c| c.slice_clone(offset, len))
                    .collect(),
                type_codes: self.type_codes.clone(),
            },
        }
    }

    /// Concatenates arrays end to end; dense offsets are rebased by the
    /// accumulated child lengths.
    pub fn concat(items: &[&Self]) -> Result<Self> {
        let first = items.first().expect("concat of zero unions");
        let mode = first.mode;
        let type_codes = first.type_codes.clone();
        let k = first.children.len();
        let mut type_ids = Vec64::new();
        let mut offsets = Vec64::new();
        let mut bases = vec![0usize; k];
        for item in items {
            if item.mode != mode || item.type_codes != type_codes {
                return Err(malformed("union layout mismatch in concat"));
            }
            type_ids.extend_from_slice(&item.type_ids);
            if mode == UnionMode::Dense {
                let item_offsets = item.offsets.as_ref().unwrap();
                for i in 0..item.len() {
                    let j = item.child_index(item.type_ids[i]).unwrap();
                    offsets.push(item_offsets[i] + bases[j] as i32);
                }
                for j in 0..k {
                    bases[j] += item.children[j].len();
                }
            }
        }
        let mut children = Vec::with_capacity(k);
        for j in 0..k {
            let parts: Vec<&Array> = items.iter().map(|a| &a.children[j]).collect();
            children.push(Array::concat(&parts)?);
        }
        Ok(match mode {
            UnionMode::Dense => UnionArray::new_dense(type_ids, offsets, children, type_codes),
            UnionMode::Sparse => UnionArray::new_sparse(type_ids, children, type_codes),
        })
    }
}

impl Display for UnionArray {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}UnionArray [{} values, {} children]",
            if self.mode == UnionMode::Dense {
                "Dense"
            } else {
                "Sparse"
            },
            self.len(),
            self.children.len()
        )
    }
}
