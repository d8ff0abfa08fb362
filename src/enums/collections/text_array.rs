//! # **TextArray Module** - *Unified String/Binary Array Container*
//!
//! Tagged union over the variable-length and fixed-width byte arrays:
//! `String`/`LargeString`, `Binary`/`LargeBinary` and `FixedSizeBinary`.

use std::sync::Arc;

use crate::enums::arrow_type::ArrowType;
use crate::enums::error::Result;
use crate::structs::variants::binary::{BinaryArray, FixedSizeBinaryArray};
use crate::traits::masked_array::MaskedArray;
use crate::{Bitmask, StringArray, Value};

/// # TextArray
///
/// `Arc`-wrapped concrete arrays behind one discriminant.
#[derive(PartialEq, Clone, Debug)]
pub enum TextArray {
    String32(Arc<StringArray<u32>>),
    String64(Arc<StringArray<u64>>),
    Binary32(Arc<BinaryArray<u32>>),
    Binary64(Arc<BinaryArray<u64>>),
    FixedBinary(Arc<FixedSizeBinaryArray>),
}

impl TextArray {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            TextArray::String32(a) => a.len(),
            TextArray::String64(a) => a.len(),
            TextArray::Binary32(a) => a.len(),
            TextArray::Binary64(a) => a.len(),
            TextArray::FixedBinary(a) => a.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn null_mask(&self) -> Option<&Bitmask> {
        match self {
            TextArray::String32(a) => a.null_mask.as_ref(),
            TextArray::String64(a) => a.null_mask.as_ref(),
            TextArray::Binary32(a) => a.null_mask.as_ref(),
            TextArray::Binary64(a) => a.null_mask.as_ref(),
            TextArray::FixedBinary(a) => a.null_mask.as_ref(),
        }
    }

    #[inline]
    pub fn null_count(&self) -> usize {
        match self {
            TextArray::String32(a) => a.null_count(),
            TextArray::String64(a) => a.null_count(),
            TextArray::Binary32(a) => a.null_count(),
            TextArray::Binary64(a) => a.null_count(),
            TextArray::FixedBinary(a) => a.null_count(),
        }
    }

    /// Physical Arrow type of the stored values.
    pub fn arrow_type(&self) -> ArrowType {
        match self {
            TextArray::String32(_) => ArrowType::String,
            TextArray::String64(_) => ArrowType::LargeString,
            TextArray::Binary32(_) => ArrowType::Binary,
            TextArray::Binary64(_) => ArrowType::LargeBinary,
            TextArray::FixedBinary(a) => ArrowType::FixedSizeBinary(a.width),
        }
    }

    /// Unified element access; strings surface as `Value::Str`, binaries as
    /// `Value::Bytes`.
    pub fn value(&self, idx: usize) -> Value<'_> {
        match self {
            TextArray::String32(a) => a.get_str(idx).map(Value::Str),
            TextArray::String64(a) => a.get_str(idx).map(Value::Str),
            TextArray::Binary32(a) => a.get_bytes(idx).map(Value::Bytes),
            TextArray::Binary64(a) => a.get_bytes(idx).map(Value::Bytes),
            TextArray::FixedBinary(a) => a.get_bytes(idx).map(Value::Bytes),
        }
        .unwrap_or(Value::Null)
    }

    /// Returns an owned copy of `[offset, offset + len)`.
    pub fn slice_clone(&self, offset: usize, len: usize) -> Self {
        match self {
            TextArray::String32(a) => TextArray::String32(Arc::new(a.slice_clone(offset, len))),
            TextArray::String64(a) => TextArray::String64(Arc::new(a.slice_clone(offset, len))),
            TextArray::Binary32(a) => TextArray::Binary32(Arc::new(a.slice_clone(offset, len))),
            TextArray::Binary64(a) => TextArray::Binary64(Arc::new(a.slice_clone(offset, len))),
            TextArray::FixedBinary(a) => {
                TextArray::FixedBinary(Arc::new(a.slice_clone(offset, len)))
            }
        }
    }

    /// Concatenates arrays of one variant end to end.
    pub fn concat(items: &[&Self]) -> Result<Self> {
        use crate::enums::error::schema_mismatch;
        macro_rules! concat_variant {
            ($variant:ident, $ty:ty) => {{
                let mut parts: Vec<&$ty> = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        TextArray::$variant(a) => parts.push(a.as_ref()),
                        _ => return Err(schema_mismatch("text variant mismatch in concat")),
                    }
                }
                Ok(TextArray::$variant(Arc::new(<$ty>::concat(&parts))))
            }};
        }
        match items.first().expect("concat of zero text arrays") {
            TextArray::String32(_) => concat_variant!(String32, StringArray<u32>),
            TextArray::String64(_) => concat_variant!(String64, StringArray<u64>),
            TextArray::Binary32(_) => concat_variant!(Binary32, BinaryArray<u32>),
            TextArray::Binary64(_) => concat_variant!(Binary64, BinaryArray<u64>),
            TextArray::FixedBinary(_) => concat_variant!(FixedBinary, FixedSizeBinaryArray),
        }
    }

    /// Direct access to the `String32` variant; panics otherwise.
    pub fn str32(&self) -> &StringArray<u32> {
        match self {
            TextArray::String32(a) => a,
            _ => panic!("TextArray is not String32"),
        }
    }
}
