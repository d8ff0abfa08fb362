//! # **NumericArray Module** - *Unified Fixed-width Array Container*
//!
//! Tagged union over every fixed-width `PrimitiveArray<T>` the crate
//! supports, so tables, readers and writers can hold and dispatch on one
//! type.
//!
//! `Float16` lanes are raw `u16` bit patterns and `Int128` lanes back
//! `Decimal128`; both are distinct variants so the tag round-trips.

use std::sync::Arc;

use crate::enums::arrow_type::ArrowType;
use crate::enums::error::Result;
use crate::traits::masked_array::MaskedArray;
use crate::{Bitmask, PrimitiveArray, Value};

/// Dispatches a `NumericArray` match arm-wise over every variant.
macro_rules! for_each_numeric {
    ($self:expr, $inner:ident => $body:expr, $null:expr) => {
        match $self {
            NumericArray::Int8($inner) => $body,
            NumericArray::Int16($inner) => $body,
            NumericArray::Int32($inner) => $body,
            NumericArray::Int64($inner) => $body,
            NumericArray::UInt8($inner) => $body,
            NumericArray::UInt16($inner) => $body,
            NumericArray::UInt32($inner) => $body,
            NumericArray::UInt64($inner) => $body,
            NumericArray::Float16($inner) => $body,
            NumericArray::Float32($inner) => $body,
            NumericArray::Float64($inner) => $body,
            NumericArray::Int128($inner) => $body,
            NumericArray::Null => $null,
        }
    };
}

/// # NumericArray
///
/// `Arc`-wrapped concrete arrays behind one discriminant, keeping clones
/// cheap and variants inline.
#[derive(PartialEq, Clone, Debug, Default)]
pub enum NumericArray {
    Int8(Arc<PrimitiveArray<i8>>),
    Int16(Arc<PrimitiveArray<i16>>),
    Int32(Arc<PrimitiveArray<i32>>),
    Int64(Arc<PrimitiveArray<i64>>),
    UInt8(Arc<PrimitiveArray<u8>>),
    UInt16(Arc<PrimitiveArray<u16>>),
    UInt32(Arc<PrimitiveArray<u32>>),
    UInt64(Arc<PrimitiveArray<u64>>),
    /// Raw IEEE-754 half-float bit patterns.
    Float16(Arc<PrimitiveArray<u16>>),
    Float32(Arc<PrimitiveArray<f32>>),
    Float64(Arc<PrimitiveArray<f64>>),
    /// Physical lanes of `Decimal128`.
    Int128(Arc<PrimitiveArray<i128>>),
    /// Default marker for `mem::take`.
    #[default]
    Null,
}

impl NumericArray {
    #[inline]
    pub fn len(&self) -> usize {
        for_each_numeric!(self, a => a.len(), 0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn null_mask(&self) -> Option<&Bitmask> {
        for_each_numeric!(self, a => a.null_mask.as_ref(), None)
    }

    #[inline]
    pub fn null_count(&self) -> usize {
        for_each_numeric!(self, a => a.null_count(), 0)
    }

    #[inline]
    pub fn is_valid(&self, idx: usize) -> bool {
        for_each_numeric!(self, a => a.is_valid(idx), false)
    }

    /// Physical Arrow type of the stored lanes.
    pub fn arrow_type(&self) -> ArrowType {
        match self {
            NumericArray::Int8(_) => ArrowType::Int8,
            NumericArray::Int16(_) => ArrowType::Int16,
            NumericArray::Int32(_) => ArrowType::Int32,
            NumericArray::Int64(_) => ArrowType::Int64,
            NumericArray::UInt8(_) => ArrowType::UInt8,
            NumericArray::UInt16(_) => ArrowType::UInt16,
            NumericArray::UInt32(_) => ArrowType::UInt32,
            NumericArray::UInt64(_) => ArrowType::UInt64,
            NumericArray::Float16(_) => ArrowType::Float16,
            NumericArray::Float32(_) => ArrowType::Float32,
            NumericArray::Float64(_) => ArrowType::Float64,
            NumericArray::Int128(_) => ArrowType::Decimal {
                precision: 38,
                scale: 0,
                bit_width: 128,
            },
            NumericArray::Null => ArrowType::Null,
        }
    }

    /// Unified element access.
    pub fn value(&self, idx: usize) -> Value<'_> {
        match self {
            NumericArray::Int8(a) => a.get(idx).map(|v| Value::Int(v as i64)),
            NumericArray::Int16(a) => a.get(idx).map(|v| Value::Int(v as i64)),
            NumericArray::Int32(a) => a.get(idx).map(|v| Value::Int(v as i64)),
            NumericArray::Int64(a) => a.get(idx).map(Value::Int),
            NumericArray::UInt8(a) => a.get(idx).map(|v| Value::UInt(v as u64)),
            NumericArray::UInt16(a) => a.get(idx).map(|v| Value::UInt(v as u64)),
            NumericArray::UInt32(a) => a.get(idx).map(|v| Value::UInt(v as u64)),
            NumericArray::UInt64(a) => a.get(idx).map(Value::UInt),
            NumericArray::Float16(a) => a.get(idx).map(|v| Value::UInt(v as u64)),
            NumericArray::Float32(a) => a.get(idx).map(|v| Value::Float(v as f64)),
            NumericArray::Float64(a) => a.get(idx).map(Value::Float),
            NumericArray::Int128(a) => a.get(idx).map(Value::Int128),
            NumericArray::Null => None,
        }
        .unwrap_or(Value::Null)
    }

    /// Valid element as `usize`, for dictionary index resolution. `None` when
    /// null.
    pub fn usize_value(&self, idx: usize) -> Option<usize> {
        match self.value(idx) {
            Value::Int(v) => Some(v as usize),
            Value::UInt(v) => Some(v as usize),
            _ => None,
        }
    }

    /// Returns an owned copy of `[offset, offset + len)`.
    pub fn slice_clone(&self, offset: usize, len: usize) -> Self {
        match self {
            NumericArray::Int8(a) => NumericArray::Int8(Arc::new(a.slice_clone(offset, len))),
            NumericArray::Int16(a) => NumericArray::Int16(Arc::new(a.slice_clone(offset, len))),
            NumericArray::Int32(a) => NumericArray::Int32(Arc::new(a.slice_clone(offset, len))),
            NumericArray::Int64(a) => NumericArray::Int64(Arc::new(a.slice_clone(offset, len))),
            NumericArray::UInt8(a) => NumericArray::UInt8(Arc::new(a.slice_clone(offset, len))),
            NumericArray::UInt16(a) => NumericArray::UInt16(Arc::new(a.slice_clone(offset, len))),
            NumericArray::UInt32(a) => NumericArray::UInt32(Arc::new(a.slice_clone(offset, len))),
            NumericArray::UInt64(a) => NumericArray::UInt64(Arc::new(a.slice_clone(offset, len))),
            NumericArray::Float16(a) => NumericArray::Float16(Arc::new(a.slice_clone(offset, len))),
            NumericArray::Float32(a) => NumericArray::Float32(Arc::new(a.slice_clone(offset, len))),
            NumericArray::Float64(a) => NumericArray::Float64(Arc::new(a.slice_clone(offset, len))),
            NumericArray::Int128(a) => NumericArray::Int128(Arc::new(a.slice_clone(offset, len))),
            NumericArray::Null => NumericArray::Null,
        }
    }

    /// Concatenates arrays of one variant end to end.
    pub fn concat(items: &[&Self]) -> Result<Self> {
        use crate::enums::error::schema_mismatch;
        macro_rules! concat_variant {
            ($variant:ident) => {{
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        NumericArray::$variant(a) => parts.push(a.as_ref()),
                        _ => return Err(schema_mismatch("numeric variant mismatch in concat")),
                    }
                }
                Ok(NumericArray::$variant(Arc::new(PrimitiveArray::concat(
                    &parts,
                ))))
            }};
        }
        match items.first() {
            None | Some(NumericArray::Null) => Ok(NumericArray::Null),
            Some(NumericArray::Int8(_)) => concat_variant!(Int8),
            Some(NumericArray::Int16(_)) => concat_variant!(Int16),
            Some(NumericArray::Int32(_)) => concat_variant!(Int32),
            Some(NumericArray::Int64(_)) => concat_variant!(Int64),
            Some(NumericArray::UInt8(_)) => concat_variant!(UInt8),
            Some(NumericArray::UInt16(_)) => concat_variant!(UInt16),
            Some(NumericArray::UInt32(_)) => concat_variant!(UInt32),
            Some(NumericArray::UInt64(_)) => concat_variant!(UInt64),
            Some(NumericArray::Float16(_)) => concat_variant!(Float16),
            Some(NumericArray::Float32(_)) => concat_variant!(Float32),
            Some(NumericArray::Float64(_)) => concat_variant!(Float64),
            Some(NumericArray::Int128(_)) => concat_variant!(Int128),
        }
    }

    /// Direct access to the `Int64` variant; panics otherwise.
    pub fn i64(&self) -> &PrimitiveArray<i64> {
        match self {
            NumericArray::Int64(a) => a,
            _ => panic!("NumericArray is not Int64"),
        }
    }

    /// Direct access to the `Int32` variant; panics otherwise.
    pub fn i32(&self) -> &PrimitiveArray<i32> {
        match self {
            NumericArray::Int32(a) => a,
            _ => panic!("NumericArray is not Int32"),
        }
    }

    /// Direct access to the `Float64` variant; panics otherwise.
    pub fn f64(&self) -> &PrimitiveArray<f64> {
        match self {
            NumericArray::Float64(a) => a,
            _ => panic!("NumericArray is not Float64"),
        }
    }
}
