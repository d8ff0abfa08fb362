//! # **Array Module** - *Main High-Level Array Type*
//!
//! `Array` is the primary unified container for all array variants in the
//! crate.
//!
//! ## Features:
//! - direct variant access to numeric, text and nested array categories
//! - zero-cost casts when the contained type is known
//! - centralises dispatch for length, validity, element access, slicing and
//!   concatenation
//! - preserves aligned buffers and `Arc`-shared payloads across variants.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::enums::arrow_type::ArrowType;
use crate::enums::collections::numeric_array::NumericArray;
use crate::enums::collections::text_array::TextArray;
use crate::enums::error::{Result, schema_mismatch};
use crate::structs::variants::binary::{BinaryArray, FixedSizeBinaryArray};
use crate::structs::variants::dictionary::DictionaryArray;
use crate::structs::variants::fixed_size_list::FixedSizeListArray;
use crate::structs::variants::list::ListArray;
use crate::structs::variants::map::MapArray;
use crate::structs::variants::struct_::StructArray;
use crate::structs::variants::union::UnionArray;
use crate::traits::masked_array::MaskedArray;
use crate::traits::print::MAX_PREVIEW;
use crate::{Bitmask, BooleanArray, Field, PrimitiveArray, StringArray, Value};

/// # Array
///
/// Standard `Array` type. Wrap in a `FieldArray` when using inside a
/// `Table` or as a standalone value requiring tagged metadata.
///
/// ## Overview
/// The dual-enum approach (outer category, inner width) keeps function
/// signatures clean: match on the outer enum for broad category handling,
/// or the inner variant for precise type handling. Inner arrays sit behind
/// `Arc`, so cloning an `Array` is constant-time.
#[derive(PartialEq, Clone, Debug, Default)]
pub enum Array {
    NumericArray(NumericArray),
    TextArray(TextArray),
    BooleanArray(Arc<BooleanArray>),
    List32(Arc<ListArray<u32>>),
    List64(Arc<ListArray<u64>>),
    FixedSizeList(Arc<FixedSizeListArray>),
    Struct(Arc<StructArray>),
    Map(Arc<MapArray>),
    Union(Arc<UnionArray>),
    Dictionary(Arc<DictionaryArray>),
    /// A `Null`-typed column: a length with no buffers.
    NullArray(usize),
    /// Default marker for `mem::take`.
    #[default]
    Null,
}

impl Array {
    /// Creates an Array enum with an Int8 array.
    pub fn from_int8(arr: PrimitiveArray<i8>) -> Self {
        Array::NumericArray(NumericArray::Int8(Arc::new(arr)))
    }

    /// Creates an Array enum with an Int16 array.
    pub fn from_int16(arr: PrimitiveArray<i16>) -> Self {
        Array::NumericArray(NumericArray::Int16(Arc::new(arr)))
    }

    /// Creates an Array enum with an Int32 array.
    pub fn from_int32(arr: PrimitiveArray<i32>) -> Self {
        Array::NumericArray(NumericArray::Int32(Arc::new(arr)))
    }

    /// Creates an Array enum with an Int64 array.
    pub fn from_int64(arr: PrimitiveArray<i64>) -> Self {
        Array::NumericArray(NumericArray::Int64(Arc::new(arr)))
    }

    /// Creates an Array enum with a UInt8 array.
    pub fn from_uint8(arr: PrimitiveArray<u8>) -> Self {
        Array::NumericArray(NumericArray::UInt8(Arc::new(arr)))
    }

    /// Creates an Array enum with a UInt16 array.
    pub fn from_uint16(arr: PrimitiveArray<u16>) -> Self {
        Array::NumericArray(NumericArray::UInt16(Arc::new(arr)))
    }

    /// Creates an Array enum with a UInt32 array.
    pub fn from_uint32(arr: PrimitiveArray<u32>) -> Self {
        Array::NumericArray(NumericArray::UInt32(Arc::new(arr)))
    }

    /// Creates an Array enum with a UInt64 array.
    pub fn from_uint64(arr: PrimitiveArray<u64>) -> Self {
        Array::NumericArray(NumericArray::UInt64(Arc::new(arr)))
    }

    /// Creates an Array enum with a Float32 array.
    pub fn from_float32(arr: PrimitiveArray<f32>) -> Self {
        Array::NumericArray(NumericArray::Float32(Arc::new(arr)))
    }

    /// Creates an Array enum with a Float64 array.
    pub fn from_float64(arr: PrimitiveArray<f64>) -> Self {
        Array::NumericArray(NumericArray::Float64(Arc::new(arr)))
    }

    /// Creates an Array enum with raw half-float bit patterns.
    pub fn from_float16_bits(arr: PrimitiveArray<u16>) -> Self {
        Array::NumericArray(NumericArray::Float16(Arc::new(arr)))
    }

    /// Creates an Array enum with Decimal128 lanes.
    pub fn from_int128(arr: PrimitiveArray<i128>) -> Self {
        Array::NumericArray(NumericArray::Int128(Arc::new(arr)))
    }

    /// Creates an Array enum with a Boolean array.
    pub fn from_boolean(arr: BooleanArray) -> Self {
        Array::BooleanArray(Arc::new(arr))
    }

    /// Creates an Array enum with a String32 array.
    pub fn from_string32(arr: StringArray<u32>) -> Self {
        Array::TextArray(TextArray::String32(Arc::new(arr)))
    }

    /// Creates an Array enum with a String64 array.
    pub fn from_string64(arr: StringArray<u64>) -> Self {
        Array::TextArray(TextArray::String64(Arc::new(arr)))
    }

    /// Creates an Array enum with a Binary32 array.
    pub fn from_binary32(arr: BinaryArray<u32>) -> Self {
        Array::TextArray(TextArray::Binary32(Arc::new(arr)))
    }

    /// Creates an Array enum with a Binary64 array.
    pub fn from_binary64(arr: BinaryArray<u64>) -> Self {
        Array::TextArray(TextArray::Binary64(Arc::new(arr)))
    }

    /// Creates an Array enum with a FixedSizeBinary array.
    pub fn from_fixed_binary(arr: FixedSizeBinaryArray) -> Self {
        Array::TextArray(TextArray::FixedBinary(Arc::new(arr)))
    }

    /// Creates an Array enum with a List (32-bit offsets) array.
    pub fn from_list32(arr: ListArray<u32>) -> Self {
        Array::List32(Arc::new(arr))
    }

    /// Creates an Array enum with a LargeList (64-bit offsets) array.
    pub fn from_list64(arr: ListArray<u64>) -> Self {
        Array::List64(Arc::new(arr))
    }

    /// Creates an Array enum with a FixedSizeList array.
    pub fn from_fixed_size_list(arr: FixedSizeListArray) -> Self {
        Array::FixedSizeList(Arc::new(arr))
    }

    /// Creates an Array enum with a Struct array.
    pub fn from_struct(arr: StructArray) -> Self {
        Array::Struct(Arc::new(arr))
    }

    /// Creates an Array enum with a Map array.
    pub fn from_map(arr: MapArray) -> Self {
        Array::Map(Arc::new(arr))
    }

    /// Creates an Array enum with a Union array.
    pub fn from_union(arr: UnionArray) -> Self {
        Array::Union(Arc::new(arr))
    }

    /// Creates an Array enum with a Dictionary array.
    pub fn from_dictionary(arr: DictionaryArray) -> Self {
        Array::Dictionary(Arc::new(arr))
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Array::NumericArray(a) => a.len(),
            Array::TextArray(a) => a.len(),
            Array::BooleanArray(a) => a.len(),
            Array::List32(a) => a.len(),
            Array::List64(a) => a.len(),
            Array::FixedSizeList(a) => a.len(),
            Array::Struct(a) => a.len(),
            Array::Map(a) => a.len(),
            Array::Union(a) => a.len(),
            Array::Dictionary(a) => a.len(),
            Array::NullArray(n) => *n,
            Array::Null => 0,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validity mask of the top level, if any. Unions and `Null` columns
    /// carry none.
    pub fn null_mask(&self) -> Option<&Bitmask> {
        match self {
            Array::NumericArray(a) => a.null_mask(),
            Array::TextArray(a) => a.null_mask(),
            Array::BooleanArray(a) => a.null_mask.as_ref(),
            Array::List32(a) => a.null_mask.as_ref(),
            Array::List64(a) => a.null_mask.as_ref(),
            Array::FixedSizeList(a) => a.null_mask.as_ref(),
            Array::Struct(a) => a.null_mask.as_ref(),
            Array::Map(a) => a.null_mask.as_ref(),
            Array::Union(_) => None,
            Array::Dictionary(a) => a.null_mask(),
            Array::NullArray(_) | Array::Null => None,
        }
    }

    /// Number of null elements. `Null` columns are all-null by definition.
    pub fn null_count(&self) -> usize {
        match self {
            Array::NullArray(n) => *n,
            Array::Union(_) | Array::Null => 0,
            _ => match self.null_mask() {
                Some(mask) => self.len() - mask.count_ones(),
                None => 0,
            },
        }
    }

    /// Whether element `idx` is valid.
    pub fn is_valid(&self, idx: usize) -> bool {
        match self {
            Array::NullArray(_) => false,
            _ => self.null_mask().map(|m| m.get(idx)).unwrap_or(true),
        }
    }

    /// Whether the array carries a validity mask (or is inherently
    /// all-null).
    pub fn is_nullable(&self) -> bool {
        matches!(self, Array::NullArray(_)) || self.null_mask().is_some()
    }

    /// Physical Arrow type of the payload. Nested variants synthesize
    /// anonymous child fields; temporal logical tags are applied at the
    /// `Field` level instead.
    pub fn arrow_type(&self) -> ArrowType {
        match self {
            Array::NumericArray(a) => a.arrow_type(),
            Array::TextArray(a) => a.arrow_type(),
            Array::BooleanArray(_) => ArrowType::Boolean,
            Array::List32(a) => ArrowType::List(Box::new(Field::new(
                "item",
                a.values.arrow_type(),
                a.values.is_nullable(),
                None,
            ))),
            Array::List64(a) => ArrowType::LargeList(Box::new(Field::new(
                "item",
                a.values.arrow_type(),
                a.values.is_nullable(),
                None,
            ))),
            Array::FixedSizeList(a) => ArrowType::FixedSizeList(
                Box::new(Field::new(
                    "item",
                    a.values.arrow_type(),
                    a.values.is_nullable(),
                    None,
                )),
                a.size,
            ),
            Array::Struct(a) => ArrowType::Struct(
                a.children
                    .iter()
                    .enumerate()
                    .map(|(i, c)| {
                        Field::new(format!("f{i}"), c.arrow_type(), c.is_nullable(), None)
                    })
                    .collect(),
            ),
            Array::Map(a) => ArrowType::Map(
                Box::new(Field::new("entries", a.entries.arrow_type(), false, None)),
                false,
            ),
            Array::Union(a) => ArrowType::Union {
                mode: a.mode,
                fields: a
                    .children
                    .iter()
                    .enumerate()
                    .map(|(i, c)| {
                        Field::new(format!("v{i}"), c.arrow_type(), c.is_nullable(), None)
                    })
                    .collect(),
                type_ids: Some(a.type_codes.iter().map(|c| *c as i32).collect()),
            },
            Array::Dictionary(a) => ArrowType::Dictionary(
                crate::enums::arrow_type::IndexKind::Int32,
                Box::new(a.values.arrow_type()),
            ),
            Array::NullArray(_) | Array::Null => ArrowType::Null,
        }
    }

    /// Unified element access with bounds check.
    pub fn value(&self, idx: usize) -> Value<'_> {
        assert!(idx < self.len(), "Array::value out of bounds");
        match self {
            Array::NumericArray(a) => a.value(idx),
            Array::TextArray(a) => a.value(idx),
            Array::BooleanArray(a) => a.get(idx).map(Value::Bool).unwrap_or(Value::Null),
            Array::List32(a) => a.value(idx).map(Value::List).unwrap_or(Value::Null),
            Array::List64(a) => a.value(idx).map(Value::List).unwrap_or(Value::Null),
            Array::FixedSizeList(a) => a.value(idx).map(Value::List).unwrap_or(Value::Null),
            Array::Struct(a) => {
                if a.is_valid(idx) {
                    Value::Struct(a.children.iter().map(|c| c.value(idx)).collect())
                } else {
                    Value::Null
                }
            }
            Array::Map(a) => a.value(idx).map(Value::List).unwrap_or(Value::Null),
            Array::Union(a) => a.value(idx),
            Array::Dictionary(a) => a.value(idx),
            Array::NullArray(_) => Value::Null,
            Array::Null => Value::Null,
        }
    }

    /// Returns an owned copy of `[offset, offset + len)`.
    pub fn slice_clone(&self, offset: usize, len: usize) -> Array {
        match self {
            Array::NumericArray(a) => Array::NumericArray(a.slice_clone(offset, len)),
            Array::TextArray(a) => Array::TextArray(a.slice_clone(offset, len)),
            Array::BooleanArray(a) => Array::BooleanArray(Arc::new(a.slice_clone(offset, len))),
            Array::List32(a) => Array::List32(Arc::new(a.slice_clone(offset, len))),
            Array::List64(a) => Array::List64(Arc::new(a.slice_clone(offset, len))),
            Array::FixedSizeList(a) => Array::FixedSizeList(Arc::new(a.slice_clone(offset, len))),
            Array::Struct(a) => Array::Struct(Arc::new(a.slice_clone(offset, len))),
            Array::Map(a) => Array::Map(Arc::new(a.slice_clone(offset, len))),
            Array::Union(a) => Array::Union(Arc::new(a.slice_clone(offset, len))),
            Array::Dictionary(a) => Array::Dictionary(Arc::new(a.slice_clone(offset, len))),
            Array::NullArray(n) => {
                assert!(offset + len <= *n, "NullArray slice out of bounds");
                Array::NullArray(len)
            }
            Array::Null => Array::Null,
        }
    }

    /// Materialises the full array as an owned copy.
    #[inline]
    pub fn to_owned_array(&self) -> Array {
        self.slice_clone(0, self.len())
    }

    /// Concatenates arrays of one variant end to end.
    pub fn concat(items: &[&Array]) -> Result<Array> {
        let Some(first) = items.first() else {
            return Ok(Array::Null);
        };
        macro_rules! collect_variant {
            ($variant:ident) => {{
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Array::$variant(a) => parts.push(a.as_ref()),
                        _ => return Err(schema_mismatch("array variant mismatch in concat")),
                    }
                }
                parts
            }};
        }
        Ok(match first {
            Array::NumericArray(_) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Array::NumericArray(a) => parts.push(a),
                        _ => return Err(schema_mismatch("array variant mismatch in concat")),
                    }
                }
                Array::NumericArray(NumericArray::concat(&parts)?)
            }
            Array::TextArray(_) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Array::TextArray(a) => parts.push(a),
                        _ => return Err(schema_mismatch("array variant mismatch in concat")),
                    }
                }
                Array::TextArray(TextArray::concat(&parts)?)
            }
            Array::BooleanArray(_) => {
                let parts = collect_variant!(BooleanArray);
                Array::BooleanArray(Arc::new(BooleanArray::concat(&parts)))
            }
            Array::List32(_) => {
                let parts = collect_variant!(List32);
                Array::List32(Arc::new(ListArray::concat(&parts)?))
            }
            Array::List64(_) => {
                let parts = collect_variant!(List64);
                Array::List64(Arc::new(ListArray::concat(&parts)?))
            }
            Array::FixedSizeList(_) => {
                let parts = collect_variant!(FixedSizeList);
                Array::FixedSizeList(Arc::new(FixedSizeListArray::concat(&parts)?))
            }
            Array::Struct(_) => {
                let parts = collect_variant!(Struct);
                Array::Struct(Arc::new(StructArray::concat(&parts)?))
            }
            Array::Map(_) => {
                let parts = collect_variant!(Map);
                Array::Map(Arc::new(MapArray::concat(&parts)?))
            }
            Array::Union(_) => {
                let parts = collect_variant!(Union);
                Array::Union(Arc::new(UnionArray::concat(&parts)?))
            }
            Array::Dictionary(_) => {
                let parts = collect_variant!(Dictionary);
                Array::Dictionary(Arc::new(DictionaryArray::concat(&parts)?))
            }
            Array::NullArray(_) => {
                let mut total = 0usize;
                for item in items {
                    match item {
                        Array::NullArray(n) => total += n,
                        _ => return Err(schema_mismatch("array variant mismatch in concat")),
                    }
                }
                Array::NullArray(total)
            }
            Array::Null => Array::Null,
        })
    }

    /// Gathers the listed elements into a new array, in index order.
    pub fn take(&self, indices: &[usize]) -> Result<Array> {
        if indices.is_empty() {
            return Ok(self.slice_clone(0, 0));
        }
        let slices: Vec<Array> = indices
            .iter()
            .map(|i| self.slice_clone(*i, 1))
            .collect();
        Array::concat(&slices.iter().collect::<Vec<_>>())
    }

    /// Direct access to the numeric category; panics otherwise.
    pub fn num(&self) -> &NumericArray {
        match self {
            Array::NumericArray(a) => a,
            _ => panic!("Array is not numeric"),
        }
    }

    /// Direct access to the text category; panics otherwise.
    pub fn text(&self) -> &TextArray {
        match self {
            Array::TextArray(a) => a,
            _ => panic!("Array is not text"),
        }
    }

    /// Direct access to the boolean variant; panics otherwise.
    pub fn boolean(&self) -> &BooleanArray {
        match self {
            Array::BooleanArray(a) => a,
            _ => panic!("Array is not boolean"),
        }
    }

    /// Direct access to the dictionary variant; panics otherwise.
    pub fn dict(&self) -> &DictionaryArray {
        match self {
            Array::Dictionary(a) => a,
            _ => panic!("Array is not dictionary-encoded"),
        }
    }
}

impl Display for Array {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Array [{} values] [", self.len())?;
        for i in 0..self.len().min(MAX_PREVIEW) {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", self.value(i))?;
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
    fn test_value_dispatch() {
        let arr = Array::from_int64(PrimitiveArray::from_opt_slice(&[Some(5), None]));
        assert_eq!(arr.value(0), Value::Int(5));
        assert_eq!(arr.value(1), Value::Null);
        assert_eq!(arr.null_count(), 1);
    }

    #[test]
    fn test_null_array() {
        let arr = Array::NullArray(3);
        assert_eq!(arr.len(), 3);
        assert_eq!(arr.null_count(), 3);
        assert!(!arr.is_valid(0));
        assert_eq!(arr.value(2), Value::Null);
    }

    #[test]
    fn test_take() {
        let arr = Array::from_int32(PrimitiveArray::from_slice(&[10, 20, 30, 40]));
        let taken = arr.take(&[3, 1]).unwrap();
        assert_eq!(taken.value(0), Value::Int(40));
        assert_eq!(taken.value(1), Value::Int(20));
    }

    #[test]
    fn test_concat_null_arrays() {
        let c = Array::concat(&[&Array::NullArray(2), &Array::NullArray(1)]).unwrap();
        assert_eq!(c.len(), 3);
        assert_eq!(c.null_count(), 3);
    }
}
