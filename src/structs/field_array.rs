//! # **FieldArray Module** - *Column Array with Tagged Arrow Metadata*
//!
//! Couples a `Field` (array-level schema metadata) with an immutable
//! `Array` of values: the primary column representation in tables, and the
//! unit the IPC writer serializes.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::enums::arrow_type::ArrowType;
use crate::{Array, Field};

/// # FieldArray
///
/// Named and typed data column with associated array values.
///
/// ## Role
/// - Combines a `Field` with an immutable `Array` instance.
/// - Integrates into a `Table`, where immutability enforces row-length
///   guarantees.
/// - The cached `null_count` lets readers and writers skip mask scans.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldArray {
    /// Array metadata
    pub field: Arc<Field>,

    /// The array payload, `Arc`-shared internally so clones stay cheap.
    pub array: Array,

    /// Null count for the immutable array, cached at construction.
    pub null_count: usize,
}

impl FieldArray {
    /// Constructs a new `FieldArray` from an existing `Field` and `Array`.
    pub fn new(field: Field, array: Array) -> Self {
        let null_count = array.null_count();
        FieldArray {
            field: field.into(),
            array,
            null_count,
        }
    }

    /// Constructs a new `FieldArray` from an existing `Arc<Field>` and
    /// `Array`.
    pub fn new_arc(field: Arc<Field>, array: Array) -> Self {
        let null_count = array.null_count();
        FieldArray {
            field,
            array,
            null_count,
        }
    }

    /// Constructs from a name and any array, inferring type and
    /// nullability.
    pub fn from_arr<N: Into<String>>(name: N, array: Array) -> Self {
        let field = Field::from_array(name, &array, None);
        FieldArray::new(field, array)
    }

    /// Constructs with explicit per-column metadata.
    pub fn with_metadata<N: Into<String>>(
        name: N,
        array: Array,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        let field = Field::from_array(name, &array, Some(metadata));
        FieldArray::new(field, array)
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.array.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    /// The field's logical type.
    #[inline]
    pub fn arrow_type(&self) -> &ArrowType {
        &self.field.dtype
    }

    /// Returns an owned copy of `[offset, offset + len)` under the same
    /// field.
    pub fn slice_clone(&self, offset: usize, len: usize) -> Self {
        FieldArray::new_arc(self.field.clone(), self.array.slice_clone(offset, len))
    }
}

impl Display for FieldArray {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.array)
    }
}
