//! # Field Module - *Arrow-compliant Column Metadata Tagging*
//!
//! Defines column-level schema metadata.
//!
//! A `Field` captures a column's name, logical Arrow data type, nullability,
//! an optional dictionary-encoding descriptor, and a string metadata map,
//! including the `ARROW:extension:*` keys that label extension types.
//!
//! This module contains only the schema description; pair with `FieldArray`
//! to bind a schema to actual values.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::enums::arrow_type::{ArrowType, IndexKind};
use crate::Array;

/// Metadata key carrying an extension type's logical name.
pub const EXTENSION_NAME_KEY: &str = "ARROW:extension:name";

/// Metadata key carrying an extension type's opaque parameter blob.
pub const EXTENSION_METADATA_KEY: &str = "ARROW:extension:metadata";

/// Global counter for unnamed fields
static UNNAMED_FIELD_COUNTER: AtomicUsize = AtomicUsize::new(1);

/// # DictionaryEncoding
///
/// Per-field dictionary descriptor: the stream-wide pool id, the index
/// width, and whether pool ordering is meaningful.
#[derive(Debug, Clone, PartialEq)]
pub struct DictionaryEncoding {
    pub id: i64,
    pub index: IndexKind,
    pub ordered: bool,
}

/// # Field
///
/// ## Description
/// `Field` struct supporting:
/// - Array metadata such as type, name, nullability.
/// - A dictionary descriptor when the column is pool-encoded.
/// - Light metadata, e.g. a few key-value pairs; `ARROW:extension:name`
///   overlays a logical type on the physical one.
///
/// ### Tips:
/// - `Field` is *cloned often*, so keep metadata lightweight. Containers
///   wrap it in `Arc`.
/// - For temporal arrays, `Field` carries the logical Arrow type while the
///   physical array stays integer-backed.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub dtype: ArrowType,
    pub nullable: bool,
    pub dictionary: Option<DictionaryEncoding>,
    pub metadata: BTreeMap<String, String>,
}

impl Field {
    /// Constructs a new `Field`. If the provided name is empty or only
    /// whitespace, a globally unique name like `UnnamedField1` is generated.
    pub fn new<T: Into<String>>(
        name: T,
        dtype: ArrowType,
        nullable: bool,
        metadata: Option<BTreeMap<String, String>>,
    ) -> Self {
        let mut name = name.into();
        if name.trim().is_empty() {
            let id = UNNAMED_FIELD_COUNTER.fetch_add(1, Ordering::Relaxed);
            name = format!("UnnamedField{}", id);
        }

        Field {
            name,
            dtype,
            nullable,
            dictionary: None,
            metadata: metadata.unwrap_or_default(),
        }
    }

    /// Constructs a new `Field` from an `Array` instance, deriving the
    /// dtype and nullability directly from the inner array.
    ///
    /// For temporal and decimal logical tags, use `Field::new()` with the
    /// desired `ArrowType`.
    pub fn from_array(
        name: impl Into<String>,
        array: &Array,
        metadata: Option<BTreeMap<String, String>>,
    ) -> Self {
        Field::new(name, array.arrow_type(), array.is_nullable(), metadata)
    }

    /// Attaches a dictionary descriptor.
    pub fn with_dictionary(mut self, encoding: DictionaryEncoding) -> Self {
        self.dictionary = Some(encoding);
        self
    }

    /// Labels the field as an extension type via the `ARROW:extension:*`
    /// metadata keys.
    pub fn with_extension(mut self, name: &str, metadata: Option<&str>) -> Self {
        self.metadata
            .insert(EXTENSION_NAME_KEY.to_string(), name.to_string());
        if let Some(m) = metadata {
            self.metadata
                .insert(EXTENSION_METADATA_KEY.to_string(), m.to_string());
        }
        self
    }

    /// The extension label, when present.
    pub fn extension_name(&self) -> Option<&str> {
        self.metadata.get(EXTENSION_NAME_KEY).map(|s| s.as_str())
    }

    /// The opaque extension parameter blob, when present.
    pub fn extension_metadata(&self) -> Option<&str> {
        self.metadata
            .get(EXTENSION_METADATA_KEY)
            .map(|s| s.as_str())
    }

    /// Name + element-type equivalence, stripping nullability (and
    /// metadata). The append and multi-input compatibility rule.
    pub fn equivalent(&self, other: &Field) -> bool {
        self.name == other.name && self.dtype.equivalent(&other.dtype)
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Field \"{}\": {}{}",
            self.name,
            self.dtype,
            if self.nullable { " (nullable)" } else { "" }
        )?;

        if let Some(dict) = &self.dictionary {
            write!(f, " [dictionary id {}]", dict.id)?;
        }

        if !self.metadata.is_empty() {
            write!(f, " [metadata: ")?;
            for (i, (k, v)) in self.metadata.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}=\"{}\"", k, v)?;
            }
            write!(f, "]")?;
        }

        Ok(())
    }
}
