//! # **Schema Module** - *Ordered Field List + Table Metadata*
//!
//! The schema of a table or stream: ordered `Field`s plus a schema-level
//! string metadata map, with the equivalence rules used by multi-input
//! reads, partition checks and append.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::Field;

/// # Schema
///
/// Fields are `Arc`-shared: schemas are cloned per batch on the read path
/// and per partition on the write path.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    pub fields: Vec<Arc<Field>>,
    pub metadata: BTreeMap<String, String>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields: fields.into_iter().map(Arc::new).collect(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Number of fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[inline]
    pub fn field(&self, idx: usize) -> &Field {
        &self.fields[idx]
    }

    /// Index of the field named `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Name + element-type equivalence per field, stripping nullability.
    /// The compatibility rule for reader-level concatenation and append.
    pub fn equivalent(&self, other: &Schema) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|(a, b)| a.equivalent(b))
    }
}

impl Display for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Schema ({} fields)", self.fields.len())?;
        for field in &self.fields {
            writeln!(f, "  {}", field)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ArrowType;

    #[test]
    fn test_lookup_and_equivalence() {
        let a = Schema::new(vec![
            Field::new("x", ArrowType::Int64, true, None),
            Field::new("y", ArrowType::String, false, None),
        ]);
        assert_eq!(a.index_of("y"), Some(1));
        let b = Schema::new(vec![
            Field::new("x", ArrowType::Int64, false, None),
            Field::new("y", ArrowType::String, true, None),
        ]);
        assert!(a.equivalent(&b));
        assert_ne!(a, b);
        let c = Schema::new(vec![Field::new("x", ArrowType::Int64, true, None)]);
        assert!(!a.equivalent(&c));
    }
}
