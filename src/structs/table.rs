//! # **Table Module** - *Standard Columnar Table ("RecordBatch")*
//!
//! Columnar data container pairing a fixed number of rows with named, typed
//! `FieldArray` columns.
//!
//! Equivalent in role to Apache Arrow's `RecordBatch`, with guaranteed
//! column length consistency, optional table-level metadata, and an
//! optional table name. The IPC reader yields these; the writer consumes a
//! sequence of them as partitions.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::enums::error::{Result, schema_mismatch};
use crate::structs::schema::Schema;
use crate::traits::print::MAX_PREVIEW;
use crate::FieldArray;

// Global counter for unnamed table instances
static UNNAMED_COUNTER: AtomicUsize = AtomicUsize::new(1);

/// # Table
///
/// ## Description
/// - Standard columnar table with named columns (`FieldArray`), a fixed
///   number of rows, and an optional logical table name.
/// - All columns are required to be equal length and have consistent
///   schema.
///
/// ## Notes
/// - Table instances are lightweight to clone (`Arc`-shared payloads).
/// - For mutation, construct a new table or replace individual columns.
#[derive(Default, PartialEq, Clone, Debug)]
pub struct Table {
    /// FieldArrays representing named columns.
    pub cols: Vec<FieldArray>,
    /// Number of rows in the table.
    pub n_rows: usize,
    /// Table name
    pub name: String,
    /// Schema-level metadata, round-tripped through IPC.
    pub metadata: BTreeMap<String, String>,
}

impl Table {
    /// Constructs a new Table with a specified name and optional columns.
    /// If `cols` is provided, the number of rows is inferred from the first
    /// column.
    pub fn new(name: String, cols: Option<Vec<FieldArray>>) -> Self {
        let cols = cols.unwrap_or_default();
        let n_rows = cols.first().map(|col| col.len()).unwrap_or(0);
        for col in &cols {
            assert_eq!(col.len(), n_rows, "Column length mismatch");
        }

        let name = if name.trim().is_empty() {
            let id = UNNAMED_COUNTER.fetch_add(1, Ordering::Relaxed);
            format!("UnnamedTable{}", id)
        } else {
            name
        };

        Self {
            cols,
            n_rows,
            name,
            metadata: BTreeMap::new(),
        }
    }

    /// Constructs a new, empty Table with a globally unique name.
    pub fn new_empty() -> Self {
        Table::new(String::new(), None)
    }

    /// Constructs from columns alone with a generated name.
    pub fn from_cols(cols: Vec<FieldArray>) -> Self {
        Table::new(String::new(), Some(cols))
    }

    /// Attaches schema-level metadata.
    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Adds a column.
    pub fn add_col(&mut self, field_array: FieldArray) {
        let array_len = field_array.len();
        if self.cols.is_empty() {
            self.n_rows = array_len;
        } else {
            assert!(self.n_rows == array_len, "Column length mismatch");
        }
        self.cols.push(field_array);
    }

    /// Builds a schema from the column fields plus table metadata.
    pub fn schema(&self) -> Schema {
        Schema {
            fields: self.cols.iter().map(|fa| fa.field.clone()).collect(),
            metadata: self.metadata.clone(),
        }
    }

    /// Returns the number of columns.
    pub fn n_cols(&self) -> usize {
        self.cols.len()
    }

    /// Returns the number of rows.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Returns true if the table is empty (no columns or no rows).
    pub fn is_empty(&self) -> bool {
        self.n_cols() == 0 || self.n_rows == 0
    }

    /// Column by position.
    #[inline]
    pub fn col(&self, idx: usize) -> &FieldArray {
        &self.cols[idx]
    }

    /// Column by name.
    pub fn col_by_name(&self, name: &str) -> Option<&FieldArray> {
        self.cols.iter().find(|c| c.field.name == name)
    }

    /// Returns the list of column names.
    pub fn col_names(&self) -> Vec<&str> {
        self.cols.iter().map(|c| c.field.name.as_str()).collect()
    }

    /// Returns an owned copy of rows `[offset, offset + len)`.
    pub fn slice_clone(&self, offset: usize, len: usize) -> Self {
        Self {
            cols: self
                .cols
                .iter()
                .map(|c| c.slice_clone(offset, len))
                .collect(),
            n_rows: len,
            name: self.name.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// Concatenates tables with equivalent schemas into one, column-wise.
    pub fn concat(items: &[Table]) -> Result<Table> {
        let Some(first) = items.first() else {
            return Ok(Table::new_empty());
        };
        if items.len() == 1 {
            return Ok(first.clone());
        }
        let schema = first.schema();
        for item in &items[1..] {
            if !schema.equivalent(&item.schema()) {
                return Err(schema_mismatch(format!(
                    "table '{}' does not match the first schema",
                    item.name
                )));
            }
        }
        let mut cols = Vec::with_capacity(first.n_cols());
        for j in 0..first.n_cols() {
            let parts: Vec<&crate::Array> = items.iter().map(|t| &t.cols[j].array).collect();
            let array = crate::Array::concat(&parts)?;
            cols.push(FieldArray::new_arc(first.cols[j].field.clone(), array));
        }
        Ok(Table {
            cols,
            n_rows: items.iter().map(|t| t.n_rows).sum(),
            name: first.name.clone(),
            metadata: first.metadata.clone(),
        })
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Table \"{}\" ({} rows × {} cols)",
            self.name,
            self.n_rows,
            self.n_cols()
        )?;
        let preview = self.n_rows.min(MAX_PREVIEW);
        write!(f, " ")?;
        for col in &self.cols {
            write!(f, " {:>12}", col.field.name)?;
        }
        writeln!(f)?;
        for i in 0..preview {
            write!(f, " ")?;
            for col in &self.cols {
                write!(f, " {:>12}", format!("{}", col.array.value(i)))?;
            }
            writeln!(f)?;
        }
        if self.n_rows > preview {
            writeln!(f, "  … ({} rows total)", self.n_rows)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Array, PrimitiveArray, StringArray};

    fn sample() -> Table {
        let c1 = FieldArray::from_arr(
            "id",
            Array::from_int64(PrimitiveArray::from_slice(&[1, 2, 3])),
        );
        let c2 = FieldArray::from_arr(
            "name",
            Array::from_string32(StringArray::from_slice(&["a", "b", "c"])),
        );
        Table::new("demo".into(), Some(vec![c1, c2]))
    }

    #[test]
    fn test_shape() {
        let t = sample();
        assert_eq!(t.n_rows(), 3);
        assert_eq!(t.n_cols(), 2);
        assert_eq!(t.col_names(), vec!["id", "name"]);
        assert_eq!(t.schema().len(), 2);
    }

    #[test]
    #[should_panic(expected = "Column length mismatch")]
    fn test_unequal_columns_panic() {
        let c1 = FieldArray::from_arr("a", Array::from_int64(PrimitiveArray::from_slice(&[1])));
        let c2 = FieldArray::from_arr(
            "b",
            Array::from_int64(PrimitiveArray::from_slice(&[1, 2])),
        );
        let _ = Table::new("bad".into(), Some(vec![c1, c2]));
    }

    #[test]
    fn test_concat() {
        let a = sample();
        let b = sample();
        let c = Table::concat(&[a, b]).unwrap();
        assert_eq!(c.n_rows(), 6);
        assert_eq!(c.cols[0].array.value(4), crate::Value::Int(2));
    }

    #[test]
    fn test_concat_schema_mismatch() {
        let a = sample();
        let c1 = FieldArray::from_arr(
            "id",
            Array::from_string32(StringArray::from_slice(&["x"])),
        );
        let b = Table::new("other".into(), Some(vec![c1]));
        assert!(Table::concat(&[a, b]).is_err());
    }

    #[test]
    fn test_slice_clone() {
        let t = sample();
        let s = t.slice_clone(1, 2);
        assert_eq!(s.n_rows(), 2);
        assert_eq!(s.cols[1].array.value(0), crate::Value::Str("b"));
    }
}
