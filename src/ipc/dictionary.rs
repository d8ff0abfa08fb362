//! # **Dictionary Module** - *Stream-wide Pool Tracking*
//!
//! Owns dictionary identity for a writer: pool ids minted monotonically,
//! per-column pool assignment, value interning, delta detection across
//! partitions, and cardinality-based index-width selection.
//!
//! Pools are append-only within a stream: a repeated value keeps its first
//! index, new values join at the tail and travel as delta dictionary
//! batches. Columns that arrive already dictionary-encoded ("ref arrays")
//! adopt their existing encoding and skip the diff.

use std::collections::HashMap;

use crate::enums::arrow_type::IndexKind;
use crate::enums::collections::numeric_array::NumericArray;
use crate::enums::error::{Result, schema_mismatch, unsupported};
use crate::structs::variants::binary::BinaryArray;
use crate::structs::variants::dictionary::DictionaryArray;
use crate::{Array, BooleanArray, PrimitiveArray, StringArray, Value};
use std::sync::Arc;

/// One tracked pool.
struct DictPool {
    values: Array,
    interned: HashMap<Vec<u8>, usize>,
    index: IndexKind,
    ordered: bool,
}

/// A column after pool encoding.
pub struct EncodedColumn {
    /// Stream-wide pool id.
    pub id: i64,
    /// Index width assigned to the pool.
    pub index: IndexKind,
    /// The encoded column.
    pub array: DictionaryArray,
    /// Full pool values, emitted as the non-delta dictionary batch when
    /// the pool was created by this call.
    pub full: Option<Array>,
    /// New values only, emitted as a delta dictionary batch.
    pub delta: Option<Array>,
}

/// # DictionaryTracker
///
/// `{pool_id → pool}` plus a `column path → pool_id` assignment map.
/// Guarded by a mutex at the writer level when encoding tasks share it.
#[derive(Default)]
pub struct DictionaryTracker {
    pools: HashMap<i64, DictPool>,
    columns: HashMap<String, i64>,
    next_id: i64,
}

impl DictionaryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pool read back from an existing stream (append path).
    pub fn seed(&mut self, id: i64, values: Array, ordered: bool) -> Result<()> {
        let mut interned = HashMap::with_capacity(values.len());
        for i in 0..values.len() {
            if let Some(key) = value_key(&values.value(i)) {
                interned.entry(key).or_insert(i);
            }
        }
        let index = choose_index_kind(values.len());
        self.pools.insert(
            id,
            DictPool {
                values,
                interned,
                index,
                ordered,
            },
        );
        self.next_id = self.next_id.max(id + 1);
        Ok(())
    }

    /// Binds a seeded pool id to a column path (append path).
    pub fn bind_column(&mut self, path: &str, id: i64) {
        self.columns.insert(path.to_string(), id);
    }

    /// Current values of a pool.
    pub fn pool_values(&self, id: i64) -> Option<&Array> {
        self.pools.get(&id).map(|p| &p.values)
    }

    /// Pool-encodes a plain column. The first call for a `path` mints a
    /// pool and returns the full value set; later calls return only the
    /// delta (if any).
    pub fn encode(&mut self, path: &str, array: &Array, ordered: bool) -> Result<EncodedColumn> {
        if let Array::Dictionary(dict) = array {
            return self.adopt(path, dict);
        }
        let (id, is_first) = match self.columns.get(path) {
            Some(id) => (*id, false),
            None => {
                let id = self.next_id;
                self.next_id += 1;
                self.columns.insert(path.to_string(), id);
                (id, true)
            }
        };

        // collect keys; count fresh uniques before choosing the index width
        let n = array.len();
        let mut keys: Vec<Option<Vec<u8>>> = Vec::with_capacity(n);
        for i in 0..n {
            let value = array.value(i);
            match value {
                Value::Null => keys.push(None),
                v => {
                    let key = value_key(&v).ok_or_else(|| {
                        unsupported("dictionary encoding of nested element types")
                    })?;
                    keys.push(Some(key));
                }
            }
        }

        if is_first {
            // cardinality drives the index width
            let mut uniques = 0usize;
            let mut seen = HashMap::new();
            for key in keys.iter().flatten() {
                if !seen.contains_key(key) {
                    seen.insert(key.clone(), ());
                    uniques += 1;
                }
            }
            let index = choose_index_kind(uniques);
            self.pools.insert(
                id,
                DictPool {
                    values: array.slice_clone(0, 0),
                    interned: HashMap::new(),
                    index,
                    ordered,
                },
            );
        }

        let pool = self.pools.get_mut(&id).expect("pool just ensured");
        let mut fresh: Vec<usize> = Vec::new();
        let mut indices: Vec<Option<usize>> = Vec::with_capacity(n);
        for (i, key) in keys.iter().enumerate() {
            match key {
                None => indices.push(None),
                Some(key) => match pool.interned.get(key) {
                    Some(idx) => indices.push(Some(*idx)),
                    None => {
                        let idx = pool.values.len() + fresh.len();
                        pool.interned.insert(key.clone(), idx);
                        fresh.push(i);
                        indices.push(Some(idx));
                    }
                },
            }
        }

        let new_values = if fresh.is_empty() {
            None
        } else {
            Some(array.take(&fresh)?)
        };
        if let Some(new_values) = &new_values {
            pool.values = if pool.values.is_empty() {
                new_values.clone()
            } else {
                Array::concat(&[&pool.values, new_values])?
            };
        }

        let max_index = index_capacity(pool.index);
        if pool.values.len() > max_index {
            return Err(schema_mismatch(format!(
                "dictionary pool {id} grew to {} values, beyond its {:?} index width",
                pool.values.len(),
                pool.index
            )));
        }

        let dict = DictionaryArray::from_parts(
            build_indices(pool.index, &indices),
            pool.values.clone(),
            pool.ordered,
        );
        Ok(EncodedColumn {
            id,
            index: pool.index,
            array: dict,
            full: is_first.then(|| pool.values.clone()),
            delta: if is_first { None } else { new_values },
        })
    }

    /// Adopts a pre-encoded column's pool directly, skipping the diff.
    /// Later partitions may only extend the pool (append-only).
    pub fn adopt(&mut self, path: &str, dict: &DictionaryArray) -> Result<EncodedColumn> {
        if dict.values.arrow_type().is_nested() {
            return Err(unsupported(
                "dictionary ref pools must hold a concrete value type",
            ));
        }
        let index = index_kind_of(&dict.indices)?;
        match self.columns.get(path) {
            None => {
                let id = self.next_id;
                self.next_id += 1;
                self.columns.insert(path.to_string(), id);
                self.pools.insert(
                    id,
                    DictPool {
                        values: dict.values.clone(),
                        interned: HashMap::new(),
                        index,
                        ordered: dict.ordered,
                    },
                );
                Ok(EncodedColumn {
                    id,
                    index,
                    array: dict.clone(),
                    full: Some(dict.values.clone()),
                    delta: None,
                })
            }
            Some(id) => {
                let id = *id;
                let pool = self.pools.get_mut(&id).expect("bound pool exists");
                let old_len = pool.values.len();
                let new_len = dict.values.len();
                if new_len < old_len {
                    return Err(schema_mismatch(format!(
                        "dictionary ref pool {id} shrank from {old_len} to {new_len} values"
                    )));
                }
                for i in 0..old_len {
                    if pool.values.value(i) != dict.values.value(i) {
                        return Err(schema_mismatch(format!(
                            "dictionary ref pool {id} changed at value {i}; pools are append-only"
                        )));
                    }
                }
                let delta = (new_len > old_len)
                    .then(|| dict.values.slice_clone(old_len, new_len - old_len));
                pool.values = dict.values.clone();
                Ok(EncodedColumn {
                    id,
                    index,
                    array: dict.clone(),
                    full: None,
                    delta,
                })
            }
        }
    }
}

/// Index width by pool cardinality.
pub fn choose_index_kind(cardinality: usize) -> IndexKind {
    if cardinality <= i8::MAX as usize / 2 {
        IndexKind::Int8
    } else if cardinality <= i16::MAX as usize {
        IndexKind::Int16
    } else if cardinality <= i32::MAX as usize {
        IndexKind::Int32
    } else {
        IndexKind::Int64
    }
}

fn index_capacity(kind: IndexKind) -> usize {
    match kind {
        IndexKind::Int8 => i8::MAX as usize,
        IndexKind::UInt8 => u8::MAX as usize,
        IndexKind::Int16 => i16::MAX as usize,
        IndexKind::UInt16 => u16::MAX as usize,
        IndexKind::Int32 => i32::MAX as usize,
        IndexKind::UInt32 => u32::MAX as usize,
        IndexKind::Int64 | IndexKind::UInt64 => usize::MAX,
    }
}

/// The index kind a pre-encoded column already uses.
pub fn index_kind_of(indices: &NumericArray) -> Result<IndexKind> {
    Ok(match indices {
        NumericArray::Int8(_) => IndexKind::Int8,
        NumericArray::Int16(_) => IndexKind::Int16,
        NumericArray::Int32(_) => IndexKind::Int32,
        NumericArray::Int64(_) => IndexKind::Int64,
        NumericArray::UInt8(_) => IndexKind::UInt8,
        NumericArray::UInt16(_) => IndexKind::UInt16,
        NumericArray::UInt32(_) => IndexKind::UInt32,
        NumericArray::UInt64(_) => IndexKind::UInt64,
        _ => {
            return Err(unsupported(
                "dictionary indices must be an integer array",
            ));
        }
    })
}

/// Builds an index array of the given width from optional indices.
pub fn build_indices(kind: IndexKind, indices: &[Option<usize>]) -> NumericArray {
    macro_rules! build {
        ($variant:ident, $ty:ty) => {{
            let mut arr = PrimitiveArray::<$ty>::with_capacity(indices.len(), false);
            for idx in indices {
                match idx {
                    Some(v) => arr.push(*v as $ty),
                    None => arr.push_null(),
                }
            }
            NumericArray::$variant(Arc::new(arr))
        }};
    }
    match kind {
        IndexKind::Int8 => build!(Int8, i8),
        IndexKind::Int16 => build!(Int16, i16),
        IndexKind::Int32 => build!(Int32, i32),
        IndexKind::Int64 => build!(Int64, i64),
        IndexKind::UInt8 => build!(UInt8, u8),
        IndexKind::UInt16 => build!(UInt16, u16),
        IndexKind::UInt32 => build!(UInt32, u32),
        IndexKind::UInt64 => build!(UInt64, u64),
    }
}

/// Interning key for a pool value. `None` for nulls; nested values are not
/// internable.
pub fn value_key(value: &Value<'_>) -> Option<Vec<u8>> {
    match value {
        Value::Null => None,
        Value::Bool(v) => Some(vec![b'b', *v as u8]),
        Value::Int(v) => {
            let mut k = vec![b'i'];
            k.extend_from_slice(&v.to_le_bytes());
            Some(k)
        }
        Value::UInt(v) => {
            let mut k = vec![b'u'];
            k.extend_from_slice(&v.to_le_bytes());
            Some(k)
        }
        Value::Int128(v) => {
            let mut k = vec![b'd'];
            k.extend_from_slice(&v.to_le_bytes());
            Some(k)
        }
        Value::Float(v) => {
            let mut k = vec![b'f'];
            k.extend_from_slice(&v.to_bits().to_le_bytes());
            Some(k)
        }
        Value::Str(v) => {
            let mut k = vec![b's'];
            k.extend_from_slice(v.as_bytes());
            Some(k)
        }
        Value::Bytes(v) => {
            let mut k = vec![b'y'];
            k.extend_from_slice(v);
            Some(k)
        }
        Value::List(_) | Value::Struct(_) => None,
    }
}

/// Rebuilds a pool-typed array from resolved values; used when merging
/// dictionary columns across independent inputs.
pub fn array_from_values(template: &Array, values: &[Value<'_>]) -> Result<Array> {
    match template {
        Array::TextArray(t) => match t {
            crate::TextArray::String32(_) => {
                let mut arr = StringArray::<u32>::default();
                for v in values {
                    match v {
                        Value::Str(s) => arr.push_str(s),
                        Value::Null => arr.push_null(),
                        _ => return Err(schema_mismatch("pool value is not a string")),
                    }
                }
                Ok(Array::from_string32(arr))
            }
            crate::TextArray::String64(_) => {
                let mut arr = StringArray::<u64>::default();
                for v in values {
                    match v {
                        Value::Str(s) => arr.push_str(s),
                        Value::Null => arr.push_null(),
                        _ => return Err(schema_mismatch("pool value is not a string")),
                    }
                }
                Ok(Array::from_string64(arr))
            }
            crate::TextArray::Binary32(_) => {
                let mut arr = BinaryArray::<u32>::default();
                for v in values {
                    match v {
                        Value::Bytes(s) => arr.push_bytes(s),
                        Value::Null => arr.push_null(),
                        _ => return Err(schema_mismatch("pool value is not bytes")),
                    }
                }
                Ok(Array::from_binary32(arr))
            }
            _ => Err(unsupported("pool value type for merge")),
        },
        Array::BooleanArray(_) => {
            let mut arr = BooleanArray::default();
            for v in values {
                match v {
                    Value::Bool(b) => arr.push(*b),
                    Value::Null => arr.push_null(),
                    _ => return Err(schema_mismatch("pool value is not a boolean")),
                }
            }
            Ok(Array::from_boolean(arr))
        }
        Array::NumericArray(_) => {
            macro_rules! build_numeric {
                ($push:ident, $from:ident, $pattern:pat => $expr:expr) => {{
                    let mut arr = PrimitiveArray::with_capacity(values.len(), false);
                    for v in values {
                        match v {
                            $pattern => arr.push($expr),
                            Value::Null => arr.push_null(),
                            _ => return Err(schema_mismatch("pool value type mismatch")),
                        }
                    }
                    Ok(Array::$from(arr))
                }};
            }
            match template.num() {
                NumericArray::Int64(_) => {
                    build_numeric!(push, from_int64, Value::Int(v) => *v)
                }
                NumericArray::Int32(_) => {
                    build_numeric!(push, from_int32, Value::Int(v) => *v as i32)
                }
                NumericArray::UInt64(_) => {
                    build_numeric!(push, from_uint64, Value::UInt(v) => *v)
                }
                NumericArray::UInt32(_) => {
                    build_numeric!(push, from_uint32, Value::UInt(v) => *v as u32)
                }
                NumericArray::Float64(_) => {
                    build_numeric!(push, from_float64, Value::Float(v) => *v)
                }
                NumericArray::Float32(_) => {
                    build_numeric!(push, from_float32, Value::Float(v) => *v as f32)
                }
                _ => Err(unsupported("pool value type for merge")),
            }
        }
        _ => Err(unsupported("pool value type for merge")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arr_str32;

    #[test]
    fn test_first_encoding_is_full() {
        let mut tracker = DictionaryTracker::new();
        let col = arr_str32!["a", "b", "a"];
        let enc = tracker.encode("col1", &col, false).unwrap();
        assert_eq!(enc.id, 0);
        assert_eq!(enc.index, IndexKind::Int8);
        assert!(enc.full.is_some());
        assert!(enc.delta.is_none());
        assert_eq!(enc.array.pool_len(), 2);
        assert_eq!(enc.array.key(2), Some(0));
    }

    #[test]
    fn test_delta_then_idempotent() {
        let mut tracker = DictionaryTracker::new();
        tracker
            .encode("col1", &arr_str32!["a", "b"], false)
            .unwrap();
        // new value => delta with just "c"
        let enc = tracker
            .encode("col1", &arr_str32!["b", "c"], false)
            .unwrap();
        let delta = enc.delta.expect("delta expected");
        assert_eq!(delta.len(), 1);
        assert_eq!(delta.value(0), Value::Str("c"));
        assert_eq!(enc.array.key(0), Some(1));
        assert_eq!(enc.array.key(1), Some(2));
        // same partition again => no delta
        let enc = tracker
            .encode("col1", &arr_str32!["b", "c"], false)
            .unwrap();
        assert!(enc.delta.is_none());
        assert!(enc.full.is_none());
    }

    #[test]
    fn test_ids_are_minted_per_column() {
        let mut tracker = DictionaryTracker::new();
        let a = tracker.encode("a", &arr_str32!["x"], false).unwrap();
        let b = tracker.encode("b", &arr_str32!["x"], false).unwrap();
        assert_eq!(a.id, 0);
        assert_eq!(b.id, 1);
    }

    #[test]
    fn test_index_width_by_cardinality() {
        assert_eq!(choose_index_kind(10), IndexKind::Int8);
        assert_eq!(choose_index_kind(63), IndexKind::Int8);
        assert_eq!(choose_index_kind(64), IndexKind::Int16);
        assert_eq!(choose_index_kind(40_000), IndexKind::Int32);
    }

    #[test]
    fn test_adopt_ref_array() {
        use crate::structs::variants::dictionary::DictionaryArray;
        use std::sync::Arc;

        let mut tracker = DictionaryTracker::new();
        let pool = arr_str32!["x", "y"];
        let dict = DictionaryArray::from_parts(
            NumericArray::Int32(Arc::new(PrimitiveArray::from_slice(&[0, 1, 0]))),
            pool,
            false,
        );
        let enc = tracker.adopt("c", &dict).unwrap();
        assert!(enc.full.is_some());
        // extended pool => delta of the suffix
        let pool2 = arr_str32!["x", "y", "z"];
        let dict2 = DictionaryArray::from_parts(
            NumericArray::Int32(Arc::new(PrimitiveArray::from_slice(&[2]))),
            pool2,
            false,
        );
        let enc = tracker.adopt("c", &dict2).unwrap();
        let delta = enc.delta.expect("delta expected");
        assert_eq!(delta.value(0), Value::Str("z"));
        // mutated pool is rejected
        let dict3 = DictionaryArray::from_parts(
            NumericArray::Int32(Arc::new(PrimitiveArray::from_slice(&[0]))),
            arr_str32!["x", "w", "z"],
            false,
        );
        assert!(tracker.adopt("c", &dict3).is_err());
    }
}
