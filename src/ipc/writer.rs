//! # **Writer Module** - *Tables → IPC Byte Stream/File*
//!
//! Serializes a sequence of schema-compatible table partitions into the
//! IPC stream or file format.
//!
//! ## Shape
//! - [`WriteOptions`] — alignment, compression, dictionary encoding,
//!   layout transforms, task count, custom metadata.
//! - [`TableWriter`] — the sequential core: owns the sink, the dictionary
//!   tracker and the file block lists; emits `Schema` → dictionaries →
//!   record batches, then the stream terminator or file footer on
//!   `finish`.
//! - [`write_partitions`] — the parallel entry point: encodes partitions
//!   on up to `n_tasks` threads, with an [`OrderedGate`] keeping emission
//!   in strict partition order and an [`AbortFlag`] collapsing the
//!   pipeline on first failure.
//! - [`append`] — resumes an existing stream-format sink: re-parses its
//!   schema and dictionary state, truncates the terminator and continues.
//!
//! The per-variant buffer emission mirrors the reader's pre-order walk
//! exactly; every buffer is zero-padded to the configured alignment.

use std::collections::BTreeMap;
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Mutex;
use std::sync::mpsc::sync_channel;

use arrow_format::ipc;

use crate::enums::arrow_type::{ArrowType, UnionMode};
use crate::enums::collections::numeric_array::NumericArray;
use crate::enums::error::{MinstreamError, Result, malformed, schema_mismatch};
use crate::ipc::compression::CompressionCodec;
use crate::ipc::dictionary::{DictionaryTracker, EncodedColumn};
use crate::ipc::envelope::{ARROW_MAGIC, FILE_HEADER, write_message, write_terminator};
use crate::ipc::metadata::{encode_footer, encode_message, schema_to_fb};
use crate::ipc::pipeline::{AbortFlag, EncodedFrame, FrameKind, OrderedGate};
use crate::structs::field::DictionaryEncoding;
use crate::structs::variants::list::ListArray;
use crate::structs::variants::struct_::StructArray;
use crate::utils::{bytes_for_bits, pad_to};
use crate::{Array, Bitmask, Field, FieldArray, Schema, Table, extension};

/// Buffer and message padding.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Alignment {
    #[default]
    Align8,
    Align64,
}

impl Alignment {
    #[inline]
    pub fn as_usize(self) -> usize {
        match self {
            Alignment::Align8 => 8,
            Alignment::Align64 => 64,
        }
    }
}

/// Writer configuration.
#[derive(Clone, Debug)]
pub struct WriteOptions {
    /// Emit magic + footer (file format); otherwise just the stream.
    pub file: bool,
    /// Buffer & message padding.
    pub alignment: Alignment,
    /// Per-buffer compression of record-batch bodies.
    pub compression: Option<CompressionCodec>,
    /// Pool-encode every column.
    pub dictionary_encode: bool,
    /// Propagate pool encoding into nested child arrays.
    pub dictionary_encode_nested: bool,
    /// Convert sparse unions to the dense layout.
    pub dense_unions: bool,
    /// Force 64-bit offsets for list types.
    pub large_lists: bool,
    /// Hard cap on nested-type recursion.
    pub max_depth: usize,
    /// Bound on concurrent encoding tasks (`write_partitions`).
    pub n_tasks: usize,
    /// Schema-level key/value metadata.
    pub metadata: BTreeMap<String, String>,
    /// Per-column key/value metadata, keyed by column name.
    pub col_metadata: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            file: false,
            alignment: Alignment::Align8,
            compression: None,
            dictionary_encode: false,
            dictionary_encode_nested: false,
            dense_unions: false,
            large_lists: false,
            max_depth: 6,
            n_tasks: 1,
            metadata: BTreeMap::new(),
            col_metadata: BTreeMap::new(),
        }
    }
}

impl WriteOptions {
    pub fn file(mut self, yes: bool) -> Self {
        self.file = yes;
        self
    }

    pub fn alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn compression(mut self, codec: Option<CompressionCodec>) -> Self {
        self.compression = codec;
        self
    }

    pub fn dictionary_encode(mut self, yes: bool) -> Self {
        self.dictionary_encode = yes;
        self
    }

    pub fn n_tasks(mut self, n: usize) -> Self {
        self.n_tasks = n;
        self
    }
}

// ---------------------------------------------------------------------
// body serialization
// ---------------------------------------------------------------------

struct BodyBuilder {
    nodes: Vec<ipc::FieldNode>,
    buffers: Vec<ipc::Buffer>,
    body: Vec<u8>,
    offset: i64,
    alignment: usize,
    compression: Option<CompressionCodec>,
}

impl BodyBuilder {
    fn new(alignment: usize, compression: Option<CompressionCodec>) -> Self {
        Self {
            nodes: Vec::new(),
            buffers: Vec::new(),
            body: Vec::new(),
            offset: 0,
            alignment,
            compression,
        }
    }

    /// Appends one buffer: compressed (with the `i64` uncompressed-length
    /// prefix, `-1` when stored raw) when a codec is configured, then
    /// zero-padded to the alignment.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let start = self.body.len();
        debug_assert_eq!(start as i64, self.offset);
        match self.compression {
            Some(codec) if !bytes.is_empty() => {
                let mut encoded = Vec::new();
                codec.compress(bytes, &mut encoded)?;
                if encoded.len() >= bytes.len() {
                    // incompressible: store raw behind the -1 marker
                    self.body.extend_from_slice(&(-1i64).to_le_bytes());
                    self.body.extend_from_slice(bytes);
                } else {
                    self.body
                        .extend_from_slice(&(bytes.len() as i64).to_le_bytes());
                    self.body.extend_from_slice(&encoded);
                }
            }
            _ => self.body.extend_from_slice(bytes),
        }
        self.buffers.push(ipc::Buffer {
            offset: start as i64,
            length: (self.body.len() - start) as i64,
        });
        let padded = pad_to(self.body.len(), self.alignment);
        self.body.resize(padded, 0);
        self.offset = self.body.len() as i64;
        Ok(())
    }

    /// Appends an empty buffer entry (no bytes).
    fn write_empty(&mut self) {
        self.buffers.push(ipc::Buffer {
            offset: self.offset,
            length: 0,
        });
    }

    fn write_slice<T>(&mut self, slice: &[T]) -> Result<()> {
        // little-endian wire == native layout; big-endian is unsupported
        let bytes =
            unsafe { std::slice::from_raw_parts(slice.as_ptr() as *const u8, size_of_val(slice)) };
        self.write_bytes(bytes)
    }

    fn write_validity(&mut self, mask: Option<&Bitmask>, len: usize) -> Result<()> {
        match mask {
            Some(mask) if mask.count_ones() < len => {
                self.write_bytes(&mask.as_bytes()[..bytes_for_bits(len)])
            }
            _ => {
                self.write_empty();
                Ok(())
            }
        }
    }

    fn write_bitmap(&mut self, mask: &Bitmask, len: usize) -> Result<()> {
        self.write_bytes(&mask.as_bytes()[..bytes_for_bits(len)])
    }
}

fn child_dtype<'a>(dtype: &'a ArrowType, idx: usize) -> Result<&'a Field> {
    dtype
        .children()
        .get(idx)
        .ok_or_else(|| schema_mismatch(format!("field type {dtype} has no child {idx}")))
}

/// Emits one array in pre-order: its node, its buffers, then its children.
fn write_array(
    array: &Array,
    dtype: &ArrowType,
    b: &mut BodyBuilder,
    depth: usize,
    max_depth: usize,
) -> Result<()> {
    if depth > max_depth {
        return Err(MinstreamError::MaxDepthExceeded { limit: max_depth });
    }
    let n = array.len();
    b.nodes.push(ipc::FieldNode {
        length: n as i64,
        null_count: array.null_count() as i64,
    });
    match array {
        Array::NullArray(_) | Array::Null => {}
        Array::NumericArray(num) => {
            b.write_validity(array.null_mask(), n)?;
            macro_rules! lanes {
                ($a:expr) => {
                    b.write_slice(&$a.data[..])?
                };
            }
            match num {
                NumericArray::Int8(a) => lanes!(a),
                NumericArray::Int16(a) => lanes!(a),
                NumericArray::Int32(a) => lanes!(a),
                NumericArray::Int64(a) => lanes!(a),
                NumericArray::UInt8(a) => lanes!(a),
                NumericArray::UInt16(a) => lanes!(a),
                NumericArray::UInt32(a) => lanes!(a),
                NumericArray::UInt64(a) => lanes!(a),
                NumericArray::Float16(a) => lanes!(a),
                NumericArray::Float32(a) => lanes!(a),
                NumericArray::Float64(a) => lanes!(a),
                NumericArray::Int128(a) => lanes!(a),
                NumericArray::Null => {}
            }
        }
        Array::BooleanArray(a) => {
            b.write_validity(a.null_mask.as_ref(), n)?;
            b.write_bitmap(&a.data, n)?;
        }
        Array::TextArray(text) => {
            use crate::TextArray;
            match text {
                TextArray::String32(a) => {
                    b.write_validity(a.null_mask.as_ref(), n)?;
                    b.write_slice(&a.offsets[..])?;
                    b.write_bytes(&a.data[..])?;
                }
                TextArray::String64(a) => {
                    b.write_validity(a.null_mask.as_ref(), n)?;
                    b.write_slice(&a.offsets[..])?;
                    b.write_bytes(&a.data[..])?;
                }
                TextArray::Binary32(a) => {
                    b.write_validity(a.null_mask.as_ref(), n)?;
                    b.write_slice(&a.offsets[..])?;
                    b.write_bytes(&a.data[..])?;
                }
                TextArray::Binary64(a) => {
                    b.write_validity(a.null_mask.as_ref(), n)?;
                    b.write_slice(&a.offsets[..])?;
                    b.write_bytes(&a.data[..])?;
                }
                TextArray::FixedBinary(a) => {
                    b.write_validity(a.null_mask.as_ref(), n)?;
                    b.write_bytes(&a.data[..])?;
                }
            }
        }
        Array::List32(a) => {
            b.write_validity(a.null_mask.as_ref(), n)?;
            b.write_slice(&a.offsets[..])?;
            write_array(&a.values, &child_dtype(dtype, 0)?.dtype, b, depth + 1, max_depth)?;
        }
        Array::List64(a) => {
            b.write_validity(a.null_mask.as_ref(), n)?;
            b.write_slice(&a.offsets[..])?;
            write_array(&a.values, &child_dtype(dtype, 0)?.dtype, b, depth + 1, max_depth)?;
        }
        Array::FixedSizeList(a) => {
            b.write_validity(a.null_mask.as_ref(), n)?;
            write_array(&a.values, &child_dtype(dtype, 0)?.dtype, b, depth + 1, max_depth)?;
        }
        Array::Struct(a) => {
            b.write_validity(a.null_mask.as_ref(), n)?;
            let children = dtype.children();
            if children.len() != a.children.len() {
                return Err(schema_mismatch(format!(
                    "struct field lists {} children, array holds {}",
                    children.len(),
                    a.children.len()
                )));
            }
            for (child, field) in a.children.iter().zip(children) {
                write_array(child, &field.dtype, b, depth + 1, max_depth)?;
            }
        }
        Array::Map(a) => {
            b.write_validity(a.null_mask.as_ref(), n)?;
            b.write_slice(&a.offsets[..])?;
            write_array(&a.entries, &child_dtype(dtype, 0)?.dtype, b, depth + 1, max_depth)?;
        }
        Array::Union(a) => {
            b.write_slice(&a.type_ids[..])?;
            if a.mode == UnionMode::Dense {
                let offsets = a
                    .offsets
                    .as_ref()
                    .ok_or_else(|| malformed("dense union without offsets"))?;
                b.write_slice(&offsets[..])?;
            }
            let children = dtype.children();
            if children.len() != a.children.len() {
                return Err(schema_mismatch("union child count mismatch"));
            }
            for (child, field) in a.children.iter().zip(children) {
                write_array(child, &field.dtype, b, depth + 1, max_depth)?;
            }
        }
        Array::Dictionary(a) => {
            if !matches!(dtype, ArrowType::Dictionary(_, _)) {
                return Err(schema_mismatch(
                    "dictionary-encoded array under a field without a dictionary descriptor",
                ));
            }
            b.write_validity(a.indices.null_mask(), n)?;
            macro_rules! lanes {
                ($a:expr) => {
                    b.write_slice(&$a.data[..])?
                };
            }
            match &a.indices {
                NumericArray::Int8(a) => lanes!(a),
                NumericArray::Int16(a) => lanes!(a),
                NumericArray::Int32(a) => lanes!(a),
                NumericArray::Int64(a) => lanes!(a),
                NumericArray::UInt8(a) => lanes!(a),
                NumericArray::UInt16(a) => lanes!(a),
                NumericArray::UInt32(a) => lanes!(a),
                NumericArray::UInt64(a) => lanes!(a),
                other => {
                    return Err(malformed(format!(
                        "dictionary indices must be integers, got {:?}",
                        other.arrow_type()
                    )));
                }
            }
        }
    }
    Ok(())
}

fn body_compression_fb(codec: Option<CompressionCodec>) -> Option<Box<ipc::BodyCompression>> {
    codec.map(|codec| {
        Box::new(ipc::BodyCompression {
            codec: codec.to_fb(),
            method: ipc::BodyCompressionMethod::Buffer,
        })
    })
}

fn encode_record_batch(cols: &[FieldArray], n_rows: usize, options: &WriteOptions) -> Result<EncodedFrame> {
    let mut b = BodyBuilder::new(options.alignment.as_usize(), options.compression);
    for col in cols {
        write_array(&col.array, &col.field.dtype, &mut b, 1, options.max_depth)?;
    }
    let batch = ipc::RecordBatch {
        length: n_rows as i64,
        nodes: Some(b.nodes),
        buffers: Some(b.buffers),
        compression: body_compression_fb(options.compression),
    };
    let metadata = encode_message(
        ipc::MessageHeader::RecordBatch(Box::new(batch)),
        b.body.len() as i64,
    );
    Ok(EncodedFrame {
        kind: FrameKind::Record,
        metadata,
        body: b.body,
    })
}

fn encode_dictionary_batch(
    id: i64,
    values: &Array,
    value_dtype: &ArrowType,
    is_delta: bool,
    options: &WriteOptions,
) -> Result<EncodedFrame> {
    let mut b = BodyBuilder::new(options.alignment.as_usize(), options.compression);
    write_array(values, value_dtype, &mut b, 1, options.max_depth)?;
    let batch = ipc::RecordBatch {
        length: values.len() as i64,
        nodes: Some(b.nodes),
        buffers: Some(b.buffers),
        compression: body_compression_fb(options.compression),
    };
    let dictionary = ipc::DictionaryBatch {
        id,
        data: Some(Box::new(batch)),
        is_delta,
    };
    let metadata = encode_message(
        ipc::MessageHeader::DictionaryBatch(Box::new(dictionary)),
        b.body.len() as i64,
    );
    Ok(EncodedFrame {
        kind: FrameKind::Dictionary,
        metadata,
        body: b.body,
    })
}

// ---------------------------------------------------------------------
// partition transforms
// ---------------------------------------------------------------------

/// One column after transforms, plus its pending dictionary messages.
struct ColumnPlan {
    field: Field,
    array: Array,
    dict_messages: Vec<(i64, Array, ArrowType, bool)>,
}

/// Shared writer state: the schema fixed by partition 1 and the
/// dictionary tracker. Guarded by a mutex on the parallel path.
#[derive(Default)]
pub(crate) struct WriterShared {
    schema: Option<Schema>,
    tracker: DictionaryTracker,
}

fn promote_list(array: &Array) -> Array {
    match array {
        Array::List32(a) => {
            let offsets: crate::Vec64<u64> =
                a.offsets.as_slice().iter().map(|v| *v as u64).collect();
            Array::from_list64(ListArray::<u64> {
                offsets: offsets.into(),
                values: a.values.clone(),
                null_mask: a.null_mask.clone(),
            })
        }
        other => other.clone(),
    }
}

fn promote_list_dtype(dtype: &ArrowType) -> ArrowType {
    match dtype {
        ArrowType::List(child) => ArrowType::LargeList(child.clone()),
        other => other.clone(),
    }
}

/// Recursively pool-encodes string children of lists and structs.
fn encode_nested_dicts(
    path: &str,
    array: &Array,
    field: &Field,
    tracker: &mut DictionaryTracker,
    out: &mut Vec<(i64, Array, ArrowType, bool)>,
) -> Result<(Array, Field)> {
    match (array, &field.dtype) {
        (Array::TextArray(_), value_dtype) => {
            let enc = tracker.encode(path, array, false)?;
            let mut new_field = field.clone();
            new_field.dtype = ArrowType::Dictionary(enc.index, Box::new(value_dtype.clone()));
            new_field.dictionary = Some(DictionaryEncoding {
                id: enc.id,
                index: enc.index,
                ordered: false,
            });
            push_dict_messages(&enc, value_dtype, out);
            Ok((Array::Dictionary(std::sync::Arc::new(enc.array)), new_field))
        }
        (Array::List32(a), ArrowType::List(child)) => {
            let (values, new_child) =
                encode_nested_dicts(&format!("{path}.item"), &a.values, child, tracker, out)?;
            let mut new_field = field.clone();
            new_field.dtype = ArrowType::List(Box::new(new_child));
            Ok((
                Array::from_list32(ListArray::<u32> {
                    offsets: a.offsets.clone(),
                    values,
                    null_mask: a.null_mask.clone(),
                }),
                new_field,
            ))
        }
        (Array::Struct(a), ArrowType::Struct(children)) => {
            let mut new_children = Vec::with_capacity(a.children.len());
            let mut new_fields = Vec::with_capacity(children.len());
            for (child_array, child_field) in a.children.iter().zip(children) {
                let (arr, fld) = encode_nested_dicts(
                    &format!("{path}.{}", child_field.name),
                    child_array,
                    child_field,
                    tracker,
                    out,
                )?;
                new_children.push(arr);
                new_fields.push(fld);
            }
            let mut new_field = field.clone();
            new_field.dtype = ArrowType::Struct(new_fields);
            Ok((
                Array::Struct(std::sync::Arc::new(StructArray {
                    children: new_children,
                    len: a.len,
                    null_mask: a.null_mask.clone(),
                })),
                new_field,
            ))
        }
        _ => Ok((array.clone(), field.clone())),
    }
}

fn push_dict_messages(
    enc: &EncodedColumn,
    value_dtype: &ArrowType,
    out: &mut Vec<(i64, Array, ArrowType, bool)>,
) {
    if let Some(full) = &enc.full {
        out.push((enc.id, full.clone(), value_dtype.clone(), false));
    }
    if let Some(delta) = &enc.delta {
        out.push((enc.id, delta.clone(), value_dtype.clone(), true));
    }
}

/// Applies the configured transforms to one column.
fn plan_column(
    col: &FieldArray,
    options: &WriteOptions,
    tracker: &mut DictionaryTracker,
) -> Result<ColumnPlan> {
    let mut field = (*col.field).clone();
    if let Some(extra) = options.col_metadata.get(&field.name) {
        field
            .metadata
            .extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    let mut array = col.array.clone();

    // registered extension encode hooks swap the physical representation
    if let Some(name) = field.extension_name() {
        if let Some(ext) = extension::lookup_extension(name) {
            if let Some(encode) = ext.encode {
                array = encode(&array);
            }
        }
    }

    if options.large_lists {
        if let Array::List32(_) = &array {
            array = promote_list(&array);
            field.dtype = promote_list_dtype(&field.dtype);
        }
    }

    if options.dense_unions {
        if let Array::Union(u) = &array {
            if u.mode == UnionMode::Sparse {
                array = Array::from_union(u.to_dense()?);
                if let ArrowType::Union { mode, .. } = &mut field.dtype {
                    *mode = UnionMode::Dense;
                }
            }
        }
    }

    let mut dict_messages = Vec::new();

    let wants_dict = options.dictionary_encode || matches!(array, Array::Dictionary(_));
    if wants_dict && !field.dtype.is_nested() && !matches!(field.dtype, ArrowType::Null) {
        let value_dtype = match &field.dtype {
            ArrowType::Dictionary(_, values) => values.as_ref().clone(),
            other => other.clone(),
        };
        let enc = tracker.encode(&field.name, &array, false)?;
        push_dict_messages(&enc, &value_dtype, &mut dict_messages);
        field.dictionary = Some(DictionaryEncoding {
            id: enc.id,
            index: enc.index,
            ordered: enc.array.ordered,
        });
        field.dtype = ArrowType::Dictionary(enc.index, Box::new(value_dtype));
        array = Array::Dictionary(std::sync::Arc::new(enc.array));
    } else if options.dictionary_encode_nested && field.dtype.is_nested() {
        let (new_array, new_field) =
            encode_nested_dicts(&field.name, &array, &field, tracker, &mut dict_messages)?;
        array = new_array;
        field = new_field;
    }

    field.nullable = field.nullable || array.is_nullable();
    Ok(ColumnPlan {
        field,
        array,
        dict_messages,
    })
}

fn partition_schema(plans: &[ColumnPlan], table: &Table, options: &WriteOptions) -> Schema {
    let mut schema_metadata = table.metadata.clone();
    schema_metadata.extend(options.metadata.iter().map(|(k, v)| (k.clone(), v.clone())));
    Schema::new(plans.iter().map(|p| p.field.clone()).collect()).with_metadata(schema_metadata)
}

/// Emits the schema frame on first use, or checks later partitions
/// against the fixed schema.
fn reconcile_schema(
    schema: Schema,
    table_name: &str,
    shared: &mut WriterShared,
    frames: &mut Vec<EncodedFrame>,
) -> Result<()> {
    match &shared.schema {
        None => {
            let fb = schema_to_fb(&schema)?;
            frames.push(EncodedFrame {
                kind: FrameKind::Schema,
                metadata: encode_message(ipc::MessageHeader::Schema(Box::new(fb)), 0),
                body: Vec::new(),
            });
            shared.schema = Some(schema);
            Ok(())
        }
        Some(existing) => {
            if !existing.equivalent(&schema) {
                return Err(schema_mismatch(format!(
                    "partition '{}' does not match the stream schema",
                    table_name
                )));
            }
            Ok(())
        }
    }
}

/// Encodes one partition into its ordered frame list (schema frame first
/// when this is the stream's first partition).
fn encode_partition(
    table: &Table,
    options: &WriteOptions,
    shared: &mut WriterShared,
) -> Result<Vec<EncodedFrame>> {
    let plans = table
        .cols
        .iter()
        .map(|col| plan_column(col, options, &mut shared.tracker))
        .collect::<Result<Vec<_>>>()?;

    let schema = partition_schema(&plans, table, options);
    let mut frames = Vec::new();
    reconcile_schema(schema, &table.name, shared, &mut frames)?;

    for plan in &plans {
        for (id, values, value_dtype, is_delta) in &plan.dict_messages {
            frames.push(encode_dictionary_batch(
                *id, values, value_dtype, *is_delta, options,
            )?);
        }
    }

    let cols: Vec<FieldArray> = plans
        .into_iter()
        .map(|p| FieldArray::new(p.field, p.array))
        .collect();
    frames.push(encode_record_batch(&cols, table.n_rows, options)?);
    Ok(frames)
}

/// Work a parallel encoding task can finish before its turn at the gate.
enum Prepared {
    /// Dictionary state is involved: the whole encode runs inside the
    /// gate so pool identity stays sequential.
    NeedsShared(Table),
    /// No dictionary involvement: the record batch (including
    /// compression) is already encoded; only the schema handshake remains.
    Ready {
        schema: Schema,
        table_name: String,
        record: EncodedFrame,
    },
}

fn prepare_partition(table: Table, options: &WriteOptions) -> Result<Prepared> {
    let needs_shared = options.dictionary_encode
        || options.dictionary_encode_nested
        || table
            .cols
            .iter()
            .any(|c| matches!(c.array, Array::Dictionary(_)));
    if needs_shared {
        return Ok(Prepared::NeedsShared(table));
    }
    let mut throwaway = DictionaryTracker::new();
    let plans = table
        .cols
        .iter()
        .map(|col| plan_column(col, options, &mut throwaway))
        .collect::<Result<Vec<_>>>()?;
    let schema = partition_schema(&plans, &table, options);
    let cols: Vec<FieldArray> = plans
        .into_iter()
        .map(|p| FieldArray::new(p.field, p.array))
        .collect();
    let record = encode_record_batch(&cols, table.n_rows, options)?;
    Ok(Prepared::Ready {
        schema,
        table_name: table.name,
        record,
    })
}

fn finalize_partition(
    prepared: Prepared,
    options: &WriteOptions,
    shared: &mut WriterShared,
) -> Result<Vec<EncodedFrame>> {
    match prepared {
        Prepared::NeedsShared(table) => encode_partition(&table, options, shared),
        Prepared::Ready {
            schema,
            table_name,
            record,
        } => {
            let mut frames = Vec::new();
            reconcile_schema(schema, &table_name, shared, &mut frames)?;
            frames.push(record);
            Ok(frames)
        }
    }
}

// ---------------------------------------------------------------------
// frame sink
// ---------------------------------------------------------------------

/// Owns the destination and the file-format bookkeeping. All byte writes
/// funnel through here, on exactly one thread at a time.
struct FrameSink<W: Write> {
    sink: W,
    file: bool,
    position: i64,
    dictionary_blocks: Vec<ipc::Block>,
    record_blocks: Vec<ipc::Block>,
    started: bool,
}

impl<W: Write> FrameSink<W> {
    fn new(sink: W, file: bool) -> Self {
        Self {
            sink,
            file,
            position: 0,
            dictionary_blocks: Vec::new(),
            record_blocks: Vec::new(),
            started: false,
        }
    }

    /// Resumes at a byte position inside an existing stream (append).
    fn resume(sink: W, position: i64) -> Self {
        Self {
            sink,
            file: false,
            position,
            dictionary_blocks: Vec::new(),
            record_blocks: Vec::new(),
            started: true,
        }
    }

    fn write_frame(&mut self, frame: &EncodedFrame) -> Result<()> {
        if !self.started {
            if self.file {
                self.sink.write_all(&FILE_HEADER)?;
                self.position = FILE_HEADER.len() as i64;
            }
            self.started = true;
        }
        let offset = self.position;
        let written = write_message(&mut self.sink, &frame.metadata, &frame.body)?;
        self.position += written as i64;
        let block = ipc::Block {
            offset,
            meta_data_length: (written - frame.body.len()) as i32,
            body_length: frame.body.len() as i64,
        };
        match frame.kind {
            FrameKind::Schema => {}
            FrameKind::Dictionary => self.dictionary_blocks.push(block),
            FrameKind::Record => self.record_blocks.push(block),
        }
        Ok(())
    }

    /// Terminates the stream (or writes the footer) and hands back the
    /// sink.
    fn finish(mut self, schema: &Schema) -> Result<W> {
        if !self.started && self.file {
            self.sink.write_all(&FILE_HEADER)?;
            self.position = FILE_HEADER.len() as i64;
            self.started = true;
        }
        if self.file {
            // a terminator before the footer keeps stream readers happy
            self.position += write_terminator(&mut self.sink)? as i64;
            let footer = encode_footer(
                schema,
                std::mem::take(&mut self.dictionary_blocks),
                std::mem::take(&mut self.record_blocks),
            )?;
            self.sink.write_all(&footer)?;
            self.sink.write_all(&(footer.len() as i32).to_le_bytes())?;
            self.sink.write_all(&ARROW_MAGIC)?;
        } else {
            write_terminator(&mut self.sink)?;
        }
        self.sink.flush()?;
        Ok(self.sink)
    }
}

// ---------------------------------------------------------------------
// writers
// ---------------------------------------------------------------------

/// # TableWriter
///
/// Sequential writer core. Partitions are written with [`write`]; the
/// first fixes the schema and dictionary ids, later ones must match.
/// [`finish`] seals the stream or file.
///
/// [`write`]: TableWriter::write
/// [`finish`]: TableWriter::finish
pub struct TableWriter<W: Write> {
    sink: FrameSink<W>,
    options: WriteOptions,
    shared: WriterShared,
}

impl<W: Write> TableWriter<W> {
    pub fn new(sink: W, options: WriteOptions) -> Self {
        let file = options.file;
        Self {
            sink: FrameSink::new(sink, file),
            options,
            shared: WriterShared::default(),
        }
    }

    /// The schema fixed by the first partition, if any was written yet.
    pub fn schema(&self) -> Option<&Schema> {
        self.shared.schema.as_ref()
    }

    /// Writes one partition: schema (first time) → dictionary deltas →
    /// record batch.
    pub fn write(&mut self, table: &Table) -> Result<()> {
        let frames = encode_partition(table, &self.options, &mut self.shared)?;
        for frame in &frames {
            self.sink.write_frame(frame)?;
        }
        Ok(())
    }

    /// Seals the stream (terminator) or file (footer + magic) and returns
    /// the sink.
    pub fn finish(self) -> Result<W> {
        let schema = self.shared.schema.unwrap_or_default();
        self.sink.finish(&schema)
    }
}

/// Writes a full partition sequence with up to `options.n_tasks` parallel
/// encoding tasks and strictly ordered emission, then seals the sink.
///
/// Partition 1 is always encoded on the calling thread so the schema and
/// initial dictionaries land first. On any task failure the pipeline
/// aborts and the first error surfaces as `WriteAborted`; the sink's byte
/// position is then undefined.
pub fn write_partitions<W, I>(sink: W, partitions: I, options: WriteOptions) -> Result<W>
where
    W: Write + Send,
    I: IntoIterator<Item = Table>,
    I::IntoIter: Send,
{
    if options.n_tasks <= 1 {
        let mut writer = TableWriter::new(sink, options);
        for table in partitions {
            writer.write(&table)?;
        }
        return writer.finish();
    }

    let shared = Mutex::new(WriterShared::default());
    let gate = OrderedGate::new(1);
    let abort = AbortFlag::new();
    let queue = Mutex::new(partitions.into_iter().enumerate());
    let (tx, rx) = sync_channel::<(usize, Vec<EncodedFrame>)>(options.n_tasks * 2);
    let frame_sink = FrameSink::new(sink, options.file);

    // Processes one partition: heavy array materialisation and (for
    // non-dictionary schemas) the full record-batch encode run before the
    // gate; the shared tracker and schema handshake run inside it so pool
    // identity stays deterministic. Returns false when the queue is dry.
    let process_next = |tx: &std::sync::mpsc::SyncSender<(usize, Vec<EncodedFrame>)>| -> bool {
        let next = {
            let mut queue = queue.lock().expect("partition queue poisoned");
            queue.next()
        };
        let Some((idx, table)) = next else {
            return false;
        };
        let turn = idx + 1;
        if abort.is_aborted() {
            gate.wait_turn(turn);
            gate.advance();
            return true;
        }
        let prepared = prepare_partition(table, &options);
        gate.wait_turn(turn);
        let outcome = prepared.and_then(|prepared| {
            let mut shared = shared.lock().expect("writer state poisoned");
            finalize_partition(prepared, &options, &mut shared)
        });
        match outcome {
            Ok(frames) => {
                if tx.send((turn, frames)).is_err() {
                    abort.abort(turn, &malformed("drain task exited early"));
                }
            }
            Err(e) => abort.abort(turn, &e),
        }
        gate.advance();
        true
    };

    let sink = std::thread::scope(|scope| {
        let drain = scope.spawn(|| {
            let mut frame_sink = frame_sink;
            for (turn, frames) in rx {
                if abort.is_aborted() {
                    continue;
                }
                for frame in &frames {
                    if let Err(e) = frame_sink.write_frame(frame) {
                        abort.abort(turn, &e);
                        break;
                    }
                }
            }
            frame_sink
        });

        // partition 1 always encodes on the calling thread so the schema
        // and initial dictionaries are emitted first
        let more = process_next(&tx);
        if more {
            let process_next = &process_next;
            for _ in 1..options.n_tasks {
                let tx = tx.clone();
                scope.spawn(move || while process_next(&tx) {});
            }
            while process_next(&tx) {}
        }
        drop(tx);

        drain.join().expect("drain task panicked")
    });

    if let Some(err) = abort.take_error() {
        return Err(err);
    }
    let schema = shared
        .into_inner()
        .expect("writer state poisoned")
        .schema
        .unwrap_or_default();
    sink.finish(&schema)
}

// ---------------------------------------------------------------------
// append
// ---------------------------------------------------------------------

/// Appends partitions to an existing stream-format sink.
///
/// Re-parses the existing content to recover the schema and dictionary
/// pools, rejects file-format sinks, verifies schema equivalence (names
/// and element types, nullability stripped), truncates the end-of-stream
/// terminator and resumes writing. Dictionary-encoded columns keep their
/// pool ids; only genuinely new values travel as deltas.
pub fn append<F, I>(sink: &mut F, partitions: I, options: WriteOptions) -> Result<()>
where
    F: Read + Write + Seek,
    I: IntoIterator<Item = Table>,
{
    if options.file {
        return Err(malformed("append targets stream-format sinks only"));
    }
    sink.seek(SeekFrom::Start(0))?;
    let mut existing = Vec::new();
    sink.read_to_end(&mut existing)?;

    if existing.is_empty() {
        let mut writer = TableWriter::new(&mut *sink, options);
        for table in partitions {
            writer.write(&table)?;
        }
        writer.finish()?;
        return Ok(());
    }

    let region = crate::SharedBuffer::from_vec(existing);
    if crate::ipc::envelope::is_file_format(&region) {
        return Err(malformed("cannot append to a file-format region"));
    }

    let (resume_at, schema, dictionaries) = crate::ipc::reader::scan_stream_state(region)?;

    let mut shared = WriterShared {
        schema: Some(schema.clone()),
        tracker: DictionaryTracker::new(),
    };
    for field in &schema.fields {
        if let Some(encoding) = &field.dictionary {
            let values = dictionaries.get(&encoding.id).ok_or_else(|| {
                malformed(format!(
                    "stream schema references dictionary {} with no dictionary batch",
                    encoding.id
                ))
            })?;
            shared
                .tracker
                .seed(encoding.id, values.clone(), encoding.ordered)?;
            shared.tracker.bind_column(&field.name, encoding.id);
        }
    }

    sink.seek(SeekFrom::Start(resume_at as u64))?;
    let mut frame_sink = FrameSink::resume(&mut *sink, resume_at as i64);
    for table in partitions {
        let frames = encode_partition(&table, &options, &mut shared)?;
        for frame in &frames {
            frame_sink.write_frame(frame)?;
        }
    }
    frame_sink.finish(shared.schema.as_ref().expect("schema set"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::reader::read_table;
    use crate::{PrimitiveArray, arr_i64};

    fn one_col(values: &[i64]) -> Table {
        Table::from_cols(vec![FieldArray::from_arr(
            "col1",
            Array::from_int64(PrimitiveArray::from_slice(values)),
        )])
    }

    #[test]
    fn test_schema_emitted_once() {
        let mut writer = TableWriter::new(Vec::new(), WriteOptions::default());
        writer.write(&one_col(&[1, 2])).unwrap();
        writer.write(&one_col(&[3])).unwrap();
        let bytes = writer.finish().unwrap();
        let table = read_table(bytes).unwrap();
        assert_eq!(table.n_rows(), 3);
    }

    #[test]
    fn test_partition_schema_mismatch() {
        let mut writer = TableWriter::new(Vec::new(), WriteOptions::default());
        writer.write(&one_col(&[1])).unwrap();
        let other = Table::from_cols(vec![FieldArray::from_arr("other", arr_i64![1])]);
        assert!(matches!(
            writer.write(&other),
            Err(MinstreamError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_alignment_of_buffers() {
        for (alignment, modulo) in [(Alignment::Align8, 8usize), (Alignment::Align64, 64)] {
            let options = WriteOptions::default().alignment(alignment);
            let cols = vec![FieldArray::from_arr(
                "c",
                Array::from_int64(PrimitiveArray::from_slice(&[1, 2, 3])),
            )];
            let frame = encode_record_batch(&cols, 3, &options).unwrap();
            // decode the batch metadata and check every buffer offset
            let message = crate::ipc::metadata::decode_message(&frame.metadata).unwrap();
            match message.header().unwrap().unwrap() {
                ipc::MessageHeaderRef::RecordBatch(batch) => {
                    for buffer in batch.buffers().unwrap().unwrap().iter() {
                        assert_eq!(buffer.offset() as usize % modulo, 0);
                    }
                }
                _ => panic!("expected record batch"),
            }
        }
    }

    #[test]
    fn test_max_depth_enforced() {
        // nest lists beyond the cap
        let mut array = Array::from_int64(PrimitiveArray::from_slice(&[1]));
        let mut dtype = ArrowType::Int64;
        for _ in 0..7 {
            array = Array::from_list32(ListArray::<u32>::from_lengths(&[1], array, None));
            dtype = ArrowType::List(Box::new(Field::new("item", dtype, false, None)));
        }
        let col = FieldArray::new(Field::new("deep", dtype, false, None), array);
        let table = Table::from_cols(vec![col]);
        let mut writer = TableWriter::new(Vec::new(), WriteOptions::default());
        assert!(matches!(
            writer.write(&table),
            Err(MinstreamError::MaxDepthExceeded { .. })
        ));
    }
}
