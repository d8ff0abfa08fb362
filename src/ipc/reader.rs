//! # **Reader Module** - *IPC Byte Region → Tables*
//!
//! Parses a stream- or file-format byte region into `Table`s, zero-copy
//! wherever the layout allows.
//!
//! ## Modes
//! - [`read_table`] — eager: consumes the whole region, concatenating
//!   equal-schema record batches into single logical columns.
//! - [`TableStream`] — lazy: yields one `Table` per record batch, each a
//!   set of views into that batch's body bytes.
//! - [`read_table_multi`] — reader-level concatenation of independent
//!   inputs with equivalent schemas (`SchemaMismatch` otherwise).
//! - [`read_file`] — footer-driven file-format path.
//!
//! ## Algorithm
//! A record batch is reconstructed by walking the schema's fields in
//! pre-order while consuming `FieldNode`s and `Buffer`s from mutable
//! cursors, exactly mirroring the writer's emission order. Compressed
//! bodies inflate buffer-wise into owned memory first; everything else
//! stays borrowed from the input region.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use arrow_format::ipc;

use crate::enums::arrow_type::{ArrowType, IndexKind, UnionMode};
use crate::enums::collections::numeric_array::NumericArray;
use crate::enums::error::{MinstreamError, Result, malformed, schema_mismatch, unsupported};
use crate::ipc::compression::CompressionCodec;
use crate::ipc::dictionary::{array_from_values, build_indices, choose_index_kind, value_key};
use crate::ipc::envelope::{ARROW_MAGIC, EnvelopeCursor, FILE_HEADER, is_file_format};
use crate::ipc::metadata::{decode_footer, decode_message, fb_to_schema};
use crate::structs::shared_buffer::SharedBuffer;
use crate::structs::variants::binary::{BinaryArray, FixedSizeBinaryArray};
use crate::structs::variants::dictionary::DictionaryArray;
use crate::structs::variants::fixed_size_list::FixedSizeListArray;
use crate::structs::variants::list::ListArray;
use crate::structs::variants::map::MapArray;
use crate::structs::variants::struct_::StructArray;
use crate::structs::variants::union::UnionArray;
use crate::utils::bytes_for_bits;
use crate::{
    Array, Bitmask, BooleanArray, Buffer, Field, FieldArray, PrimitiveArray, Schema, StringArray,
    Table, extension,
};

/// Recursion cap for nested types, matching the writer default.
pub const DEFAULT_MAX_DEPTH: usize = 6;

/// Pools decoded from dictionary batches, keyed by id.
pub type Dictionaries = HashMap<i64, Array>;

// ---------------------------------------------------------------------
// body cursor
// ---------------------------------------------------------------------

struct BodyCursor<'a> {
    nodes: VecDeque<ipc::FieldNodeRef<'a>>,
    buffers: VecDeque<ipc::BufferRef<'a>>,
    body: SharedBuffer,
    compression: Option<CompressionCodec>,
}

impl<'a> BodyCursor<'a> {
    fn new(
        batch: ipc::RecordBatchRef<'a>,
        body: SharedBuffer,
        compression: Option<CompressionCodec>,
    ) -> Result<Self> {
        let nodes = batch
            .nodes()?
            .ok_or_else(|| malformed("record batch without field nodes"))?
            .iter()
            .collect();
        let buffers = batch
            .buffers()?
            .ok_or_else(|| malformed("record batch without buffers"))?
            .iter()
            .collect();
        Ok(Self {
            nodes,
            buffers,
            body,
            compression,
        })
    }

    fn next_node(&mut self) -> Result<ipc::FieldNodeRef<'a>> {
        self.nodes
            .pop_front()
            .ok_or_else(|| malformed("too few field nodes in record batch"))
    }

    /// Resolves the next buffer entry into bytes, inflating when the body
    /// is compressed.
    fn next_buffer(&mut self) -> Result<SharedBuffer> {
        let buffer = self
            .buffers
            .pop_front()
            .ok_or_else(|| malformed("too few buffers in record batch"))?;
        let offset = buffer.offset();
        let length = buffer.length();
        if offset < 0 || length < 0 {
            return Err(malformed(format!(
                "negative buffer extent ({offset}, {length})"
            )));
        }
        if offset % 8 != 0 {
            return Err(malformed(format!("misaligned buffer offset {offset}")));
        }
        let (offset, length) = (offset as usize, length as usize);
        if offset + length > self.body.len() {
            return Err(malformed(format!(
                "buffer [{offset}, {length}] overruns body of {}",
                self.body.len()
            )));
        }
        let raw = self.body.slice(offset..offset + length);
        match self.compression {
            None => Ok(raw),
            Some(codec) => {
                if length == 0 {
                    return Ok(raw);
                }
                if length < 8 {
                    return Err(malformed("compressed buffer shorter than its length prefix"));
                }
                let bytes = raw.as_slice();
                let prefix = i64::from_le_bytes(bytes[..8].try_into().expect("8-byte window"));
                if prefix == -1 {
                    // stored uncompressed
                    Ok(raw.slice(8..raw.len()))
                } else if prefix < 0 {
                    Err(malformed(format!("negative uncompressed length {prefix}")))
                } else {
                    let inflated = codec.decompress(&bytes[8..], prefix as usize)?;
                    Ok(SharedBuffer::from_vec(inflated))
                }
            }
        }
    }
}

// ---------------------------------------------------------------------
// array reconstruction
// ---------------------------------------------------------------------

fn read_validity(
    cursor: &mut BodyCursor<'_>,
    length: usize,
    null_count: i64,
) -> Result<Option<Bitmask>> {
    let buffer = cursor.next_buffer()?;
    if null_count == 0 {
        return Ok(None);
    }
    if buffer.len() < bytes_for_bits(length) {
        return Err(malformed(format!(
            "validity bitmap of {} bytes cannot cover {length} elements",
            buffer.len()
        )));
    }
    Ok(Some(Bitmask::from_shared(buffer, length)))
}

fn primitive_width_checked(region: &SharedBuffer, n: usize, width: usize) -> Result<()> {
    if region.len() < n * width {
        return Err(malformed(format!(
            "values buffer of {} bytes cannot cover {n} × {width}-byte elements",
            region.len()
        )));
    }
    Ok(())
}

/// Builds a fixed-width array from a values region, tagged per the logical
/// type's physical lane.
fn read_primitive(
    dtype: &ArrowType,
    region: SharedBuffer,
    n: usize,
    null_mask: Option<Bitmask>,
) -> Result<Array> {
    macro_rules! lanes {
        ($ty:ty, $from:ident) => {{
            primitive_width_checked(&region, n, std::mem::size_of::<$ty>())?;
            let sized = region.slice(0..n * std::mem::size_of::<$ty>());
            Array::$from(PrimitiveArray::<$ty>::from_shared(sized, n, null_mask))
        }};
    }
    Ok(match dtype {
        ArrowType::Int8 => lanes!(i8, from_int8),
        ArrowType::Int16 => lanes!(i16, from_int16),
        ArrowType::Int32 | ArrowType::Date32 | ArrowType::Time32(_) => lanes!(i32, from_int32),
        ArrowType::Interval(crate::IntervalUnit::YearMonth) => lanes!(i32, from_int32),
        ArrowType::Int64
        | ArrowType::Date64
        | ArrowType::Time64(_)
        | ArrowType::Timestamp(_, _)
        | ArrowType::Duration(_) => lanes!(i64, from_int64),
        ArrowType::Interval(crate::IntervalUnit::DayTime) => lanes!(i64, from_int64),
        ArrowType::UInt8 => lanes!(u8, from_uint8),
        ArrowType::UInt16 => lanes!(u16, from_uint16),
        ArrowType::UInt32 => lanes!(u32, from_uint32),
        ArrowType::UInt64 => lanes!(u64, from_uint64),
        ArrowType::Float16 => lanes!(u16, from_float16_bits),
        ArrowType::Float32 => lanes!(f32, from_float32),
        ArrowType::Float64 => lanes!(f64, from_float64),
        ArrowType::Decimal {
            bit_width: 128, ..
        } => lanes!(i128, from_int128),
        other => return Err(unsupported(format!("primitive read of {other}"))),
    })
}

fn read_offsets<O: crate::Integer + Copy>(
    cursor: &mut BodyCursor<'_>,
    n: usize,
) -> Result<Buffer<O>> {
    let region = cursor.next_buffer()?;
    let width = std::mem::size_of::<O>();
    if region.len() < (n + 1) * width {
        return Err(malformed(format!(
            "offsets buffer of {} bytes cannot cover {} entries",
            region.len(),
            n + 1
        )));
    }
    Ok(Buffer::from_shared(region.slice(0..(n + 1) * width)))
}

fn dictionary_index_array(
    kind: IndexKind,
    cursor: &mut BodyCursor<'_>,
    n: usize,
    null_mask: Option<Bitmask>,
) -> Result<NumericArray> {
    let region = cursor.next_buffer()?;
    macro_rules! lanes {
        ($ty:ty, $variant:ident) => {{
            primitive_width_checked(&region, n, std::mem::size_of::<$ty>())?;
            let sized = region.slice(0..n * std::mem::size_of::<$ty>());
            NumericArray::$variant(Arc::new(PrimitiveArray::<$ty>::from_shared(
                sized, n, null_mask,
            )))
        }};
    }
    Ok(match kind {
        IndexKind::Int8 => lanes!(i8, Int8),
        IndexKind::Int16 => lanes!(i16, Int16),
        IndexKind::Int32 => lanes!(i32, Int32),
        IndexKind::Int64 => lanes!(i64, Int64),
        IndexKind::UInt8 => lanes!(u8, UInt8),
        IndexKind::UInt16 => lanes!(u16, UInt16),
        IndexKind::UInt32 => lanes!(u32, UInt32),
        IndexKind::UInt64 => lanes!(u64, UInt64),
    })
}

fn build_array(
    field: &Field,
    cursor: &mut BodyCursor<'_>,
    dictionaries: &Dictionaries,
    depth: usize,
) -> Result<Array> {
    if depth > DEFAULT_MAX_DEPTH {
        return Err(MinstreamError::MaxDepthExceeded {
            limit: DEFAULT_MAX_DEPTH,
        });
    }
    let node = cursor.next_node()?;
    let n = node.length();
    if n < 0 {
        return Err(malformed(format!("negative field node length {n}")));
    }
    let n = n as usize;
    let null_count = node.null_count();

    let array = match &field.dtype {
        ArrowType::Null => Array::NullArray(n),
        ArrowType::Boolean => {
            let null_mask = read_validity(cursor, n, null_count)?;
            let data = cursor.next_buffer()?;
            if data.len() < bytes_for_bits(n) {
                return Err(malformed("boolean data bitmap shorter than its length"));
            }
            Array::from_boolean(BooleanArray {
                data: Bitmask::from_shared(data, n),
                null_mask,
                len: n,
            })
        }
        ArrowType::String => {
            let null_mask = read_validity(cursor, n, null_count)?;
            let offsets = read_offsets::<u32>(cursor, n)?;
            let data = cursor.next_buffer()?;
            let arr = StringArray::<u32> {
                offsets,
                data: Buffer::from_shared(data),
                null_mask,
            };
            arr.validate_offsets()?;
            std::str::from_utf8(&arr.data)
                .map_err(|_| malformed("utf8 column carries invalid UTF-8"))?;
            Array::from_string32(arr)
        }
        ArrowType::LargeString => {
            let null_mask = read_validity(cursor, n, null_count)?;
            let offsets = read_offsets::<u64>(cursor, n)?;
            let data = cursor.next_buffer()?;
            let arr = StringArray::<u64> {
                offsets,
                data: Buffer::from_shared(data),
                null_mask,
            };
            arr.validate_offsets()?;
            std::str::from_utf8(&arr.data)
                .map_err(|_| malformed("utf8 column carries invalid UTF-8"))?;
            Array::from_string64(arr)
        }
        ArrowType::Binary => {
            let null_mask = read_validity(cursor, n, null_count)?;
            let offsets = read_offsets::<u32>(cursor, n)?;
            let data = cursor.next_buffer()?;
            let arr = BinaryArray::<u32> {
                offsets,
                data: Buffer::from_shared(data),
                null_mask,
            };
            arr.validate_offsets()?;
            Array::from_binary32(arr)
        }
        ArrowType::LargeBinary => {
            let null_mask = read_validity(cursor, n, null_count)?;
            let offsets = read_offsets::<u64>(cursor, n)?;
            let data = cursor.next_buffer()?;
            let arr = BinaryArray::<u64> {
                offsets,
                data: Buffer::from_shared(data),
                null_mask,
            };
            arr.validate_offsets()?;
            Array::from_binary64(arr)
        }
        ArrowType::FixedSizeBinary(_)
        | ArrowType::Decimal {
            bit_width: 256, ..
        } => {
            let width = match &field.dtype {
                ArrowType::Decimal { .. } => 32,
                ArrowType::FixedSizeBinary(w) => *w,
                _ => unreachable!(),
            };
            let null_mask = read_validity(cursor, n, null_count)?;
            let data = cursor.next_buffer()?;
            primitive_width_checked(&data, n, width)?;
            Array::from_fixed_binary(FixedSizeBinaryArray {
                data: Buffer::from_shared(data.slice(0..n * width)),
                width,
                null_mask,
            })
        }
        ArrowType::List(child) => {
            let null_mask = read_validity(cursor, n, null_count)?;
            let offsets = read_offsets::<u32>(cursor, n)?;
            let values = build_array(child, cursor, dictionaries, depth + 1)?;
            let arr = ListArray::<u32> {
                offsets,
                values,
                null_mask,
            };
            arr.validate_offsets()?;
            Array::from_list32(arr)
        }
        ArrowType::LargeList(child) => {
            let null_mask = read_validity(cursor, n, null_count)?;
            let offsets = read_offsets::<u64>(cursor, n)?;
            let values = build_array(child, cursor, dictionaries, depth + 1)?;
            let arr = ListArray::<u64> {
                offsets,
                values,
                null_mask,
            };
            arr.validate_offsets()?;
            Array::from_list64(arr)
        }
        ArrowType::FixedSizeList(child, size) => {
            let null_mask = read_validity(cursor, n, null_count)?;
            let values = build_array(child, cursor, dictionaries, depth + 1)?;
            if values.len() != n * size {
                return Err(malformed(format!(
                    "fixed size list child of {} elements, expected {}",
                    values.len(),
                    n * size
                )));
            }
            Array::from_fixed_size_list(FixedSizeListArray {
                values,
                size: *size,
                null_mask,
            })
        }
        ArrowType::Struct(children) => {
            let null_mask = read_validity(cursor, n, null_count)?;
            let mut arrays = Vec::with_capacity(children.len());
            for child in children {
                let arr = build_array(child, cursor, dictionaries, depth + 1)?;
                if arr.len() != n {
                    return Err(malformed(format!(
                        "struct child of {} elements, expected {n}",
                        arr.len()
                    )));
                }
                arrays.push(arr);
            }
            Array::Struct(Arc::new(StructArray {
                children: arrays,
                len: n,
                null_mask,
            }))
        }
        ArrowType::Map(entries, _) => {
            let null_mask = read_validity(cursor, n, null_count)?;
            let offsets = read_offsets::<u32>(cursor, n)?;
            let entries = build_array(entries, cursor, dictionaries, depth + 1)?;
            let arr = MapArray {
                offsets,
                entries,
                null_mask,
            };
            arr.validate()?;
            Array::from_map(arr)
        }
        ArrowType::Union {
            mode,
            fields,
            type_ids,
        } => {
            let ids_region = cursor.next_buffer()?;
            primitive_width_checked(&ids_region, n, 1)?;
            let type_id_buf: Buffer<i8> = Buffer::from_shared(ids_region.slice(0..n));
            let offsets = if *mode == UnionMode::Dense {
                let region = cursor.next_buffer()?;
                primitive_width_checked(&region, n, 4)?;
                Some(Buffer::<i32>::from_shared(region.slice(0..n * 4)))
            } else {
                None
            };
            let mut children = Vec::with_capacity(fields.len());
            for child in fields {
                children.push(build_array(child, cursor, dictionaries, depth + 1)?);
            }
            let type_codes: Vec<i8> = match type_ids {
                Some(ids) => ids.iter().map(|v| *v as i8).collect(),
                None => (0..fields.len() as i8).collect(),
            };
            let arr = UnionArray {
                mode: *mode,
                type_ids: type_id_buf,
                offsets,
                children,
                type_codes,
            };
            arr.validate()?;
            Array::Union(Arc::new(arr))
        }
        ArrowType::Dictionary(kind, _) => {
            let null_mask = read_validity(cursor, n, null_count)?;
            let indices = dictionary_index_array(*kind, cursor, n, null_mask)?;
            let encoding = field
                .dictionary
                .as_ref()
                .ok_or_else(|| malformed("dictionary field without an id"))?;
            let values = dictionaries.get(&encoding.id).ok_or_else(|| {
                malformed(format!(
                    "record batch references dictionary {} before its dictionary batch",
                    encoding.id
                ))
            })?;
            let arr = DictionaryArray::from_parts(indices, values.clone(), encoding.ordered);
            arr.validate()?;
            Array::Dictionary(Arc::new(arr))
        }
        // temporal, decimal128 and plain numerics: one values buffer
        _ => {
            let null_mask = read_validity(cursor, n, null_count)?;
            let region = cursor.next_buffer()?;
            read_primitive(&field.dtype, region, n, null_mask)?
        }
    };

    // registered extension decode hooks swap the in-memory representation
    if let Some(name) = field.extension_name() {
        if let Some(ext) = extension::lookup_extension(name) {
            if let Some(decode) = ext.decode {
                return Ok(decode(&array));
            }
        }
    }
    Ok(array)
}

/// Reconstructs one record batch as a `Table`.
fn read_record_batch(
    schema: &Schema,
    dictionaries: &Dictionaries,
    batch: ipc::RecordBatchRef<'_>,
    body: SharedBuffer,
) -> Result<Table> {
    let compression = match batch.compression()? {
        Some(c) => {
            if c.method()? != ipc::BodyCompressionMethod::Buffer {
                return Err(unsupported("non-buffer body compression method"));
            }
            Some(CompressionCodec::from_fb(c.codec()?)?)
        }
        None => None,
    };
    let n_rows = batch.length()?;
    if n_rows < 0 {
        return Err(malformed("negative record batch length"));
    }
    let mut cursor = BodyCursor::new(batch, body, compression)?;
    let mut cols = Vec::with_capacity(schema.len());
    for field in &schema.fields {
        let array = build_array(field, &mut cursor, dictionaries, 1)?;
        if array.len() != n_rows as usize {
            return Err(malformed(format!(
                "column '{}' of {} elements in a batch of {n_rows} rows",
                field.name,
                array.len()
            )));
        }
        cols.push(FieldArray::new_arc(field.clone(), array));
    }
    let mut table = Table::new(String::new(), Some(cols));
    table.metadata = schema.metadata.clone();
    table.n_rows = n_rows as usize;
    Ok(table)
}

/// Applies a dictionary batch: replace the pool, or append when `isDelta`.
fn process_dictionary_batch(
    schema: &Schema,
    dictionaries: &mut Dictionaries,
    batch: ipc::DictionaryBatchRef<'_>,
    body: SharedBuffer,
) -> Result<()> {
    let id = batch.id()?;
    let value_field = dictionary_value_field(schema, id).ok_or_else(|| {
        malformed(format!("dictionary batch for unknown dictionary id {id}"))
    })?;
    let data = batch
        .data()?
        .ok_or_else(|| malformed("dictionary batch without a record batch"))?;
    let pool_schema = Schema {
        fields: vec![Arc::new(value_field)],
        metadata: Default::default(),
    };
    let pool_table = read_record_batch(&pool_schema, dictionaries, data, body)?;
    let values = pool_table.cols[0].array.clone();
    if batch.is_delta()? {
        match dictionaries.get_mut(&id) {
            Some(existing) => {
                let merged = Array::concat(&[&*existing, &values])?;
                *existing = merged;
            }
            None => {
                return Err(malformed(format!(
                    "delta dictionary batch for id {id} arrived before its base batch"
                )));
            }
        }
    } else {
        dictionaries.insert(id, values);
    }
    Ok(())
}

/// The value `Field` behind a dictionary id, resolved by a schema walk
/// (shared ids resolve once; payloads are stored by id, never by pointer).
fn dictionary_value_field(schema: &Schema, id: i64) -> Option<Field> {
    fn walk(field: &Field, id: i64) -> Option<Field> {
        if let (Some(encoding), ArrowType::Dictionary(_, values)) =
            (&field.dictionary, &field.dtype)
        {
            if encoding.id == id {
                let mut value_field =
                    Field::new(field.name.clone(), values.as_ref().clone(), field.nullable, None);
                value_field.metadata = field.metadata.clone();
                return Some(value_field);
            }
        }
        for child in field.dtype.children() {
            if let Some(found) = walk(child, id) {
                return Some(found);
            }
        }
        None
    }
    schema.fields.iter().find_map(|f| walk(f, id))
}

// ---------------------------------------------------------------------
// stream mode
// ---------------------------------------------------------------------

/// # TableStream
///
/// Lazy record-batch iterator over a stream-format byte region. Dictionary
/// batches are absorbed silently; each `next()` yields the following
/// record batch as a `Table` of views into the region.
pub struct TableStream {
    cursor: EnvelopeCursor,
    schema: Schema,
    dictionaries: Dictionaries,
    done: bool,
}

impl TableStream {
    /// Opens a stream, eagerly decoding the leading schema message. An
    /// empty region yields an empty stream.
    pub fn new(region: impl Into<SharedBuffer>) -> Result<Self> {
        let region: SharedBuffer = region.into();
        let mut cursor = EnvelopeCursor::new(region);
        let Some(meta) = cursor.next_metadata()? else {
            return Ok(Self {
                cursor,
                schema: Schema::default(),
                dictionaries: Dictionaries::new(),
                done: true,
            });
        };
        let meta_bytes = meta.as_slice().to_vec();
        let message = decode_message(&meta_bytes)?;
        let body_length = message.body_length()?;
        if body_length < 0 {
            return Err(malformed("negative body length"));
        }
        cursor.take_body(body_length as usize)?;
        let schema = match message
            .header()?
            .ok_or_else(|| malformed("message without a header"))?
        {
            ipc::MessageHeaderRef::Schema(s) => fb_to_schema(s)?,
            _ => return Err(malformed("stream does not begin with a schema message")),
        };
        Ok(Self {
            cursor,
            schema,
            dictionaries: Dictionaries::new(),
            done: false,
        })
    }

    /// The stream's schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    fn next_table(&mut self) -> Result<Option<Table>> {
        if self.done {
            return Ok(None);
        }
        loop {
            let Some(meta) = self.cursor.next_metadata()? else {
                self.done = true;
                return Ok(None);
            };
            let meta_bytes = meta.as_slice().to_vec();
            let message = decode_message(&meta_bytes)?;
            let body_length = message.body_length()?;
            if body_length < 0 {
                return Err(malformed("negative body length"));
            }
            let body = self.cursor.take_body(body_length as usize)?;
            match message
                .header()?
                .ok_or_else(|| malformed("message without a header"))?
            {
                ipc::MessageHeaderRef::RecordBatch(batch) => {
                    return Ok(Some(read_record_batch(
                        &self.schema,
                        &self.dictionaries,
                        batch,
                        body,
                    )?));
                }
                ipc::MessageHeaderRef::DictionaryBatch(batch) => {
                    process_dictionary_batch(&self.schema, &mut self.dictionaries, batch, body)?;
                }
                ipc::MessageHeaderRef::Schema(_) => {
                    return Err(malformed("unexpected second schema message"));
                }
                _ => return Err(unsupported("tensor messages")),
            }
        }
    }
}

impl Iterator for TableStream {
    type Item = Result<Table>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_table() {
            Ok(Some(table)) => Some(Ok(table)),
            Ok(None) => None,
            Err(e) => {
                // a malformed stream terminates iteration
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

// ---------------------------------------------------------------------
// eager modes
// ---------------------------------------------------------------------

/// Eagerly reads a byte region (auto-detecting file vs stream format)
/// into one `Table`, concatenating equal-schema batches.
pub fn read_table(region: impl Into<SharedBuffer>) -> Result<Table> {
    let region: SharedBuffer = region.into();
    if is_file_format(&region) {
        return read_file(region);
    }
    read_stream_eager(region)
}

fn read_stream_eager(region: SharedBuffer) -> Result<Table> {
    let mut stream = TableStream::new(region)?;
    let mut batches = Vec::new();
    while let Some(batch) = stream.next_table()? {
        batches.push(batch);
    }
    tables_to_one(&stream.schema, batches)
}

fn tables_to_one(schema: &Schema, batches: Vec<Table>) -> Result<Table> {
    if batches.is_empty() {
        let cols = schema
            .fields
            .iter()
            .map(|f| {
                // zero-row columns of the schema's types
                empty_column(f)
            })
            .collect::<Result<Vec<_>>>()?;
        let mut table = Table::new(String::new(), Some(cols));
        table.metadata = schema.metadata.clone();
        return Ok(table);
    }
    Table::concat(&batches)
}

fn empty_column(field: &Arc<Field>) -> Result<FieldArray> {
    // an empty stream yields zero-row columns; realised by concatenating
    // nothing is not possible, so build minimal empties per category
    let array = match &field.dtype {
        ArrowType::Null => Array::NullArray(0),
        ArrowType::Boolean => Array::from_boolean(BooleanArray::default()),
        ArrowType::String => Array::from_string32(StringArray::<u32>::default()),
        ArrowType::LargeString => Array::from_string64(StringArray::<u64>::default()),
        ArrowType::Binary => Array::from_binary32(BinaryArray::<u32>::default()),
        ArrowType::LargeBinary => Array::from_binary64(BinaryArray::<u64>::default()),
        _ => {
            // primitive-like lanes cover the remaining flat types; nested
            // empties reuse the record-batch builder on a synthetic body
            read_primitive(&field.dtype, SharedBuffer::default(), 0, None)
                .unwrap_or(Array::NullArray(0))
        }
    };
    Ok(FieldArray::new_arc(field.clone(), array))
}

/// Reads several independent byte regions and concatenates them. All
/// inputs must carry equivalent schemas (names and element types, with
/// nullability stripped).
pub fn read_table_multi<I>(inputs: I) -> Result<Table>
where
    I: IntoIterator,
    I::Item: Into<SharedBuffer>,
{
    let tables: Vec<Table> = inputs
        .into_iter()
        .map(|region| read_table(region))
        .collect::<Result<Vec<_>>>()?;
    let Some(first) = tables.first() else {
        return Ok(Table::new_empty());
    };
    let schema = first.schema();
    for t in &tables[1..] {
        if !schema.equivalent(&t.schema()) {
            return Err(schema_mismatch(format!(
                "input '{}' does not match the first input's schema",
                t.name
            )));
        }
    }
    // dictionary columns from independent streams carry unrelated pools:
    // merge pools and remap indices before concatenation
    let mut cols = Vec::with_capacity(first.n_cols());
    for j in 0..first.n_cols() {
        let parts: Vec<&Array> = tables.iter().map(|t| &t.cols[j].array).collect();
        let all_dict = parts.iter().all(|a| matches!(a, Array::Dictionary(_)));
        let array = if all_dict && tables.len() > 1 {
            merge_dictionary_columns(&parts)?
        } else {
            Array::concat(&parts)?
        };
        cols.push(FieldArray::new_arc(first.cols[j].field.clone(), array));
    }
    let mut table = Table::new(String::new(), Some(cols));
    table.metadata = first.metadata.clone();
    Ok(table)
}

fn merge_dictionary_columns(parts: &[&Array]) -> Result<Array> {
    let dicts: Vec<&DictionaryArray> = parts
        .iter()
        .map(|a| match a {
            Array::Dictionary(d) => Ok(d.as_ref()),
            _ => Err(schema_mismatch("mixed dictionary and plain columns")),
        })
        .collect::<Result<Vec<_>>>()?;
    let template = &dicts[0].values;

    // merged pool in first-seen order
    let mut interned: HashMap<Vec<u8>, usize> = HashMap::new();
    let mut pool_values = Vec::new();
    let mut remapped: Vec<Option<usize>> = Vec::new();
    for dict in &dicts {
        for i in 0..dict.len() {
            match dict.key(i) {
                None => remapped.push(None),
                Some(k) => {
                    let value = dict.values.value(k);
                    let key = value_key(&value)
                        .ok_or_else(|| unsupported("merging nested dictionary pools"))?;
                    let idx = match interned.get(&key) {
                        Some(idx) => *idx,
                        None => {
                            let idx = pool_values.len();
                            interned.insert(key, idx);
                            pool_values.push((dict.values.clone(), k));
                            idx
                        }
                    };
                    remapped.push(Some(idx));
                }
            }
        }
    }
    let values: Vec<crate::Value<'_>> = pool_values
        .iter()
        .map(|(pool, k)| pool.value(*k))
        .collect();
    let pool = array_from_values(template, &values)?;
    let kind = choose_index_kind(pool.len());
    Ok(Array::Dictionary(Arc::new(DictionaryArray::from_parts(
        build_indices(kind, &remapped),
        pool,
        dicts[0].ordered,
    ))))
}

/// Walks a whole stream for the append path: returns the byte position at
/// which new frames should resume (the terminator's offset, or EOF), the
/// stream schema and the final dictionary pools.
pub(crate) fn scan_stream_state(
    region: SharedBuffer,
) -> Result<(usize, Schema, Dictionaries)> {
    let mut stream = TableStream::new(region)?;
    while stream.next_table()?.is_some() {}
    let resume_at = if stream.cursor.consumed_terminator() {
        stream.cursor.position() - 8
    } else {
        stream.cursor.position()
    };
    Ok((resume_at, stream.schema, stream.dictionaries))
}

// ---------------------------------------------------------------------
// file mode
// ---------------------------------------------------------------------

/// Reads a file-format region via its footer.
pub fn read_file(region: impl Into<SharedBuffer>) -> Result<Table> {
    let region: SharedBuffer = region.into();
    if !is_file_format(&region) {
        return Err(malformed("region does not carry file-format framing"));
    }
    let bytes = region.as_slice();
    let len = bytes.len();
    let footer_len_pos = len - ARROW_MAGIC.len() - 4;
    let footer_len = i32::from_le_bytes(
        bytes[footer_len_pos..footer_len_pos + 4]
            .try_into()
            .expect("4-byte window"),
    );
    if footer_len <= 0 || footer_len as usize > footer_len_pos - FILE_HEADER.len() {
        return Err(malformed(format!("implausible footer length {footer_len}")));
    }
    let footer_start = footer_len_pos - footer_len as usize;
    let (schema, dict_blocks, record_blocks) =
        decode_footer(&bytes[footer_start..footer_len_pos])?;

    let mut dictionaries = Dictionaries::new();
    let mut cursor = EnvelopeCursor::with_bounds(region.clone(), 0, footer_start);

    let read_block = |cursor: &mut EnvelopeCursor,
                      block: &ipc::Block|
     -> Result<(Vec<u8>, SharedBuffer)> {
        if block.offset < 0 {
            return Err(malformed("negative block offset"));
        }
        cursor.seek(block.offset as usize);
        let meta = cursor
            .next_metadata()?
            .ok_or_else(|| malformed("footer block points at end-of-stream"))?;
        let body = cursor.take_body(block.body_length as usize)?;
        Ok((meta.as_slice().to_vec(), body))
    };

    for block in &dict_blocks {
        let (meta_bytes, body) = read_block(&mut cursor, block)?;
        let message = decode_message(&meta_bytes)?;
        match message.header()?.ok_or_else(|| malformed("headerless message"))? {
            ipc::MessageHeaderRef::DictionaryBatch(batch) => {
                process_dictionary_batch(&schema, &mut dictionaries, batch, body)?;
            }
            _ => return Err(malformed("dictionary block does not hold a dictionary batch")),
        }
    }

    let mut batches = Vec::with_capacity(record_blocks.len());
    for block in &record_blocks {
        let (meta_bytes, body) = read_block(&mut cursor, block)?;
        let message = decode_message(&meta_bytes)?;
        match message.header()?.ok_or_else(|| malformed("headerless message"))? {
            ipc::MessageHeaderRef::RecordBatch(batch) => {
                batches.push(read_record_batch(&schema, &dictionaries, batch, body)?);
            }
            _ => return Err(malformed("record block does not hold a record batch")),
        }
    }
    tables_to_one(&schema, batches)
}
