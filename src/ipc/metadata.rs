//! # **Metadata Module** - *FlatBuffers Schema/Type Conversions*
//!
//! Bidirectional map between the crate's logical types and the
//! FlatBuffers-encoded Arrow IPC metadata (`arrow-format` crate): fields,
//! schemas, messages and the file footer.
//!
//! Metadata version V5 is written; V4 and V5 are accepted on read.

use std::collections::BTreeMap;

use arrow_format::ipc;
use arrow_format::ipc::planus::{Builder, ReadAsRoot};

use crate::enums::arrow_type::{ArrowType, IndexKind, UnionMode};
use crate::enums::error::{Result, invalid_metadata, malformed, unsupported};
use crate::enums::time_units::{IntervalUnit, TimeUnit};
use crate::structs::field::DictionaryEncoding;
use crate::structs::schema::Schema;
use crate::{Field, extension};

// ---------------------------------------------------------------------
// write side
// ---------------------------------------------------------------------

fn time_unit_to_fb(unit: TimeUnit) -> ipc::TimeUnit {
    match unit {
        TimeUnit::Seconds => ipc::TimeUnit::Second,
        TimeUnit::Milliseconds => ipc::TimeUnit::Millisecond,
        TimeUnit::Microseconds => ipc::TimeUnit::Microsecond,
        TimeUnit::Nanoseconds => ipc::TimeUnit::Nanosecond,
    }
}

fn index_kind_to_fb(kind: IndexKind) -> ipc::Int {
    ipc::Int {
        bit_width: kind.bit_width() as i32,
        is_signed: kind.is_signed(),
    }
}

fn int_type(bit_width: i32, is_signed: bool) -> ipc::Type {
    ipc::Type::Int(Box::new(ipc::Int {
        bit_width,
        is_signed,
    }))
}

/// The flatbuffer `Type` table for a logical type. For dictionary-encoded
/// fields this is the *value* type, per the Arrow schema convention.
fn type_to_fb(dtype: &ArrowType) -> Result<ipc::Type> {
    Ok(match dtype {
        ArrowType::Null => ipc::Type::Null(Box::new(ipc::Null {})),
        ArrowType::Boolean => ipc::Type::Bool(Box::new(ipc::Bool {})),
        ArrowType::Int8 => int_type(8, true),
        ArrowType::Int16 => int_type(16, true),
        ArrowType::Int32 => int_type(32, true),
        ArrowType::Int64 => int_type(64, true),
        ArrowType::UInt8 => int_type(8, false),
        ArrowType::UInt16 => int_type(16, false),
        ArrowType::UInt32 => int_type(32, false),
        ArrowType::UInt64 => int_type(64, false),
        ArrowType::Float16 => ipc::Type::FloatingPoint(Box::new(ipc::FloatingPoint {
            precision: ipc::Precision::Half,
        })),
        ArrowType::Float32 => ipc::Type::FloatingPoint(Box::new(ipc::FloatingPoint {
            precision: ipc::Precision::Single,
        })),
        ArrowType::Float64 => ipc::Type::FloatingPoint(Box::new(ipc::FloatingPoint {
            precision: ipc::Precision::Double,
        })),
        ArrowType::Decimal {
            precision,
            scale,
            bit_width,
        } => {
            if *bit_width != 128 && *bit_width != 256 {
                return Err(invalid_metadata(format!(
                    "decimal bit width {bit_width} outside {{128, 256}}"
                )));
            }
            ipc::Type::Decimal(Box::new(ipc::Decimal {
                precision: *precision as i32,
                scale: *scale as i32,
                bit_width: *bit_width as i32,
            }))
        }
        ArrowType::Date32 => ipc::Type::Date(Box::new(ipc::Date {
            unit: ipc::DateUnit::Day,
        })),
        ArrowType::Date64 => ipc::Type::Date(Box::new(ipc::Date {
            unit: ipc::DateUnit::Millisecond,
        })),
        ArrowType::Time32(unit) => ipc::Type::Time(Box::new(ipc::Time {
            unit: time_unit_to_fb(*unit),
            bit_width: 32,
        })),
        ArrowType::Time64(unit) => ipc::Type::Time(Box::new(ipc::Time {
            unit: time_unit_to_fb(*unit),
            bit_width: 64,
        })),
        ArrowType::Timestamp(unit, tz) => ipc::Type::Timestamp(Box::new(ipc::Timestamp {
            unit: time_unit_to_fb(*unit),
            timezone: tz.clone(),
        })),
        ArrowType::Duration(unit) => ipc::Type::Duration(Box::new(ipc::Duration {
            unit: time_unit_to_fb(*unit),
        })),
        ArrowType::Interval(unit) => ipc::Type::Interval(Box::new(ipc::Interval {
            unit: match unit {
                IntervalUnit::YearMonth => ipc::IntervalUnit::YearMonth,
                IntervalUnit::DayTime => ipc::IntervalUnit::DayTime,
            },
        })),
        ArrowType::String => ipc::Type::Utf8(Box::new(ipc::Utf8 {})),
        ArrowType::LargeString => ipc::Type::LargeUtf8(Box::new(ipc::LargeUtf8 {})),
        ArrowType::Binary => ipc::Type::Binary(Box::new(ipc::Binary {})),
        ArrowType::LargeBinary => ipc::Type::LargeBinary(Box::new(ipc::LargeBinary {})),
        ArrowType::FixedSizeBinary(width) => {
            ipc::Type::FixedSizeBinary(Box::new(ipc::FixedSizeBinary {
                byte_width: *width as i32,
            }))
        }
        ArrowType::List(_) => ipc::Type::List(Box::new(ipc::List {})),
        ArrowType::LargeList(_) => ipc::Type::LargeList(Box::new(ipc::LargeList {})),
        ArrowType::FixedSizeList(_, size) => {
            ipc::Type::FixedSizeList(Box::new(ipc::FixedSizeList {
                list_size: *size as i32,
            }))
        }
        ArrowType::Struct(_) => ipc::Type::Struct(Box::new(ipc::Struct {})),
        ArrowType::Map(_, keys_sorted) => ipc::Type::Map(Box::new(ipc::Map {
            keys_sorted: *keys_sorted,
        })),
        ArrowType::Union { mode, type_ids, .. } => ipc::Type::Union(Box::new(ipc::Union {
            mode: match mode {
                UnionMode::Dense => ipc::UnionMode::Dense,
                UnionMode::Sparse => ipc::UnionMode::Sparse,
            },
            type_ids: type_ids.clone(),
        })),
        ArrowType::Dictionary(_, values) => return type_to_fb(values),
    })
}

fn metadata_map_to_fb(map: &BTreeMap<String, String>) -> Option<Vec<ipc::KeyValue>> {
    if map.is_empty() {
        return None;
    }
    Some(
        map.iter()
            .map(|(k, v)| ipc::KeyValue {
                key: Some(k.clone()),
                value: Some(v.clone()),
            })
            .collect(),
    )
}

/// Serializes a `Field`, recursing into nested children.
pub fn field_to_fb(field: &Field) -> Result<ipc::Field> {
    // dictionary fields describe their value type; children come from it
    let value_type = match &field.dtype {
        ArrowType::Dictionary(_, values) => values.as_ref(),
        other => other,
    };
    let children = value_type
        .children()
        .iter()
        .map(field_to_fb)
        .collect::<Result<Vec<_>>>()?;
    let dictionary = field.dictionary.as_ref().map(|d| {
        Box::new(ipc::DictionaryEncoding {
            id: d.id,
            index_type: Some(Box::new(index_kind_to_fb(d.index))),
            is_ordered: d.ordered,
            dictionary_kind: ipc::DictionaryKind::DenseArray,
        })
    });
    Ok(ipc::Field {
        name: Some(field.name.clone()),
        nullable: field.nullable,
        type_: Some(type_to_fb(&field.dtype)?),
        dictionary,
        children: Some(children),
        custom_metadata: metadata_map_to_fb(&field.metadata),
    })
}

/// Serializes a `Schema` with little-endian byte order.
pub fn schema_to_fb(schema: &Schema) -> Result<ipc::Schema> {
    let fields = schema
        .fields
        .iter()
        .map(|f| field_to_fb(f))
        .collect::<Result<Vec<_>>>()?;
    Ok(ipc::Schema {
        endianness: ipc::Endianness::Little,
        fields: Some(fields),
        custom_metadata: metadata_map_to_fb(&schema.metadata),
        features: None,
    })
}

/// Encodes a complete `Message` flatbuffer (version V5).
pub fn encode_message(header: ipc::MessageHeader, body_length: i64) -> Vec<u8> {
    let message = ipc::Message {
        version: ipc::MetadataVersion::V5,
        header: Some(header),
        body_length,
        custom_metadata: None,
    };
    let mut builder = Builder::new();
    builder.finish(&message, None).to_vec()
}

/// Encodes the file-format footer flatbuffer.
pub fn encode_footer(
    schema: &Schema,
    dictionaries: Vec<ipc::Block>,
    record_batches: Vec<ipc::Block>,
) -> Result<Vec<u8>> {
    let footer = ipc::Footer {
        version: ipc::MetadataVersion::V5,
        schema: Some(Box::new(schema_to_fb(schema)?)),
        dictionaries: Some(dictionaries),
        record_batches: Some(record_batches),
        custom_metadata: None,
    };
    let mut builder = Builder::new();
    Ok(builder.finish(&footer, None).to_vec())
}

// ---------------------------------------------------------------------
// read side
// ---------------------------------------------------------------------

fn time_unit_from_fb(unit: ipc::TimeUnit) -> TimeUnit {
    match unit {
        ipc::TimeUnit::Second => TimeUnit::Seconds,
        ipc::TimeUnit::Millisecond => TimeUnit::Milliseconds,
        ipc::TimeUnit::Microsecond => TimeUnit::Microseconds,
        ipc::TimeUnit::Nanosecond => TimeUnit::Nanoseconds,
    }
}

fn index_kind_from_fb(bit_width: i32, is_signed: bool) -> Result<IndexKind> {
    Ok(match (bit_width, is_signed) {
        (8, true) => IndexKind::Int8,
        (16, true) => IndexKind::Int16,
        (32, true) => IndexKind::Int32,
        (64, true) => IndexKind::Int64,
        (8, false) => IndexKind::UInt8,
        (16, false) => IndexKind::UInt16,
        (32, false) => IndexKind::UInt32,
        (64, false) => IndexKind::UInt64,
        _ => {
            return Err(invalid_metadata(format!(
                "dictionary index bit width {bit_width} outside {{8, 16, 32, 64}}"
            )));
        }
    })
}

fn fb_to_type(type_: ipc::TypeRef<'_>, children: Vec<Field>) -> Result<ArrowType> {
    let single_child = |mut children: Vec<Field>| -> Result<Box<Field>> {
        if children.len() != 1 {
            return Err(invalid_metadata("nested type requires exactly one child"));
        }
        Ok(Box::new(children.remove(0)))
    };
    Ok(match type_ {
        ipc::TypeRef::Null(_) => ArrowType::Null,
        ipc::TypeRef::Bool(_) => ArrowType::Boolean,
        ipc::TypeRef::Int(int) => {
            let bit_width = int.bit_width()?;
            let is_signed = int.is_signed()?;
            match (bit_width, is_signed) {
                (8, true) => ArrowType::Int8,
                (16, true) => ArrowType::Int16,
                (32, true) => ArrowType::Int32,
                (64, true) => ArrowType::Int64,
                (8, false) => ArrowType::UInt8,
                (16, false) => ArrowType::UInt16,
                (32, false) => ArrowType::UInt32,
                (64, false) => ArrowType::UInt64,
                _ => {
                    return Err(invalid_metadata(format!(
                        "integer bit width {bit_width} outside {{8, 16, 32, 64}}"
                    )));
                }
            }
        }
        ipc::TypeRef::FloatingPoint(float) => match float.precision()? {
            ipc::Precision::Half => ArrowType::Float16,
            ipc::Precision::Single => ArrowType::Float32,
            ipc::Precision::Double => ArrowType::Float64,
        },
        ipc::TypeRef::Decimal(decimal) => {
            let bit_width = decimal.bit_width()?;
            if bit_width != 128 && bit_width != 256 {
                return Err(invalid_metadata(format!(
                    "decimal bit width {bit_width} outside {{128, 256}}"
                )));
            }
            ArrowType::Decimal {
                precision: decimal.precision()? as usize,
                scale: decimal.scale()? as usize,
                bit_width: bit_width as usize,
            }
        }
        ipc::TypeRef::Date(date) => match date.unit()? {
            ipc::DateUnit::Day => ArrowType::Date32,
            ipc::DateUnit::Millisecond => ArrowType::Date64,
        },
        ipc::TypeRef::Time(time) => {
            let unit = time_unit_from_fb(time.unit()?);
            match time.bit_width()? {
                32 => ArrowType::Time32(unit),
                64 => ArrowType::Time64(unit),
                w => {
                    return Err(invalid_metadata(format!(
                        "time bit width {w} outside {{32, 64}}"
                    )));
                }
            }
        }
        ipc::TypeRef::Timestamp(ts) => ArrowType::Timestamp(
            time_unit_from_fb(ts.unit()?),
            ts.timezone()?.map(|s| s.to_string()),
        ),
        ipc::TypeRef::Duration(d) => ArrowType::Duration(time_unit_from_fb(d.unit()?)),
        ipc::TypeRef::Interval(i) => match i.unit()? {
            ipc::IntervalUnit::YearMonth => ArrowType::Interval(IntervalUnit::YearMonth),
            ipc::IntervalUnit::DayTime => ArrowType::Interval(IntervalUnit::DayTime),
            other => {
                return Err(unsupported(format!("interval unit {other:?}")));
            }
        },
        ipc::TypeRef::Utf8(_) => ArrowType::String,
        ipc::TypeRef::LargeUtf8(_) => ArrowType::LargeString,
        ipc::TypeRef::Binary(_) => ArrowType::Binary,
        ipc::TypeRef::LargeBinary(_) => ArrowType::LargeBinary,
        ipc::TypeRef::FixedSizeBinary(fsb) => {
            let width = fsb.byte_width()?;
            if width <= 0 {
                return Err(invalid_metadata("fixed size binary width must be positive"));
            }
            ArrowType::FixedSizeBinary(width as usize)
        }
        ipc::TypeRef::List(_) => ArrowType::List(single_child(children)?),
        ipc::TypeRef::LargeList(_) => ArrowType::LargeList(single_child(children)?),
        ipc::TypeRef::FixedSizeList(l) => {
            let size = l.list_size()?;
            if size <= 0 {
                return Err(invalid_metadata("fixed size list size must be positive"));
            }
            ArrowType::FixedSizeList(single_child(children)?, size as usize)
        }
        ipc::TypeRef::Struct(_) => ArrowType::Struct(children),
        ipc::TypeRef::Map(m) => {
            let entries = single_child(children)?;
            match &entries.dtype {
                ArrowType::Struct(kv) if kv.len() == 2 => {}
                _ => {
                    return Err(invalid_metadata(
                        "map entries must be a struct of key and value",
                    ));
                }
            }
            ArrowType::Map(entries, m.keys_sorted()?)
        }
        ipc::TypeRef::Union(u) => {
            let mode = match u.mode()? {
                ipc::UnionMode::Dense => UnionMode::Dense,
                ipc::UnionMode::Sparse => UnionMode::Sparse,
            };
            let type_ids = u.type_ids()?.map(|v| v.iter().collect::<Vec<i32>>());
            ArrowType::Union {
                mode,
                fields: children,
                type_ids,
            }
        }
        other => {
            return Err(unsupported(format!("flatbuffer type tag {other:?}")));
        }
    })
}

fn fb_to_metadata_map(field: ipc::FieldRef<'_>) -> Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    if let Some(kvs) = field.custom_metadata()? {
        for kv in kvs.iter() {
            let kv = kv?;
            if let (Some(k), Some(v)) = (kv.key()?, kv.value()?) {
                map.insert(k.to_string(), v.to_string());
            }
        }
    }
    Ok(map)
}

/// Deserializes a `Field`, resolving extension labels against the process
/// registry (unknown labels degrade with a one-shot warning).
pub fn fb_to_field(field: ipc::FieldRef<'_>) -> Result<Field> {
    let name = field
        .name()?
        .ok_or_else(|| invalid_metadata("field without a name"))?
        .to_string();
    let children = match field.children()? {
        Some(children) => children
            .iter()
            .map(|c| fb_to_field(c?))
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };
    let type_ = field
        .type_()?
        .ok_or_else(|| invalid_metadata("field without a type"))?;
    let mut dtype = fb_to_type(type_, children)?;

    let mut dictionary = None;
    if let Some(encoding) = field.dictionary()? {
        let index = match encoding.index_type()? {
            Some(int) => index_kind_from_fb(int.bit_width()?, int.is_signed()?)?,
            // int32 is the Arrow default when the index type is omitted
            None => IndexKind::Int32,
        };
        dictionary = Some(DictionaryEncoding {
            id: encoding.id()?,
            index,
            ordered: encoding.is_ordered()?,
        });
        dtype = ArrowType::Dictionary(index, Box::new(dtype));
    }

    let metadata = fb_to_metadata_map(field)?;
    let mut out = Field::new(name, dtype, field.nullable()?, Some(metadata));
    out.dictionary = dictionary;
    if let Some(ext) = out.extension_name() {
        extension::resolve_extension(ext, &out.dtype)?;
    }
    Ok(out)
}

/// Deserializes a `Schema`, rejecting big-endian streams.
pub fn fb_to_schema(schema: ipc::SchemaRef<'_>) -> Result<Schema> {
    if schema.endianness()? != ipc::Endianness::Little {
        return Err(unsupported("big-endian streams are not supported"));
    }
    let fields = match schema.fields()? {
        Some(fields) => fields
            .iter()
            .map(|f| fb_to_field(f?))
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };
    let mut metadata = BTreeMap::new();
    if let Some(kvs) = schema.custom_metadata()? {
        for kv in kvs.iter() {
            let kv = kv?;
            if let (Some(k), Some(v)) = (kv.key()?, kv.value()?) {
                metadata.insert(k.to_string(), v.to_string());
            }
        }
    }
    Ok(Schema::new(fields).with_metadata(metadata))
}

/// Decodes a message flatbuffer and checks the metadata version.
pub fn decode_message(bytes: &[u8]) -> Result<ipc::MessageRef<'_>> {
    let message = ipc::MessageRef::read_as_root(bytes)?;
    match message.version()? {
        ipc::MetadataVersion::V4 | ipc::MetadataVersion::V5 => Ok(message),
        v => Err(unsupported(format!("metadata version {v:?}"))),
    }
}

/// Decodes the file footer flatbuffer into the schema and block lists.
pub fn decode_footer(bytes: &[u8]) -> Result<(Schema, Vec<ipc::Block>, Vec<ipc::Block>)> {
    let footer = ipc::FooterRef::read_as_root(bytes)?;
    let schema = footer
        .schema()?
        .ok_or_else(|| malformed("footer without a schema"))?;
    let schema = fb_to_schema(schema)?;
    let to_blocks = |blocks: Option<ipc::planus::Vector<'_, ipc::BlockRef<'_>>>| {
        blocks
            .map(|v| {
                v.iter()
                    .map(|b| ipc::Block {
                        offset: b.offset(),
                        meta_data_length: b.meta_data_length(),
                        body_length: b.body_length(),
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default()
    };
    let dictionaries = to_blocks(footer.dictionaries()?);
    let record_batches = to_blocks(footer.record_batches()?);
    Ok((schema, dictionaries, record_batches))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_schema(schema: &Schema) -> Schema {
        let fb = schema_to_fb(schema).unwrap();
        let bytes = encode_message(ipc::MessageHeader::Schema(Box::new(fb)), 0);
        let message = decode_message(&bytes).unwrap();
        match message.header().unwrap().unwrap() {
            ipc::MessageHeaderRef::Schema(s) => fb_to_schema(s).unwrap(),
            _ => panic!("not a schema message"),
        }
    }

    #[test]
    fn test_flat_schema_roundtrip() {
        let schema = Schema::new(vec![
            Field::new("a", ArrowType::Int64, true, None),
            Field::new("b", ArrowType::String, false, None),
            Field::new("c", ArrowType::Timestamp(TimeUnit::Microseconds, Some("UTC".into())), true, None),
            Field::new("d", ArrowType::FixedSizeBinary(16), false, None),
        ]);
        assert_eq!(roundtrip_schema(&schema), schema);
    }

    #[test]
    fn test_nested_schema_roundtrip() {
        let item = Field::new("item", ArrowType::Float64, true, None);
        let entries = Field::new(
            "entries",
            ArrowType::Struct(vec![
                Field::new("key", ArrowType::String, false, None),
                Field::new("value", ArrowType::Int32, true, None),
            ]),
            false,
            None,
        );
        let schema = Schema::new(vec![
            Field::new("xs", ArrowType::List(Box::new(item)), true, None),
            Field::new("m", ArrowType::Map(Box::new(entries), false), true, None),
            Field::new(
                "u",
                ArrowType::Union {
                    mode: UnionMode::Dense,
                    fields: vec![
                        Field::new("i", ArrowType::Int64, true, None),
                        Field::new("f", ArrowType::Float64, true, None),
                    ],
                    type_ids: Some(vec![0, 1]),
                },
                false,
                None,
            ),
        ]);
        assert_eq!(roundtrip_schema(&schema), schema);
    }

    #[test]
    fn test_dictionary_field_roundtrip() {
        let mut field = Field::new(
            "cat",
            ArrowType::Dictionary(IndexKind::Int16, Box::new(ArrowType::String)),
            true,
            None,
        );
        field.dictionary = Some(DictionaryEncoding {
            id: 3,
            index: IndexKind::Int16,
            ordered: false,
        });
        let schema = Schema::new(vec![field]);
        let back = roundtrip_schema(&schema);
        assert_eq!(back, schema);
        assert_eq!(back.field(0).dictionary.as_ref().unwrap().id, 3);
    }

    #[test]
    fn test_schema_metadata_roundtrip() {
        let mut metadata = BTreeMap::new();
        metadata.insert("origin".to_string(), "unit-test".to_string());
        let schema =
            Schema::new(vec![Field::new("a", ArrowType::Int32, false, None)]).with_metadata(metadata);
        assert_eq!(roundtrip_schema(&schema).metadata["origin"], "unit-test");
    }

    #[test]
    fn test_footer_roundtrip() {
        let schema = Schema::new(vec![Field::new("a", ArrowType::Int64, false, None)]);
        let blocks = vec![ipc::Block {
            offset: 8,
            meta_data_length: 128,
            body_length: 256,
        }];
        let bytes = encode_footer(&schema, Vec::new(), blocks).unwrap();
        let (back, dicts, recs) = decode_footer(&bytes).unwrap();
        assert_eq!(back, schema);
        assert!(dicts.is_empty());
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].offset, 8);
        assert_eq!(recs[0].body_length, 256);
    }
}
