//! End-to-end write → read round-trips over the stream format, across the
//! supported type set.

use std::sync::Arc;

use minstream::ipc::reader::read_table;
use minstream::ipc::writer::{TableWriter, WriteOptions};
use minstream::{
    Array, ArrowType, BinaryArray, BooleanArray, DictionaryArray, Field, FieldArray,
    FixedSizeBinaryArray, FixedSizeListArray, IndexKind, ListArray, MapArray, NumericArray,
    PrimitiveArray, StringArray, StructArray, Table, TimeUnit, UnionArray, Value, arr_i64,
    arr_str32,
};

fn roundtrip(table: &Table) -> Table {
    let mut writer = TableWriter::new(Vec::new(), WriteOptions::default());
    writer.write(table).unwrap();
    let bytes = writer.finish().unwrap();
    read_table(bytes).unwrap()
}

fn assert_values_equal(a: &Table, b: &Table) {
    assert_eq!(a.n_rows(), b.n_rows());
    assert_eq!(a.n_cols(), b.n_cols());
    for (ca, cb) in a.cols.iter().zip(&b.cols) {
        assert_eq!(ca.field.name, cb.field.name);
        for i in 0..a.n_rows() {
            assert_eq!(
                ca.array.value(i),
                cb.array.value(i),
                "column '{}' differs at element {}",
                ca.field.name,
                i
            );
        }
    }
}

#[test]
fn primitive_roundtrip() {
    // single i64 column 1..=10: length 10, sum 55, no nulls
    let table = Table::from_cols(vec![FieldArray::from_arr(
        "col1",
        Array::from_int64(PrimitiveArray::from_slice(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10])),
    )]);
    let back = roundtrip(&table);
    assert_eq!(back.n_rows(), 10);
    assert_eq!(back.cols[0].null_count, 0);
    let sum: i64 = (0..10)
        .map(|i| match back.cols[0].array.value(i) {
            Value::Int(v) => v,
            other => panic!("unexpected {other:?}"),
        })
        .sum();
    assert_eq!(sum, 55);
}

#[test]
fn missing_values_roundtrip() {
    let mut values: Vec<Option<i64>> = (1..=9).map(Some).collect();
    values.push(None);
    let table = Table::from_cols(vec![FieldArray::from_arr(
        "col1",
        Array::from_int64(PrimitiveArray::from_opt_slice(&values)),
    )]);
    let back = roundtrip(&table);
    assert_eq!(back.n_rows(), 10);
    assert_eq!(back.cols[0].null_count, 1);
    assert_eq!(back.cols[0].array.value(9), Value::Null);
    assert_eq!(back.cols[0].array.value(8), Value::Int(9));
    // LSB-first validity: elements 1..=8 valid, 9 valid, 10 null
    let mask = back.cols[0].array.null_mask().expect("mask present");
    assert_eq!(mask.as_bytes()[0], 0xFF);
    assert_eq!(mask.as_bytes()[1] & 0x03, 0x01);
}

#[test]
fn two_partition_concat() {
    let mut p1_values: Vec<Option<i64>> = (1..=9).map(Some).collect();
    p1_values.push(None);
    let p1 = Table::from_cols(vec![FieldArray::from_arr(
        "col1",
        Array::from_int64(PrimitiveArray::from_opt_slice(&p1_values)),
    )]);
    let p2 = Table::from_cols(vec![FieldArray::from_arr(
        "col1",
        Array::from_int64(PrimitiveArray::from_opt_slice(&[None, Some(11)])),
    )]);

    let mut writer = TableWriter::new(Vec::new(), WriteOptions::default());
    writer.write(&p1).unwrap();
    writer.write(&p2).unwrap();
    let back = read_table(writer.finish().unwrap()).unwrap();

    assert_eq!(back.n_rows(), 12);
    assert_eq!(back.cols[0].array.value(0), Value::Int(1));
    assert_eq!(back.cols[0].array.value(8), Value::Int(9));
    assert_eq!(back.cols[0].array.value(9), Value::Null);
    assert_eq!(back.cols[0].array.value(10), Value::Null);
    assert_eq!(back.cols[0].array.value(11), Value::Int(11));
}

#[test]
fn string_and_binary_roundtrip() {
    let table = Table::from_cols(vec![
        FieldArray::from_arr(
            "s",
            Array::from_string32(StringArray::from_opt_slice(&[
                Some("alpha"),
                None,
                Some(""),
                Some("δ"),
            ])),
        ),
        FieldArray::from_arr(
            "ls",
            Array::from_string64(StringArray::from_slice(&["a", "bb", "ccc", "dddd"])),
        ),
        FieldArray::from_arr(
            "b",
            Array::from_binary32(BinaryArray::from_opt_slices(&[
                Some(b"\x00\x01"),
                Some(b""),
                None,
                Some(b"xyz"),
            ])),
        ),
        FieldArray::from_arr(
            "fb",
            Array::from_fixed_binary(FixedSizeBinaryArray::from_slices(
                2,
                &[b"ab", b"cd", b"ef", b"gh"],
            )),
        ),
    ]);
    let back = roundtrip(&table);
    assert_values_equal(&table, &back);
    assert_eq!(back.cols[0].array.value(3), Value::Str("δ"));
}

#[test]
fn boolean_roundtrip() {
    let table = Table::from_cols(vec![FieldArray::from_arr(
        "flags",
        Array::from_boolean(BooleanArray::from_opt_slice(&[
            Some(true),
            Some(false),
            None,
            Some(true),
            Some(true),
            Some(false),
            Some(false),
            Some(true),
            None,
        ])),
    )]);
    let back = roundtrip(&table);
    assert_values_equal(&table, &back);
}

#[test]
fn temporal_logical_tags_roundtrip() {
    let data = Array::from_int64(PrimitiveArray::from_slice(&[1_600_000_000_000, 0, -1]));
    let field = Field::new(
        "ts",
        ArrowType::Timestamp(TimeUnit::Milliseconds, Some("UTC".to_string())),
        false,
        None,
    );
    let date = FieldArray::new(
        Field::new("d", ArrowType::Date32, false, None),
        Array::from_int32(PrimitiveArray::from_slice(&[18_000, 0, -365])),
    );
    let dur = FieldArray::new(
        Field::new("dur", ArrowType::Duration(TimeUnit::Nanoseconds), false, None),
        Array::from_int64(PrimitiveArray::from_slice(&[10, 20, 30])),
    );
    let table = Table::from_cols(vec![FieldArray::new(field.clone(), data), date, dur]);
    let back = roundtrip(&table);
    assert_eq!(back.cols[0].field.dtype, field.dtype);
    assert_eq!(back.cols[1].field.dtype, ArrowType::Date32);
    assert_eq!(
        back.cols[2].field.dtype,
        ArrowType::Duration(TimeUnit::Nanoseconds)
    );
    assert_values_equal(&table, &back);
}

#[test]
fn decimal_roundtrip() {
    let d128 = FieldArray::new(
        Field::new(
            "d128",
            ArrowType::Decimal {
                precision: 38,
                scale: 4,
                bit_width: 128,
            },
            false,
            None,
        ),
        Array::from_int128(PrimitiveArray::from_slice(&[
            1_234_567_890_123_456_789_i128,
            -42,
        ])),
    );
    let table = Table::from_cols(vec![d128]);
    let back = roundtrip(&table);
    assert_eq!(
        back.cols[0].array.value(0),
        Value::Int128(1_234_567_890_123_456_789)
    );
    assert_eq!(back.cols[0].array.value(1), Value::Int128(-42));
}

#[test]
fn null_column_roundtrip() {
    let table = Table::from_cols(vec![
        FieldArray::from_arr("n", Array::NullArray(4)),
        FieldArray::from_arr("x", arr_i64![1, 2, 3, 4]),
    ]);
    let back = roundtrip(&table);
    assert_eq!(back.cols[0].array.len(), 4);
    assert_eq!(back.cols[0].null_count, 4);
    assert_eq!(back.cols[0].array.value(0), Value::Null);
}

#[test]
fn list_roundtrip() {
    let child = Array::from_int64(PrimitiveArray::from_slice(&[1, 2, 3, 4, 5, 6]));
    let list = ListArray::<u32>::from_lengths(
        &[2, 0, 4],
        child,
        Some(minstream::Bitmask::from_bools(&[true, false, true])),
    );
    let table = Table::from_cols(vec![FieldArray::from_arr("xs", Array::from_list32(list))]);
    let back = roundtrip(&table);
    assert_values_equal(&table, &back);
    assert_eq!(back.cols[0].array.value(1), Value::Null);
    match back.cols[0].array.value(2) {
        Value::List(w) => {
            assert_eq!(w.len(), 4);
            assert_eq!(w.value(0), Value::Int(3));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn fixed_size_list_roundtrip() {
    let child = Array::from_float64(PrimitiveArray::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
    let arr = FixedSizeListArray::new(child, 3, None);
    let table = Table::from_cols(vec![FieldArray::from_arr(
        "pairs",
        Array::from_fixed_size_list(arr),
    )]);
    let back = roundtrip(&table);
    assert_values_equal(&table, &back);
}

#[test]
fn struct_roundtrip() {
    let s = StructArray::new(
        vec![
            Array::from_int64(PrimitiveArray::from_opt_slice(&[Some(1), None, Some(3)])),
            Array::from_string32(StringArray::from_slice(&["a", "b", "c"])),
        ],
        Some(minstream::Bitmask::from_bools(&[true, true, false])),
    );
    let field = Field::new(
        "s",
        ArrowType::Struct(vec![
            Field::new("x", ArrowType::Int64, true, None),
            Field::new("y", ArrowType::String, false, None),
        ]),
        true,
        None,
    );
    let table = Table::from_cols(vec![FieldArray::new(field, Array::from_struct(s))]);
    let back = roundtrip(&table);
    assert_values_equal(&table, &back);
    assert_eq!(back.cols[0].array.value(2), Value::Null);
    match back.cols[0].array.value(1) {
        Value::Struct(vs) => {
            assert_eq!(vs[0], Value::Null);
            assert_eq!(vs[1], Value::Str("b"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn map_roundtrip() {
    let keys = Array::from_string32(StringArray::from_slice(&["k1", "k2", "k3"]));
    let vals = Array::from_int64(PrimitiveArray::from_slice(&[10, 20, 30]));
    let entries = Array::from_struct(StructArray::new(vec![keys, vals], None));
    let map = MapArray::from_lengths(&[2, 1], entries, None);
    let entries_field = Field::new(
        "entries",
        ArrowType::Struct(vec![
            Field::new("key", ArrowType::String, false, None),
            Field::new("value", ArrowType::Int64, false, None),
        ]),
        false,
        None,
    );
    let field = Field::new(
        "m",
        ArrowType::Map(Box::new(entries_field), false),
        false,
        None,
    );
    let table = Table::from_cols(vec![FieldArray::new(field, Array::from_map(map))]);
    let back = roundtrip(&table);
    assert_values_equal(&table, &back);
}

#[test]
fn dense_union_roundtrip() {
    // [1i64, 2.0f64, 3i64, 4.0f64, null] as in the union layout contract
    let ints = Array::from_int64(PrimitiveArray::from_opt_slice(&[Some(1), Some(3), None]));
    let floats = Array::from_float64(PrimitiveArray::from_slice(&[2.0, 4.0]));
    let union = UnionArray::new_dense(
        vec![0i8, 1, 0, 1, 0],
        vec![0i32, 0, 1, 1, 2],
        vec![ints, floats],
        vec![0, 1],
    );
    let field = Field::new(
        "u",
        ArrowType::Union {
            mode: minstream::UnionMode::Dense,
            fields: vec![
                Field::new("i", ArrowType::Int64, true, None),
                Field::new("f", ArrowType::Float64, false, None),
            ],
            type_ids: Some(vec![0, 1]),
        },
        false,
        None,
    );
    let table = Table::from_cols(vec![FieldArray::new(field, Array::from_union(union))]);
    let back = roundtrip(&table);

    assert_eq!(back.cols[0].array.value(0), Value::Int(1));
    assert_eq!(back.cols[0].array.value(1), Value::Float(2.0));
    assert_eq!(back.cols[0].array.value(2), Value::Int(3));
    assert_eq!(back.cols[0].array.value(3), Value::Float(4.0));
    assert_eq!(back.cols[0].array.value(4), Value::Null);
    match &back.cols[0].array {
        Array::Union(u) => {
            assert_eq!(u.type_ids.as_slice(), &[0, 1, 0, 1, 0]);
            assert_eq!(u.offsets.as_ref().unwrap().as_slice(), &[0, 0, 1, 1, 2]);
            assert_eq!(u.children[0].len(), 3);
            assert_eq!(u.children[1].len(), 2);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn sparse_union_roundtrip() {
    let a = Array::from_int64(PrimitiveArray::from_slice(&[1, 0, 3]));
    let b = Array::from_string32(StringArray::from_slice(&["", "two", ""]));
    let union = UnionArray::new_sparse(vec![0i8, 1, 0], vec![a, b], vec![0, 1]);
    let field = Field::new(
        "u",
        ArrowType::Union {
            mode: minstream::UnionMode::Sparse,
            fields: vec![
                Field::new("i", ArrowType::Int64, false, None),
                Field::new("s", ArrowType::String, false, None),
            ],
            type_ids: Some(vec![0, 1]),
        },
        false,
        None,
    );
    let table = Table::from_cols(vec![FieldArray::new(field, Array::from_union(union))]);
    let back = roundtrip(&table);
    assert_eq!(back.cols[0].array.value(0), Value::Int(1));
    assert_eq!(back.cols[0].array.value(1), Value::Str("two"));
    assert_eq!(back.cols[0].array.value(2), Value::Int(3));
}

#[test]
fn pre_encoded_dictionary_roundtrip() {
    // a "ref array": the column arrives already pool-encoded
    let indices = NumericArray::Int8(Arc::new(PrimitiveArray::from_opt_slice(&[
        Some(0i8),
        Some(1),
        None,
        Some(0),
    ])));
    let pool = Array::from_string32(StringArray::from_slice(&["low", "high"]));
    let dict = DictionaryArray::from_parts(indices, pool, false);
    let table = Table::from_cols(vec![FieldArray::from_arr(
        "level",
        Array::from_dictionary(dict),
    )]);
    let back = roundtrip(&table);
    assert_eq!(back.cols[0].array.value(0), Value::Str("low"));
    assert_eq!(back.cols[0].array.value(1), Value::Str("high"));
    assert_eq!(back.cols[0].array.value(2), Value::Null);
    assert_eq!(back.cols[0].array.value(3), Value::Str("low"));
    match &back.cols[0].array {
        Array::Dictionary(d) => assert_eq!(d.pool_len(), 2),
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(
        back.cols[0].field.dtype,
        ArrowType::Dictionary(IndexKind::Int8, _)
    ));
}

#[test]
fn dictionary_encode_option_roundtrip() {
    let options = WriteOptions::default().dictionary_encode(true);
    let table = Table::from_cols(vec![FieldArray::from_arr(
        "tag",
        arr_str32!["a", "b", "a", "c", "b"],
    )]);
    let mut writer = TableWriter::new(Vec::new(), options);
    writer.write(&table).unwrap();
    let back = read_table(writer.finish().unwrap()).unwrap();
    // element-wise equal, physically pool-encoded
    for i in 0..table.n_rows() {
        assert_eq!(table.cols[0].array.value(i), back.cols[0].array.value(i));
    }
    assert!(matches!(back.cols[0].array, Array::Dictionary(_)));
}

#[test]
fn nested_dictionary_encode_roundtrip() {
    let child = Array::from_string32(StringArray::from_slice(&["x", "y", "x", "z"]));
    let list = ListArray::<u32>::from_lengths(&[2, 2], child, None);
    let table = Table::from_cols(vec![FieldArray::from_arr("xs", Array::from_list32(list))]);

    let mut options = WriteOptions::default();
    options.dictionary_encode_nested = true;
    let mut writer = TableWriter::new(Vec::new(), options);
    writer.write(&table).unwrap();
    let back = read_table(writer.finish().unwrap()).unwrap();

    match back.cols[0].array.value(1) {
        Value::List(w) => {
            assert_eq!(w.value(0), Value::Str("x"));
            assert_eq!(w.value(1), Value::Str("z"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn schema_and_column_metadata_roundtrip() {
    let mut options = WriteOptions::default();
    options
        .metadata
        .insert("producer".to_string(), "unit-test".to_string());
    options.col_metadata.insert("col1".to_string(), {
        let mut m = std::collections::BTreeMap::new();
        m.insert("unit".to_string(), "metres".to_string());
        m
    });
    let table = Table::from_cols(vec![FieldArray::from_arr("col1", arr_i64![1, 2])]);
    let mut writer = TableWriter::new(Vec::new(), options);
    writer.write(&table).unwrap();
    let back = read_table(writer.finish().unwrap()).unwrap();
    assert_eq!(back.metadata["producer"], "unit-test");
    assert_eq!(back.cols[0].field.metadata["unit"], "metres");
}

#[test]
fn large_lists_option_promotes_offsets() {
    let child = Array::from_int64(PrimitiveArray::from_slice(&[1, 2, 3]));
    let list = ListArray::<u32>::from_lengths(&[1, 2], child, None);
    let table = Table::from_cols(vec![FieldArray::from_arr("xs", Array::from_list32(list))]);
    let mut options = WriteOptions::default();
    options.large_lists = true;
    let mut writer = TableWriter::new(Vec::new(), options);
    writer.write(&table).unwrap();
    let back = read_table(writer.finish().unwrap()).unwrap();
    assert!(matches!(back.cols[0].array, Array::List64(_)));
    assert!(matches!(back.cols[0].field.dtype, ArrowType::LargeList(_)));
    assert_eq!(back.cols[0].array.value(1), table.cols[0].array.value(1));
}

#[test]
fn dense_unions_option_converts_sparse_input() {
    let a = Array::from_int64(PrimitiveArray::from_slice(&[1, 0]));
    let b = Array::from_float64(PrimitiveArray::from_slice(&[0.0, 2.5]));
    let union = UnionArray::new_sparse(vec![0i8, 1], vec![a, b], vec![0, 1]);
    let field = Field::new(
        "u",
        ArrowType::Union {
            mode: minstream::UnionMode::Sparse,
            fields: vec![
                Field::new("i", ArrowType::Int64, false, None),
                Field::new("f", ArrowType::Float64, false, None),
            ],
            type_ids: Some(vec![0, 1]),
        },
        false,
        None,
    );
    let table = Table::from_cols(vec![FieldArray::new(field, Array::from_union(union))]);
    let mut options = WriteOptions::default();
    options.dense_unions = true;
    let mut writer = TableWriter::new(Vec::new(), options);
    writer.write(&table).unwrap();
    let back = read_table(writer.finish().unwrap()).unwrap();
    match &back.cols[0].array {
        Array::Union(u) => {
            assert_eq!(u.mode, minstream::UnionMode::Dense);
            assert_eq!(u.children[0].len(), 1);
            assert_eq!(u.children[1].len(), 1);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(back.cols[0].array.value(0), Value::Int(1));
    assert_eq!(back.cols[0].array.value(1), Value::Float(2.5));
}

#[test]
fn extension_label_roundtrip() {
    minstream::register_extension("test.point2d", ArrowType::FixedSizeBinary(8), None).unwrap();
    let data = Array::from_fixed_binary(FixedSizeBinaryArray::from_slices(
        8,
        &[b"\x01\x00\x00\x00\x02\x00\x00\x00"],
    ));
    let field = Field::new("p", ArrowType::FixedSizeBinary(8), false, None)
        .with_extension("test.point2d", None);
    let table = Table::from_cols(vec![FieldArray::new(field, data)]);
    let back = roundtrip(&table);
    assert_eq!(back.cols[0].field.extension_name(), Some("test.point2d"));
    assert_eq!(back.cols[0].field.dtype, ArrowType::FixedSizeBinary(8));
    assert_values_equal(&table, &back);
}

#[test]
fn unknown_extension_degrades() {
    let field = Field::new("q", ArrowType::Int64, false, None)
        .with_extension("test.never-registered", Some("blob"));
    let table = Table::from_cols(vec![FieldArray::new(field, arr_i64![5, 6])]);
    let back = roundtrip(&table);
    // degrades to the physical type, keeping the label in metadata
    assert_eq!(back.cols[0].field.dtype, ArrowType::Int64);
    assert_eq!(
        back.cols[0].field.extension_name(),
        Some("test.never-registered")
    );
    assert_eq!(back.cols[0].array.value(0), Value::Int(5));
}

#[test]
fn float16_bits_roundtrip() {
    let field = Field::new("h", ArrowType::Float16, false, None);
    let table = Table::from_cols(vec![FieldArray::new(
        field,
        Array::from_float16_bits(PrimitiveArray::from_slice(&[0x3C00u16, 0xC000])),
    )]);
    let back = roundtrip(&table);
    assert_eq!(back.cols[0].field.dtype, ArrowType::Float16);
    assert_eq!(back.cols[0].array.value(0), Value::UInt(0x3C00));
}
