//! Stream-format framing behaviour: terminators, malformed input, lazy
//! iteration, multi-input concatenation, dictionary deltas and append.

use std::io::{Seek, SeekFrom, Write};

use arrow_format::ipc;

use minstream::ipc::envelope::EnvelopeCursor;
use minstream::ipc::metadata::decode_message;
use minstream::ipc::reader::{TableStream, read_table, read_table_multi};
use minstream::ipc::writer::{TableWriter, WriteOptions, append, write_partitions};
use minstream::{
    Array, FieldArray, MinstreamError, PrimitiveArray, SharedBuffer, Table, Value, arr_i64,
    arr_str32,
};

fn one_col(name: &str, values: &[i64]) -> Table {
    Table::from_cols(vec![FieldArray::from_arr(
        name,
        Array::from_int64(PrimitiveArray::from_slice(values)),
    )])
}

fn write_stream(partitions: &[Table]) -> Vec<u8> {
    let mut writer = TableWriter::new(Vec::new(), WriteOptions::default());
    for p in partitions {
        writer.write(p).unwrap();
    }
    writer.finish().unwrap()
}

#[test]
fn empty_region_yields_empty_table() {
    let table = read_table(Vec::new()).unwrap();
    assert_eq!(table.n_cols(), 0);
    assert_eq!(table.n_rows(), 0);
}

#[test]
fn terminator_ends_stream() {
    let bytes = write_stream(&[one_col("c", &[1, 2])]);
    // terminator frame: continuation + zero length at the tail
    assert_eq!(&bytes[bytes.len() - 8..bytes.len() - 4], &[0xFF; 4]);
    assert_eq!(&bytes[bytes.len() - 4..], &0i32.to_le_bytes());
    let table = read_table(bytes).unwrap();
    assert_eq!(table.n_rows(), 2);
}

#[test]
fn garbage_leading_bytes_rejected() {
    let err = read_table(b"not an arrow stream".to_vec()).unwrap_err();
    assert!(matches!(err, MinstreamError::MalformedFrame { .. }));
}

#[test]
fn truncated_stream_rejected() {
    let mut bytes = write_stream(&[one_col("c", &[1, 2, 3])]);
    bytes.truncate(bytes.len() - 20);
    assert!(read_table(bytes).is_err());
}

#[test]
fn lazy_stream_yields_batches() {
    let bytes = write_stream(&[one_col("c", &[1, 2]), one_col("c", &[3])]);
    let mut stream = TableStream::new(bytes).unwrap();
    assert_eq!(stream.schema().len(), 1);
    let b1 = stream.next().unwrap().unwrap();
    assert_eq!(b1.n_rows(), 2);
    let b2 = stream.next().unwrap().unwrap();
    assert_eq!(b2.n_rows(), 1);
    assert_eq!(b2.cols[0].array.value(0), Value::Int(3));
    assert!(stream.next().is_none());
}

#[test]
fn multi_input_concat() {
    let a = write_stream(&[one_col("c", &[1, 2])]);
    let b = write_stream(&[one_col("c", &[3, 4, 5])]);
    let table = read_table_multi([a, b]).unwrap();
    assert_eq!(table.n_rows(), 5);
    assert_eq!(table.cols[0].array.value(4), Value::Int(5));
}

#[test]
fn multi_input_schema_mismatch() {
    let a = write_stream(&[one_col("c", &[1])]);
    let b = write_stream(&[one_col("other", &[2])]);
    assert!(matches!(
        read_table_multi([a, b]),
        Err(MinstreamError::SchemaMismatch { .. })
    ));
}

#[test]
fn multi_input_dictionary_pools_merge() {
    let make = |values: &[&str]| {
        let table = Table::from_cols(vec![FieldArray::from_arr(
            "tag",
            Array::from_string32(minstream::StringArray::from_slice(values)),
        )]);
        let mut writer =
            TableWriter::new(Vec::new(), WriteOptions::default().dictionary_encode(true));
        writer.write(&table).unwrap();
        writer.finish().unwrap()
    };
    // independent streams get independent pools
    let a = make(&["x", "y"]);
    let b = make(&["y", "z"]);
    let table = read_table_multi([a, b]).unwrap();
    assert_eq!(table.n_rows(), 4);
    assert_eq!(table.cols[0].array.value(0), Value::Str("x"));
    assert_eq!(table.cols[0].array.value(2), Value::Str("y"));
    assert_eq!(table.cols[0].array.value(3), Value::Str("z"));
}

/// Walks every frame of a stream, returning the decoded header kinds.
fn frame_kinds(bytes: &[u8]) -> Vec<String> {
    let mut cursor = EnvelopeCursor::new(SharedBuffer::from_vec(bytes.to_vec()));
    let mut kinds = Vec::new();
    while let Some(meta) = cursor.next_metadata().unwrap() {
        let meta = meta.as_slice().to_vec();
        let message = decode_message(&meta).unwrap();
        let body_length = message.body_length().unwrap();
        cursor.take_body(body_length as usize).unwrap();
        let kind = match message.header().unwrap().unwrap() {
            ipc::MessageHeaderRef::Schema(_) => "schema".to_string(),
            ipc::MessageHeaderRef::RecordBatch(_) => "record".to_string(),
            ipc::MessageHeaderRef::DictionaryBatch(d) => {
                let len = d
                    .data()
                    .unwrap()
                    .unwrap()
                    .length()
                    .unwrap();
                format!(
                    "dictionary(id={}, n={}, delta={})",
                    d.id().unwrap(),
                    len,
                    d.is_delta().unwrap()
                )
            }
            _ => "other".to_string(),
        };
        kinds.push(kind);
    }
    kinds
}

#[test]
fn dictionary_delta_message_sequence() {
    // partitions share one dict-encoded column; pool {a, b} then + {c}
    let p1 = Table::from_cols(vec![FieldArray::from_arr("tag", arr_str32!["a", "b", "a"])]);
    let p2 = Table::from_cols(vec![FieldArray::from_arr("tag", arr_str32!["b", "c"])]);
    let mut writer = TableWriter::new(Vec::new(), WriteOptions::default().dictionary_encode(true));
    writer.write(&p1).unwrap();
    writer.write(&p2).unwrap();
    let bytes = writer.finish().unwrap();

    assert_eq!(
        frame_kinds(&bytes),
        vec![
            "schema",
            "dictionary(id=0, n=2, delta=false)",
            "record",
            "dictionary(id=0, n=1, delta=true)",
            "record",
        ]
    );

    let table = read_table(bytes).unwrap();
    assert_eq!(table.n_rows(), 5);
    assert_eq!(table.cols[0].array.value(4), Value::Str("c"));
}

#[test]
fn repeated_partition_produces_no_delta() {
    let p = Table::from_cols(vec![FieldArray::from_arr("tag", arr_str32!["a", "b"])]);
    let mut writer = TableWriter::new(Vec::new(), WriteOptions::default().dictionary_encode(true));
    writer.write(&p).unwrap();
    writer.write(&p).unwrap();
    writer.write(&p).unwrap();
    let bytes = writer.finish().unwrap();
    let kinds = frame_kinds(&bytes);
    let deltas = kinds.iter().filter(|k| k.contains("delta=true")).count();
    assert_eq!(deltas, 0);
    let dicts = kinds.iter().filter(|k| k.starts_with("dictionary")).count();
    assert_eq!(dicts, 1);
}

#[test]
fn parallel_matches_sequential_bytes() {
    let partitions: Vec<Table> = (0..6)
        .map(|i| one_col("c", &[i, i + 1, i + 2]))
        .collect();
    let sequential = write_partitions(
        Vec::new(),
        partitions.clone(),
        WriteOptions::default().n_tasks(1),
    )
    .unwrap();
    let parallel = write_partitions(
        Vec::new(),
        partitions,
        WriteOptions::default().n_tasks(4),
    )
    .unwrap();
    assert_eq!(sequential, parallel);
}

#[test]
fn parallel_dictionary_deltas_stay_ordered() {
    let partitions: Vec<Table> = vec![
        Table::from_cols(vec![FieldArray::from_arr("tag", arr_str32!["a"])]),
        Table::from_cols(vec![FieldArray::from_arr("tag", arr_str32!["a", "b"])]),
        Table::from_cols(vec![FieldArray::from_arr("tag", arr_str32!["c", "a"])]),
    ];
    let bytes = write_partitions(
        Vec::new(),
        partitions,
        WriteOptions::default().dictionary_encode(true).n_tasks(3),
    )
    .unwrap();
    let table = read_table(bytes).unwrap();
    assert_eq!(table.n_rows(), 5);
    let expect = ["a", "a", "b", "c", "a"];
    for (i, s) in expect.iter().enumerate() {
        assert_eq!(table.cols[0].array.value(i), Value::Str(s));
    }
}

#[test]
fn parallel_abort_carries_partition_index() {
    // partition 3 flips schema; the pipeline must abort with its index
    let partitions = vec![
        one_col("c", &[1]),
        one_col("c", &[2]),
        one_col("other", &[3]),
        one_col("c", &[4]),
    ];
    let err = write_partitions(
        Vec::new(),
        partitions,
        WriteOptions::default().n_tasks(4),
    )
    .unwrap_err();
    match err {
        MinstreamError::WriteAborted { partition, .. } => assert_eq!(partition, 3),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn append_resumes_stream() {
    let mut file = tempfile::tempfile().unwrap();
    let bytes = write_stream(&[one_col("c", &[1, 2])]);
    file.write_all(&bytes).unwrap();
    file.flush().unwrap();

    append(&mut file, [one_col("c", &[3, 4])], WriteOptions::default()).unwrap();

    file.seek(SeekFrom::Start(0)).unwrap();
    let mut all = Vec::new();
    std::io::Read::read_to_end(&mut file, &mut all).unwrap();
    let table = read_table(all).unwrap();
    assert_eq!(table.n_rows(), 4);
    assert_eq!(table.cols[0].array.value(3), Value::Int(4));
}

#[test]
fn append_preserves_dictionary_pools() {
    let mut file = tempfile::tempfile().unwrap();
    let p1 = Table::from_cols(vec![FieldArray::from_arr("tag", arr_str32!["a", "b"])]);
    let mut writer = TableWriter::new(Vec::new(), WriteOptions::default().dictionary_encode(true));
    writer.write(&p1).unwrap();
    file.write_all(&writer.finish().unwrap()).unwrap();

    let p2 = Table::from_cols(vec![FieldArray::from_arr("tag", arr_str32!["b", "c"])]);
    append(
        &mut file,
        [p2],
        WriteOptions::default().dictionary_encode(true),
    )
    .unwrap();

    file.seek(SeekFrom::Start(0)).unwrap();
    let mut all = Vec::new();
    std::io::Read::read_to_end(&mut file, &mut all).unwrap();
    // the resumed pool keeps ids: one base dictionary, one delta
    let kinds = frame_kinds(&all);
    assert_eq!(
        kinds,
        vec![
            "schema",
            "dictionary(id=0, n=2, delta=false)",
            "record",
            "dictionary(id=0, n=1, delta=true)",
            "record",
        ]
    );
    let table = read_table(all).unwrap();
    assert_eq!(table.n_rows(), 4);
    assert_eq!(table.cols[0].array.value(3), Value::Str("c"));
}

#[test]
fn append_rejects_file_format() {
    let mut file = tempfile::tempfile().unwrap();
    let table = one_col("c", &[1]);
    let mut writer = TableWriter::new(Vec::new(), WriteOptions::default().file(true));
    writer.write(&table).unwrap();
    file.write_all(&writer.finish().unwrap()).unwrap();

    let err = append(&mut file, [one_col("c", &[2])], WriteOptions::default()).unwrap_err();
    assert!(matches!(err, MinstreamError::MalformedFrame { .. }));
}

#[test]
fn append_rejects_mismatched_schema() {
    let mut file = tempfile::tempfile().unwrap();
    file.write_all(&write_stream(&[one_col("c", &[1])])).unwrap();
    let err = append(
        &mut file,
        [one_col("other", &[2])],
        WriteOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, MinstreamError::SchemaMismatch { .. }));
}

#[test]
fn empty_partition_sequence_writes_valid_stream() {
    let bytes = write_partitions(
        Vec::new(),
        Vec::<Table>::new(),
        WriteOptions::default().n_tasks(2),
    )
    .unwrap();
    let table = read_table(bytes).unwrap();
    assert!(table.is_empty());
}
