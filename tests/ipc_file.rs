//! File-format framing, footer indexing, alignment and compression
//! behaviour.

use arrow_format::ipc;

use minstream::ipc::compression::CompressionCodec;
use minstream::ipc::envelope::EnvelopeCursor;
use minstream::ipc::metadata::{decode_footer, decode_message};
use minstream::ipc::reader::{read_file, read_table};
use minstream::ipc::writer::{Alignment, TableWriter, WriteOptions, write_partitions};
use minstream::{
    Array, FieldArray, PrimitiveArray, SharedBuffer, StringArray, Table, Value, arr_str32,
};

fn one_col(values: &[i64]) -> Table {
    Table::from_cols(vec![FieldArray::from_arr(
        "col1",
        Array::from_int64(PrimitiveArray::from_slice(values)),
    )])
}

fn write_file(partitions: &[Table], options: WriteOptions) -> Vec<u8> {
    let mut writer = TableWriter::new(Vec::new(), options.file(true));
    for p in partitions {
        writer.write(p).unwrap();
    }
    writer.finish().unwrap()
}

#[test]
fn file_framing_magics_and_footer() {
    let bytes = write_file(&[one_col(&[1, 2, 3])], WriteOptions::default());

    // leading magic + padding: 41 52 52 4F 57 31 00 00
    assert_eq!(&bytes[..8], b"ARROW1\0\0");
    // trailing magic
    assert_eq!(&bytes[bytes.len() - 6..], b"ARROW1");

    // the trailing i32 indexes the footer flatbuffer
    let footer_len_pos = bytes.len() - 6 - 4;
    let footer_len =
        i32::from_le_bytes(bytes[footer_len_pos..footer_len_pos + 4].try_into().unwrap()) as usize;
    let footer_start = footer_len_pos - footer_len;
    let (schema, dict_blocks, record_blocks) =
        decode_footer(&bytes[footer_start..footer_len_pos]).unwrap();
    assert_eq!(schema.len(), 1);
    assert_eq!(schema.field(0).name, "col1");
    assert!(dict_blocks.is_empty());
    assert_eq!(record_blocks.len(), 1);

    // the block points at a real record-batch message
    let region = SharedBuffer::from_vec(bytes.clone());
    let mut cursor = EnvelopeCursor::with_bounds(region, 0, footer_start);
    cursor.seek(record_blocks[0].offset as usize);
    let meta = cursor.next_metadata().unwrap().unwrap().as_slice().to_vec();
    let message = decode_message(&meta).unwrap();
    assert!(matches!(
        message.header().unwrap().unwrap(),
        ipc::MessageHeaderRef::RecordBatch(_)
    ));

    let table = read_file(bytes).unwrap();
    assert_eq!(table.n_rows(), 3);
}

#[test]
fn file_format_autodetected_by_read_table() {
    let bytes = write_file(&[one_col(&[7, 8])], WriteOptions::default());
    let table = read_table(bytes).unwrap();
    assert_eq!(table.cols[0].array.value(1), Value::Int(8));
}

#[test]
fn short_or_mismatched_regions_parse_as_stream() {
    // below the file-format minimum this must take the stream path and
    // fail on framing, not on footer parsing
    let err = read_table(b"ARROW1\0\0ARROW1".to_vec()).unwrap_err();
    assert!(matches!(err, minstream::MinstreamError::MalformedFrame { .. }));
}

#[test]
fn multi_batch_file_roundtrip() {
    let bytes = write_file(
        &[one_col(&[1, 2]), one_col(&[3]), one_col(&[4, 5])],
        WriteOptions::default(),
    );
    let table = read_file(bytes).unwrap();
    assert_eq!(table.n_rows(), 5);
    for i in 0..5 {
        assert_eq!(table.cols[0].array.value(i), Value::Int(i as i64 + 1));
    }
}

#[test]
fn file_with_dictionaries_indexes_both_block_lists() {
    let p1 = Table::from_cols(vec![FieldArray::from_arr("tag", arr_str32!["a", "b"])]);
    let p2 = Table::from_cols(vec![FieldArray::from_arr("tag", arr_str32!["c"])]);
    let bytes = write_file(
        &[p1, p2],
        WriteOptions::default().dictionary_encode(true),
    );

    let footer_len_pos = bytes.len() - 10;
    let footer_len =
        i32::from_le_bytes(bytes[footer_len_pos..footer_len_pos + 4].try_into().unwrap()) as usize;
    let (_, dict_blocks, record_blocks) =
        decode_footer(&bytes[footer_len_pos - footer_len..footer_len_pos]).unwrap();
    // base dictionary + one delta, two record batches
    assert_eq!(dict_blocks.len(), 2);
    assert_eq!(record_blocks.len(), 2);

    let table = read_file(bytes).unwrap();
    assert_eq!(table.n_rows(), 3);
    assert_eq!(table.cols[0].array.value(2), Value::Str("c"));
}

/// Collects `(offset, length, first_8_prefix)` for every buffer of the
/// first record batch in a stream/file region.
fn record_batch_buffers(bytes: &[u8]) -> Vec<(i64, i64, Option<i64>)> {
    let region = SharedBuffer::from_vec(bytes.to_vec());
    let mut cursor = EnvelopeCursor::new(region.clone());
    // file header, if present
    if bytes.starts_with(b"ARROW1\0\0") {
        cursor.seek(8);
    }
    loop {
        let meta = cursor
            .next_metadata()
            .unwrap()
            .expect("record batch not found")
            .as_slice()
            .to_vec();
        let message = decode_message(&meta).unwrap();
        let body_len = message.body_length().unwrap() as usize;
        let body = cursor.take_body(body_len).unwrap();
        if let ipc::MessageHeaderRef::RecordBatch(batch) = message.header().unwrap().unwrap() {
            let body = body.as_slice();
            return batch
                .buffers()
                .unwrap()
                .unwrap()
                .iter()
                .map(|b| {
                    let prefix = (b.length() >= 8).then(|| {
                        let lo = b.offset() as usize;
                        i64::from_le_bytes(body[lo..lo + 8].try_into().unwrap())
                    });
                    (b.offset(), b.length(), prefix)
                })
                .collect();
        }
    }
}

#[cfg(feature = "zstd")]
#[test]
fn alignment_64_with_zstd_compression() {
    // 10k i64, alignment 64, zstd: offsets divisible by 64, compressed
    // buffers carry a little-endian i64 uncompressed-length prefix
    let values: Vec<i64> = (0..10_000).collect();
    let table = one_col(&values);
    let options = WriteOptions::default()
        .alignment(Alignment::Align64)
        .compression(Some(CompressionCodec::Zstd));
    let bytes = write_file(&[table.clone()], options);

    for (offset, _len, prefix) in record_batch_buffers(&bytes) {
        assert_eq!(offset % 64, 0, "buffer offset {offset} not 64-byte aligned");
        if let Some(prefix) = prefix {
            // the values buffer holds 10k × 8 bytes uncompressed
            assert!(prefix == -1 || prefix > 0);
        }
    }
    let values_prefix = record_batch_buffers(&bytes)
        .iter()
        .map(|(_, _, p)| p.unwrap_or(0))
        .max()
        .unwrap();
    assert_eq!(values_prefix, 80_000);

    let back = read_table(bytes).unwrap();
    assert_eq!(back.n_rows(), 10_000);
    assert_eq!(back.cols[0].array.value(9_999), Value::Int(9_999));
}

#[cfg(feature = "lz4")]
#[test]
fn lz4_stream_roundtrip() {
    let values: Vec<i64> = (0..5_000).map(|v| v % 17).collect();
    let table = one_col(&values);
    let options = WriteOptions::default().compression(Some(CompressionCodec::Lz4Frame));
    let mut writer = TableWriter::new(Vec::new(), options);
    writer.write(&table).unwrap();
    let bytes = writer.finish().unwrap();

    let back = read_table(bytes).unwrap();
    assert_eq!(back.n_rows(), 5_000);
    for i in (0..5_000).step_by(997) {
        assert_eq!(back.cols[0].array.value(i), table.cols[0].array.value(i));
    }
}

#[cfg(feature = "zstd")]
#[test]
fn compressed_strings_roundtrip() {
    let values: Vec<String> = (0..500).map(|i| format!("value-{}", i % 7)).collect();
    let refs: Vec<&str> = values.iter().map(|s| s.as_str()).collect();
    let table = Table::from_cols(vec![FieldArray::from_arr(
        "s",
        Array::from_string32(StringArray::from_slice(&refs)),
    )]);
    let options = WriteOptions::default().compression(Some(CompressionCodec::Zstd));
    let mut writer = TableWriter::new(Vec::new(), options);
    writer.write(&table).unwrap();
    let back = read_table(writer.finish().unwrap()).unwrap();
    assert_eq!(back.cols[0].array.value(499), Value::Str("value-2"));
}

#[test]
fn alignment_8_default_buffers() {
    let bytes = write_file(&[one_col(&[1, 2, 3])], WriteOptions::default());
    for (offset, _, _) in record_batch_buffers(&bytes) {
        assert_eq!(offset % 8, 0);
    }
}

#[test]
fn parallel_file_write_matches_sequential() {
    let partitions: Vec<Table> = (0..5).map(|i| one_col(&[i, i * 2])).collect();
    let sequential = write_partitions(
        Vec::new(),
        partitions.clone(),
        WriteOptions::default().file(true).n_tasks(1),
    )
    .unwrap();
    let parallel = write_partitions(
        Vec::new(),
        partitions,
        WriteOptions::default().file(true).n_tasks(3),
    )
    .unwrap();
    assert_eq!(sequential, parallel);
    let table = read_table(parallel).unwrap();
    assert_eq!(table.n_rows(), 10);
}

#[test]
fn empty_file_roundtrip() {
    let bytes = write_file(&[], WriteOptions::default());
    assert_eq!(&bytes[..8], b"ARROW1\0\0");
    let table = read_file(bytes).unwrap();
    assert!(table.is_empty());
}
