//! # **Minstream** – Apache Arrow Columnar Interchange for Rust
//!
//! Implementation of the Apache Arrow in-memory format together with its
//! IPC (streaming and file) serialization: interpret a byte region as
//! strongly-typed, zero-copy columnar arrays, iterate or partition it as
//! record batches, and serialize tabular data back into the same byte
//! format, optionally compressed.
//!
//! ## Key Features
//! - **Zero-copy reads** — arrays are views over the input byte region.
//! - **Streaming and file format** — both directions, metadata version V5
//!   on write, V4/V5 on read.
//! - **Dictionary encoding** — stream-wide pool identity, delta updates,
//!   cardinality-based index widths.
//! - **Ordered-parallel writer** — record batches encode concurrently,
//!   bytes land in strict partition order.
//! - **Extension types** — label-based logical overlays over physical
//!   layouts.
//! - **64-byte aligned** owned buffers for SIMD-friendly downstream
//!   compute.
//!
//! ## Compatibility
//! Implements Apache Arrow's documented memory layouts and IPC framing
//! while simplifying some APIs. Learn more about Apache Arrow at:
//! <https://arrow.apache.org/overview/>.
//!
//! This crate is not affiliated with Apache Arrow or the Apache Software
//! Foundation. *Apache Arrow* is a registered trademark of the ASF,
//! referenced under fair use.
//!
//! ## Example
//! ```rust
//! use minstream::{FieldArray, Table, arr_i64, arr_str32};
//! use minstream::ipc::writer::{TableWriter, WriteOptions};
//! use minstream::ipc::reader::read_table;
//!
//! let col1 = FieldArray::from_arr("numbers", arr_i64![1, 2, 3]);
//! let col2 = FieldArray::from_arr("letters", arr_str32!["x", "y", "z"]);
//! let table = Table::new("demo".into(), Some(vec![col1, col2]));
//!
//! let mut writer = TableWriter::new(Vec::new(), WriteOptions::default());
//! writer.write(&table).unwrap();
//! let bytes = writer.finish().unwrap();
//!
//! let back = read_table(bytes).unwrap();
//! assert_eq!(back.n_rows(), 3);
//! ```

/// **Array**, **NumericArray**, **TextArray**, **Value** - *the high-level
/// array containers and element values.*
pub mod enums {
    pub mod array;
    pub mod arrow_type;
    pub mod error;
    pub mod time_units;
    pub mod value;
    pub mod collections {
        pub mod numeric_array;
        pub mod text_array;
    }
}

/// **Table**, **Field**, **Buffer**, **Vec64** - *the low-level storage,
/// metadata and container types.*
pub mod structs {
    pub mod variants {
        pub mod binary;
        pub mod boolean;
        pub mod dictionary;
        pub mod fixed_size_list;
        pub mod list;
        pub mod map;
        pub mod primitive;
        pub mod string;
        pub mod struct_;
        pub mod union;
    }
    pub mod views {
        pub mod array_view;
    }
    pub mod bitmask;
    pub mod buffer;
    pub mod field;
    pub mod field_array;
    pub mod schema;
    pub mod shared_buffer;
    pub mod table;
    pub mod vec64;
}

/// **IPC** - *the interchange codec: framing, metadata, reader, writer,
/// dictionaries, compression, and the ordered pipeline.*
pub mod ipc {
    pub mod compression;
    pub mod dictionary;
    pub mod envelope;
    pub mod metadata;
    pub mod pipeline;
    pub mod reader;
    pub mod writer;
}

/// **Type Standardisation** - `MaskedArray`, `Print` traits + type unions.
pub mod traits {
    pub mod masked_array;
    pub mod print;
    pub mod type_unions;
}

pub mod aliases;
pub mod extension;
pub mod macros;
pub mod utils;

pub use aliases::{Length, Offset, RecordBatch};

pub use enums::array::Array;
pub use enums::arrow_type::{ArrowType, IndexKind, UnionMode};
pub use enums::collections::numeric_array::NumericArray;
pub use enums::collections::text_array::TextArray;
pub use enums::error::{MinstreamError, Result};
pub use enums::time_units::{IntervalUnit, TimeUnit};
pub use enums::value::Value;

pub use structs::bitmask::Bitmask;
pub use structs::buffer::Buffer;
pub use structs::field::{DictionaryEncoding, Field};
pub use structs::field_array::FieldArray;
pub use structs::schema::Schema;
pub use structs::shared_buffer::SharedBuffer;
pub use structs::table::Table;
pub use structs::variants::binary::{BinaryArray, FixedSizeBinaryArray};
pub use structs::variants::boolean::BooleanArray;
pub use structs::variants::dictionary::DictionaryArray;
pub use structs::variants::fixed_size_list::FixedSizeListArray;
pub use structs::variants::list::ListArray;
pub use structs::variants::map::MapArray;
pub use structs::variants::primitive::PrimitiveArray;
pub use structs::variants::string::StringArray;
pub use structs::variants::struct_::StructArray;
pub use structs::variants::union::UnionArray;
pub use structs::vec64::Vec64;
pub use structs::views::array_view::ArrayV;

pub use extension::{
    Extension, ExtensionCast, lookup_extension, register_extension, register_extension_with,
};
pub use traits::masked_array::MaskedArray;
pub use traits::print::Print;
pub use traits::type_unions::{Float, Integer, Primitive};
