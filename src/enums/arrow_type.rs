//! # **ArrowType Module** - *Logical Type Tree*
//!
//! Unified representation of the Apache Arrow data types this crate can
//! interchange.
//!
//! ## Overview
//! - Covers primitives, decimals, temporal types, strings and binaries,
//!   nested lists/structs/maps/unions, and dictionary encoding.
//! - Temporal variants carry unit information; the physical storage stays a
//!   plain integer array and this logical type rides on `Field`.
//! - Nested variants embed their child `Field`s so a schema is a single
//!   value tree.
//!
//! ## Interoperability
//! - Implements a focused subset of the public Arrow format specification;
//!   every variant maps onto one flatbuffer `Type` table
//!   (see `ipc::metadata`).
//!
//! ## Copyright Notice
//! - This crate is not affiliated with the `Apache Arrow` project.
//! - The term `Arrow` is used under fair use to implement the public
//!   interchange format, per <https://www.apache.org/foundation/marks/>.

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::Field;
use crate::enums::time_units::{IntervalUnit, TimeUnit};

/// # ArrowType
///
/// Logical type discriminant used across the crate for schema definitions,
/// type matching and IPC metadata.
///
/// ## Notes
/// - `Date32/Date64`, `Time*`, `Timestamp`, `Duration` and `Interval` are
///   physically integer arrays; this tag preserves their semantics across
///   the wire.
/// - `Decimal` with `bit_width == 128` is physically `i128`;
///   `bit_width == 256` is physically 32-byte fixed binary.
/// - `Dictionary` wraps the *value* type; the pool id and ordering travel on
///   [`Field::dictionary`](crate::Field).
#[derive(PartialEq, Clone, Debug)]
pub enum ArrowType {
    Null,
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    /// Raw IEEE-754 half-float bit patterns in a `u16` lane.
    Float16,
    Float32,
    Float64,
    Decimal {
        precision: usize,
        scale: usize,
        bit_width: usize,
    },
    /// Days since the UNIX epoch, `i32`.
    Date32,
    /// Milliseconds since the UNIX epoch, `i64`.
    Date64,
    Time32(TimeUnit),
    Time64(TimeUnit),
    Timestamp(TimeUnit, Option<String>),
    Duration(TimeUnit),
    Interval(IntervalUnit),
    String,
    LargeString,
    Binary,
    LargeBinary,
    FixedSizeBinary(usize),
    List(Box<Field>),
    LargeList(Box<Field>),
    FixedSizeList(Box<Field>, usize),
    Struct(Vec<Field>),
    /// Entries field (a non-nullable struct of `key`, `value`) plus the
    /// keys-sorted flag.
    Map(Box<Field>, bool),
    Union {
        mode: UnionMode,
        fields: Vec<Field>,
        /// Type code per child; defaults to `0..k` when absent.
        type_ids: Option<Vec<i32>>,
    },
    Dictionary(IndexKind, Box<ArrowType>),
}

/// # UnionMode
///
/// Dense unions carry a per-element offset into the selected child; sparse
/// unions keep every child at full length.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum UnionMode {
    Dense,
    Sparse,
}

/// # IndexKind
///
/// Integer width and signedness of dictionary indices.
///
/// Smaller widths reduce the key column footprint for low-cardinality data;
/// the writer selects a width from pool cardinality (see `ipc::dictionary`).
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum IndexKind {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
}

impl IndexKind {
    #[inline]
    pub fn bit_width(&self) -> usize {
        match self {
            IndexKind::Int8 | IndexKind::UInt8 => 8,
            IndexKind::Int16 | IndexKind::UInt16 => 16,
            IndexKind::Int32 | IndexKind::UInt32 => 32,
            IndexKind::Int64 | IndexKind::UInt64 => 64,
        }
    }

    #[inline]
    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            IndexKind::Int8 | IndexKind::Int16 | IndexKind::Int32 | IndexKind::Int64
        )
    }
}

impl ArrowType {
    /// Returns true for types with child arrays.
    #[inline]
    pub fn is_nested(&self) -> bool {
        matches!(
            self,
            ArrowType::List(_)
                | ArrowType::LargeList(_)
                | ArrowType::FixedSizeList(_, _)
                | ArrowType::Struct(_)
                | ArrowType::Map(_, _)
                | ArrowType::Union { .. }
        )
    }

    /// Child fields of a nested type, empty for flat types.
    pub fn children(&self) -> &[Field] {
        match self {
            ArrowType::List(f) | ArrowType::LargeList(f) | ArrowType::FixedSizeList(f, _) => {
                std::slice::from_ref(f)
            }
            ArrowType::Map(entries, _) => std::slice::from_ref(entries),
            ArrowType::Struct(fields) => fields,
            ArrowType::Union { fields, .. } => fields,
            _ => &[],
        }
    }

    /// Structural equality ignoring nullability and metadata of nested
    /// fields. Used for partition and append compatibility checks.
    pub fn equivalent(&self, other: &ArrowType) -> bool {
        use ArrowType::*;
        match (self, other) {
            (List(a), List(b)) | (LargeList(a), LargeList(b)) => {
                a.dtype.equivalent(&b.dtype)
            }
            (FixedSizeList(a, n), FixedSizeList(b, m)) => n == m && a.dtype.equivalent(&b.dtype),
            (Struct(a), Struct(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|(x, y)| x.name == y.name && x.dtype.equivalent(&y.dtype))
            }
            (Map(a, sa), Map(b, sb)) => sa == sb && a.dtype.equivalent(&b.dtype),
            (
                Union {
                    mode: ma,
                    fields: fa,
                    type_ids: ta,
                },
                Union {
                    mode: mb,
                    fields: fb,
                    type_ids: tb,
                },
            ) => {
                ma == mb
                    && ta == tb
                    && fa.len() == fb.len()
                    && fa
                        .iter()
                        .zip(fb)
                        .all(|(x, y)| x.dtype.equivalent(&y.dtype))
            }
            (Dictionary(ia, va), Dictionary(ib, vb)) => ia == ib && va.equivalent(vb),
            (a, b) => a == b,
        }
    }

    /// The canonical zero value for this type. Non-selected slots of
    /// sparse-union children and null padding in builders hold these.
    pub fn default_value(&self) -> crate::Value<'static> {
        use ArrowType::*;
        match self {
            Null => crate::Value::Null,
            Boolean => crate::Value::Bool(false),
            Int8 | Int16 | Int32 | Int64 | Date32 | Date64 | Time32(_) | Time64(_)
            | Timestamp(_, _) | Duration(_) | Interval(_) => crate::Value::Int(0),
            UInt8 | UInt16 | UInt32 | UInt64 | Float16 => crate::Value::UInt(0),
            Float32 | Float64 => crate::Value::Float(0.0),
            Decimal { .. } => crate::Value::Int128(0),
            String | LargeString => crate::Value::Str(""),
            Binary | LargeBinary | FixedSizeBinary(_) => crate::Value::Bytes(&[]),
            _ => crate::Value::Null,
        }
    }

    /// Byte width of the physical lane for fixed-width types, `None` for
    /// variable-size and nested layouts.
    pub fn primitive_width(&self) -> Option<usize> {
        use ArrowType::*;
        Some(match self {
            Int8 | UInt8 => 1,
            Int16 | UInt16 | Float16 => 2,
            Int32 | UInt32 | Float32 | Date32 | Time32(_) | Interval(IntervalUnit::YearMonth) => 4,
            Int64 | UInt64 | Float64 | Date64 | Time64(_) | Timestamp(_, _) | Duration(_)
            | Interval(IntervalUnit::DayTime) => 8,
            Decimal { bit_width: 128, .. } => 16,
            _ => return None,
        })
    }
}

impl Display for ArrowType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        use ArrowType::*;
        match self {
            Null => write!(f, "Null"),
            Boolean => write!(f, "Boolean"),
            Int8 => write!(f, "Int8"),
            Int16 => write!(f, "Int16"),
            Int32 => write!(f, "Int32"),
            Int64 => write!(f, "Int64"),
            UInt8 => write!(f, "UInt8"),
            UInt16 => write!(f, "UInt16"),
            UInt32 => write!(f, "UInt32"),
            UInt64 => write!(f, "UInt64"),
            Float16 => write!(f, "Float16"),
            Float32 => write!(f, "Float32"),
            Float64 => write!(f, "Float64"),
            Decimal {
                precision,
                scale,
                bit_width,
            } => write!(f, "Decimal{bit_width}({precision}, {scale})"),
            Date32 => write!(f, "Date32"),
            Date64 => write!(f, "Date64"),
            Time32(u) => write!(f, "Time32({u})"),
            Time64(u) => write!(f, "Time64({u})"),
            Timestamp(u, tz) => match tz {
                Some(tz) => write!(f, "Timestamp({u}, {tz})"),
                None => write!(f, "Timestamp({u})"),
            },
            Duration(u) => write!(f, "Duration({u})"),
            Interval(u) => write!(f, "Interval({u})"),
            String => write!(f, "String"),
            LargeString => write!(f, "LargeString"),
            Binary => write!(f, "Binary"),
            LargeBinary => write!(f, "LargeBinary"),
            FixedSizeBinary(n) => write!(f, "FixedSizeBinary({n})"),
            List(field) => write!(f, "List({})", field.dtype),
            LargeList(field) => write!(f, "LargeList({})", field.dtype),
            FixedSizeList(field, n) => write!(f, "FixedSizeList({}, {n})", field.dtype),
            Struct(fields) => {
                write!(f, "Struct{{")?;
                for (i, c) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", c.name, c.dtype)?;
                }
                write!(f, "}}")
            }
            Map(entries, _) => write!(f, "Map({})", entries.dtype),
            Union { mode, fields, .. } => {
                write!(
                    f,
                    "{}Union(",
                    if *mode == UnionMode::Dense {
                        "Dense"
                    } else {
                        "Sparse"
                    }
                )?;
                for (i, c) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", c.dtype)?;
                }
                write!(f, ")")
            }
            Dictionary(idx, value) => write!(f, "Dictionary<{:?}>({})", idx, value),
        }
    }
}
