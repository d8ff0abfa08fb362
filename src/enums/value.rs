//! # **Value Module** - *Unified Element Value*
//!
//! Catch-all enum for dynamic element access across every array variant.
//!
//! ## Purpose
//! - One return type for `Array::value`, union routing, dictionary pool
//!   resolution, and table equivalence testing.
//! - Borrows string/binary payloads from the source array; nested elements
//!   surface as cheap [`ArrayV`] windows (inner arrays are `Arc`-shared).

use std::fmt::{Display, Formatter};

use crate::ArrayV;

/// # Value
///
/// A single element from any array.
///
/// Integer lanes normalise to `i64`/`u64`; `Float16` bit patterns surface as
/// `UInt`, `Decimal128` as `Int128`. Equality is element-wise and used by
/// round-trip tests.
#[derive(PartialEq, Clone, Debug, Default)]
pub enum Value<'a> {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Int128(i128),
    Float(f64),
    Str(&'a str),
    Bytes(&'a [u8]),
    /// A list/map element: a window into the child array.
    List(ArrayV),
    /// A struct element: one value per child, in field order.
    Struct(Vec<Value<'a>>),
}

impl Value<'_> {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl Display for Value<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Int128(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "\"{v}\""),
            Value::Bytes(v) => write!(f, "{v:02x?}"),
            Value::List(v) => {
                write!(f, "[")?;
                for i in 0..v.len() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v.value(i))?;
                }
                write!(f, "]")
            }
            Value::Struct(vs) => {
                write!(f, "{{")?;
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}
