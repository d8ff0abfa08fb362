//! Shorthand aliases used throughout the crate.

use crate::Table;

/// Logical element count.
pub type Length = usize;

/// Logical element offset.
pub type Offset = usize;

/// A `Table` plays the role of an Apache Arrow `RecordBatch`.
pub type RecordBatch = Table;
