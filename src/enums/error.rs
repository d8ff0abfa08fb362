//! # **Error Module** - Custom *Minstream* Error Type
//!
//! Defines the unified error type for the crate.
//!
//! ## Covers
//! - IPC framing faults, schema incompatibilities, extension registry
//!   collisions, unsupported type tags and codecs, invalid metadata,
//!   nesting-depth overruns, aborted parallel writes, and IO.
//! - Implements `Display` for readable output and `Error` for integration
//!   with standard Rust error handling.

use std::error::Error;
use std::fmt;
use std::io;

/// Crate-wide result alias.
pub type Result<T, E = MinstreamError> = std::result::Result<T, E>;

/// Catch all error type for `Minstream`.
#[derive(Debug)]
pub enum MinstreamError {
    /// Bad continuation marker, negative length, truncated buffer or
    /// misaligned offset in an IPC byte region.
    MalformedFrame {
        message: String,
    },
    /// Incompatible schemas across partitions or reader inputs.
    SchemaMismatch {
        message: String,
    },
    /// Extension registry collision: a name re-registered with a different
    /// physical type.
    SchemaConflict {
        name: String,
        message: String,
    },
    /// Unknown flatbuffer type tag, or a compression codec this build does
    /// not carry.
    UnsupportedType {
        message: String,
    },
    /// Bit widths outside the allowed set, non-concrete Map key/value types,
    /// and similar metadata-level violations.
    InvalidMetadata {
        message: String,
    },
    /// Nesting beyond the configured `max_depth`.
    MaxDepthExceeded {
        limit: usize,
    },
    /// Array index or buffer access out of bounds.
    OutOfBounds {
        index: usize,
        len: usize,
    },
    /// Aggregated task failure inside the writer pipeline, carrying the
    /// partition index (1-based) that failed first.
    WriteAborted {
        partition: usize,
        message: String,
    },
    Io(io::Error),
}

impl fmt::Display for MinstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MinstreamError::MalformedFrame { message } => {
                write!(f, "Malformed frame: {}", message)
            }
            MinstreamError::SchemaMismatch { message } => {
                write!(f, "Schema mismatch: {}", message)
            }
            MinstreamError::SchemaConflict { name, message } => {
                write!(f, "Schema conflict for extension '{}': {}", name, message)
            }
            MinstreamError::UnsupportedType { message } => {
                write!(f, "Unsupported type: {}", message)
            }
            MinstreamError::InvalidMetadata { message } => {
                write!(f, "Invalid metadata: {}", message)
            }
            MinstreamError::MaxDepthExceeded { limit } => {
                write!(f, "Nested type exceeds maximum depth of {}.", limit)
            }
            MinstreamError::OutOfBounds { index, len } => {
                write!(f, "Index out of bounds: {} >= {}.", index, len)
            }
            MinstreamError::WriteAborted { partition, message } => {
                write!(f, "Write aborted at partition {}: {}", partition, message)
            }
            MinstreamError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl Error for MinstreamError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MinstreamError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for MinstreamError {
    fn from(e: io::Error) -> Self {
        MinstreamError::Io(e)
    }
}

impl From<arrow_format::ipc::planus::Error> for MinstreamError {
    fn from(e: arrow_format::ipc::planus::Error) -> Self {
        MinstreamError::MalformedFrame {
            message: format!("flatbuffer decode: {e}"),
        }
    }
}

/// Shorthand constructor for [`MinstreamError::MalformedFrame`].
pub fn malformed(msg: impl Into<String>) -> MinstreamError {
    MinstreamError::MalformedFrame {
        message: msg.into(),
    }
}

/// Shorthand constructor for [`MinstreamError::InvalidMetadata`].
pub fn invalid_metadata(msg: impl Into<String>) -> MinstreamError {
    MinstreamError::InvalidMetadata {
        message: msg.into(),
    }
}

/// Shorthand constructor for [`MinstreamError::UnsupportedType`].
pub fn unsupported(msg: impl Into<String>) -> MinstreamError {
    MinstreamError::UnsupportedType {
        message: msg.into(),
    }
}

/// Shorthand constructor for [`MinstreamError::SchemaMismatch`].
pub fn schema_mismatch(msg: impl Into<String>) -> MinstreamError {
    MinstreamError::SchemaMismatch {
        message: msg.into(),
    }
}
