//! # **Envelope Module** - *IPC Message Framing*
//!
//! The encapsulated message format shared by the streaming and file
//! formats:
//!
//! ```text
//! [continuation: u32 = 0xFFFFFFFF]
//! [metadata_length: i32, little-endian]
//! [metadata_flatbuffer: bytes, padded to 8]
//! [body: bytes, padded to the configured alignment]
//! ```
//!
//! A `metadata_length` of 0 after a continuation marks end-of-stream. File
//! format regions additionally open with `ARROW1\0\0` and close with the
//! footer flatbuffer, its `i32` length and the trailing `ARROW1` magic.

use std::io::Write;

use crate::enums::error::{Result, malformed};
use crate::structs::shared_buffer::SharedBuffer;
use crate::utils::pad_to;

/// Continuation marker preceding every message length.
pub const CONTINUATION_MARKER: [u8; 4] = 0xFFFF_FFFFu32.to_le_bytes();

/// Magic bytes framing the file format.
pub const ARROW_MAGIC: [u8; 6] = *b"ARROW1";

/// Leading file-format header: magic plus two padding bytes for alignment.
pub const FILE_HEADER: [u8; 8] = *b"ARROW1\0\0";

/// Smallest possible file-format region: header, footer length, trailing
/// magic. Anything at or below parses as a stream.
pub const MIN_FILE_LEN: usize = 24;

/// Returns true when the region carries file-format framing (both magics
/// present and enough bytes for a footer).
pub fn is_file_format(region: &SharedBuffer) -> bool {
    let bytes = region.as_slice();
    bytes.len() > MIN_FILE_LEN
        && bytes[..8] == FILE_HEADER
        && bytes[bytes.len() - ARROW_MAGIC.len()..] == ARROW_MAGIC
}

/// Walks length-prefixed message frames over a byte region.
///
/// `next_metadata` returns each metadata flatbuffer window in turn; the
/// caller derives the body extent from the decoded `Message.body_length`
/// and consumes it with `take_body` before the next call.
pub struct EnvelopeCursor {
    region: SharedBuffer,
    pos: usize,
    end: usize,
    terminated: bool,
}

impl EnvelopeCursor {
    /// Cursor over a whole region.
    pub fn new(region: SharedBuffer) -> Self {
        let end = region.len();
        Self {
            region,
            pos: 0,
            end,
            terminated: false,
        }
    }

    /// Cursor over `[start, end)` of the region (file-format message
    /// section).
    pub fn with_bounds(region: SharedBuffer, start: usize, end: usize) -> Self {
        Self {
            region,
            pos: start,
            end,
            terminated: false,
        }
    }

    /// Whether an explicit end-of-stream terminator frame was consumed
    /// (as opposed to plain EOF).
    #[inline]
    pub fn consumed_terminator(&self) -> bool {
        self.terminated
    }

    /// Current byte position.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Repositions the cursor (file-format block jumps).
    #[inline]
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Next metadata flatbuffer window, or `None` at EOF / end-of-stream
    /// marker.
    pub fn next_metadata(&mut self) -> Result<Option<SharedBuffer>> {
        if self.pos == self.end {
            return Ok(None);
        }
        if self.end - self.pos < 8 {
            return Err(malformed(format!(
                "truncated frame header at byte {}",
                self.pos
            )));
        }
        let bytes = self.region.as_slice();
        if bytes[self.pos..self.pos + 4] != CONTINUATION_MARKER {
            return Err(malformed(format!(
                "unexpected leading bytes at {} (missing continuation marker)",
                self.pos
            )));
        }
        let meta_len = i32::from_le_bytes(
            bytes[self.pos + 4..self.pos + 8]
                .try_into()
                .expect("4-byte window"),
        );
        if meta_len < 0 {
            return Err(malformed(format!("negative metadata length {meta_len}")));
        }
        if meta_len == 0 {
            // end-of-stream terminator
            self.pos += 8;
            self.terminated = true;
            return Ok(None);
        }
        let meta_len = meta_len as usize;
        if self.pos + 8 + meta_len > self.end {
            return Err(malformed(format!(
                "metadata length {meta_len} overruns region at byte {}",
                self.pos
            )));
        }
        let meta = self.region.slice(self.pos + 8..self.pos + 8 + meta_len);
        self.pos += 8 + meta_len;
        Ok(Some(meta))
    }

    /// Consumes `body_length` bytes as the current message's body.
    pub fn take_body(&mut self, body_length: usize) -> Result<SharedBuffer> {
        if self.pos + body_length > self.end {
            return Err(malformed(format!(
                "body length {body_length} overruns region at byte {}",
                self.pos
            )));
        }
        let body = self.region.slice(self.pos..self.pos + body_length);
        self.pos += body_length;
        Ok(body)
    }
}

/// Writes one framed message and returns the bytes written. `body` must
/// already be padded to the configured alignment; metadata is padded to 8
/// here so the frame length stays a multiple of 8.
pub fn write_message<W: Write>(sink: &mut W, metadata: &[u8], body: &[u8]) -> Result<usize> {
    let padded_meta = pad_to(metadata.len(), 8);
    sink.write_all(&CONTINUATION_MARKER)?;
    sink.write_all(&(padded_meta as i32).to_le_bytes())?;
    sink.write_all(metadata)?;
    if padded_meta > metadata.len() {
        sink.write_all(&vec![0u8; padded_meta - metadata.len()])?;
    }
    sink.write_all(body)?;
    Ok(8 + padded_meta + body.len())
}

/// Writes the end-of-stream terminator frame.
pub fn write_terminator<W: Write>(sink: &mut W) -> Result<usize> {
    sink.write_all(&CONTINUATION_MARKER)?;
    sink.write_all(&0i32.to_le_bytes())?;
    Ok(8)
}
