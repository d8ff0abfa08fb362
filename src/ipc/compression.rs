//! # **Compression Module** - *Per-buffer Body Codecs*
//!
//! Pluggable byte-stream transforms for record-batch bodies: LZ4 frame and
//! Zstd, each behind its own cargo feature.
//!
//! The wire framing (an `i64` little-endian uncompressed length before each
//! encoded buffer, `-1` marking a buffer stored raw) lives with the writer
//! and reader; this module is only the codec pair.

use std::io::Read;
#[cfg(feature = "lz4")]
use std::io::Write;

use arrow_format::ipc;

use crate::enums::error::{Result, malformed, unsupported};

/// Compression codec applied buffer-wise to record-batch bodies.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CompressionCodec {
    Lz4Frame,
    Zstd,
}

impl CompressionCodec {
    /// The flatbuffer discriminant for this codec.
    pub fn to_fb(self) -> ipc::CompressionType {
        match self {
            CompressionCodec::Lz4Frame => ipc::CompressionType::Lz4Frame,
            CompressionCodec::Zstd => ipc::CompressionType::Zstd,
        }
    }

    /// Resolves a flatbuffer discriminant, rejecting codecs this build does
    /// not carry.
    pub fn from_fb(codec: ipc::CompressionType) -> Result<Self> {
        match codec {
            ipc::CompressionType::Lz4Frame => {
                #[cfg(feature = "lz4")]
                {
                    Ok(CompressionCodec::Lz4Frame)
                }
                #[cfg(not(feature = "lz4"))]
                {
                    Err(unsupported("lz4 compression not enabled in this build"))
                }
            }
            ipc::CompressionType::Zstd => {
                #[cfg(feature = "zstd")]
                {
                    Ok(CompressionCodec::Zstd)
                }
                #[cfg(not(feature = "zstd"))]
                {
                    Err(unsupported("zstd compression not enabled in this build"))
                }
            }
        }
    }

    /// Compresses `src`, appending the encoded bytes to `dst`.
    pub fn compress(self, src: &[u8], dst: &mut Vec<u8>) -> Result<()> {
        match self {
            CompressionCodec::Lz4Frame => {
                #[cfg(feature = "lz4")]
                {
                    let mut encoder = lz4_flex::frame::FrameEncoder::new(&mut *dst);
                    encoder
                        .write_all(src)
                        .map_err(|e| malformed(format!("lz4 encode: {e}")))?;
                    encoder
                        .finish()
                        .map_err(|e| malformed(format!("lz4 encode: {e}")))?;
                    Ok(())
                }
                #[cfg(not(feature = "lz4"))]
                {
                    let _ = src;
                    Err(unsupported("lz4 compression not enabled in this build"))
                }
            }
            CompressionCodec::Zstd => {
                #[cfg(feature = "zstd")]
                {
                    let encoded = zstd::stream::encode_all(src, 0)
                        .map_err(|e| malformed(format!("zstd encode: {e}")))?;
                    dst.extend_from_slice(&encoded);
                    Ok(())
                }
                #[cfg(not(feature = "zstd"))]
                {
                    let _ = src;
                    Err(unsupported("zstd compression not enabled in this build"))
                }
            }
        }
    }

    /// Inflates `src` into an owned vector of exactly `uncompressed_len`
    /// bytes.
    pub fn decompress(self, src: &[u8], uncompressed_len: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(uncompressed_len);
        match self {
            CompressionCodec::Lz4Frame => {
                #[cfg(feature = "lz4")]
                {
                    let mut decoder = lz4_flex::frame::FrameDecoder::new(src);
                    decoder
                        .read_to_end(&mut out)
                        .map_err(|e| malformed(format!("lz4 decode: {e}")))?;
                }
                #[cfg(not(feature = "lz4"))]
                {
                    let _ = src;
                    return Err(unsupported("lz4 compression not enabled in this build"));
                }
            }
            CompressionCodec::Zstd => {
                #[cfg(feature = "zstd")]
                {
                    let mut decoder = zstd::stream::Decoder::new(src)
                        .map_err(|e| malformed(format!("zstd decode: {e}")))?;
                    decoder
                        .read_to_end(&mut out)
                        .map_err(|e| malformed(format!("zstd decode: {e}")))?;
                }
                #[cfg(not(feature = "zstd"))]
                {
                    let _ = src;
                    return Err(unsupported("zstd compression not enabled in this build"));
                }
            }
        }
        if out.len() != uncompressed_len {
            return Err(malformed(format!(
                "decompressed {} bytes, expected {}",
                out.len(),
                uncompressed_len
            )));
        }
        Ok(out)
    }
}
