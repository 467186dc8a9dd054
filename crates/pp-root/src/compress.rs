//! ROOT compression block encoding for the writer.
//!
//! Only zlib (`ZL`) blocks are produced; the reader side in
//! [`decompress`](crate::decompress) understands every algorithm ROOT emits.

use std::io::Write;

use flate2::write::ZlibEncoder;

use crate::decompress::BLOCK_HEADER_LEN;
use crate::error::{Result, RootError};

/// Largest payload a single block can describe (3-byte size fields).
pub const MAX_BLOCK_LEN: usize = 0xFF_FFFF;

/// Objects of at most this many bytes are always stored raw.
pub const MIN_COMPRESS_LEN: usize = 256;

/// `Z_DEFLATED`, written as the block method byte.
const ZLIB_METHOD: u8 = 8;

/// Compression applied to object payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Store every payload uncompressed.
    None,
    /// zlib with the given level (1..=9).
    Zlib(u32),
}

impl Default for Compression {
    fn default() -> Self {
        Compression::Zlib(1)
    }
}

impl Compression {
    /// The `fCompress` setting stored in the file header (`100 * algorithm + level`).
    pub fn setting(self) -> u32 {
        match self {
            Compression::None => 0,
            Compression::Zlib(level) => 100 + level.clamp(1, 9),
        }
    }
}

/// Compress `src` into ROOT blocks.
///
/// Returns `None` when the payload should be stored raw: compression is
/// off, the payload is small, or the blocks would not be smaller.
pub fn compress(src: &[u8], compression: Compression) -> Result<Option<Vec<u8>>> {
    let level = match compression {
        Compression::None => return Ok(None),
        Compression::Zlib(level) => level.clamp(1, 9),
    };
    if src.len() <= MIN_COMPRESS_LEN {
        return Ok(None);
    }

    let mut out = Vec::with_capacity(src.len() / 2);
    for chunk in src.chunks(MAX_BLOCK_LEN) {
        let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::new(level));
        encoder.write_all(chunk).map_err(|e| RootError::Compression(format!("zlib: {}", e)))?;
        let body = encoder.finish().map_err(|e| RootError::Compression(format!("zlib: {}", e)))?;
        if body.len() > MAX_BLOCK_LEN {
            return Ok(None);
        }

        out.extend_from_slice(b"ZL");
        out.push(ZLIB_METHOD);
        out.extend_from_slice(&le24(body.len()));
        out.extend_from_slice(&le24(chunk.len()));
        out.extend_from_slice(&body);

        if out.len() >= src.len() {
            return Ok(None);
        }
    }

    debug_assert!(out.len() >= BLOCK_HEADER_LEN);
    Ok(Some(out))
}

fn le24(v: usize) -> [u8; 3] {
    [(v & 0xFF) as u8, ((v >> 8) & 0xFF) as u8, ((v >> 16) & 0xFF) as u8]
}
