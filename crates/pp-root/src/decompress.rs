//! ROOT compression block decompression (ZL = zlib, L4 = LZ4, ZS = ZSTD, XZ = LZMA).
//!
//! ROOT writes compressed data as one or more 9-byte-header blocks:
//! ```text
//! bytes 0-1:  algorithm tag ("ZL", "XZ", "L4", "ZS")
//! byte  2:    method (ignored)
//! bytes 3-5:  compressed size   (3-byte little-endian)
//! bytes 6-8:  uncompressed size (3-byte little-endian)
//! ```
//! The compressed payload immediately follows the 9-byte header.

use std::io::Read;

use crate::error::{Result, RootError};

/// Size of a compression block header.
pub const BLOCK_HEADER_LEN: usize = 9;

/// Upper bound on a single decompressed object; larger claims are rejected
/// before any allocation.
pub const MAX_OBJECT_LEN: usize = 1 << 30;

/// Decompress ROOT-compressed data into `expected_len` bytes.
pub fn decompress(src: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    if expected_len > MAX_OBJECT_LEN {
        return Err(RootError::Decompression(format!(
            "object claims {} uncompressed bytes (limit {})",
            expected_len, MAX_OBJECT_LEN
        )));
    }

    let mut out = Vec::with_capacity(expected_len);
    let mut offset = 0;

    while out.len() < expected_len && offset + BLOCK_HEADER_LEN <= src.len() {
        let tag = &src[offset..offset + 2];
        let c_size = read_le24(&src[offset + 3..offset + 6]);
        let u_size = read_le24(&src[offset + 6..offset + 9]);
        offset += BLOCK_HEADER_LEN;

        let end = offset + c_size;
        if end > src.len() {
            return Err(RootError::Decompression(format!(
                "compressed block claims {} bytes but only {} remain",
                c_size,
                src.len() - offset
            )));
        }
        if out.len() + u_size > expected_len {
            return Err(RootError::Decompression(format!(
                "block of {} bytes overruns expected object length {}",
                u_size, expected_len
            )));
        }

        let compressed = &src[offset..end];
        let decompressed = match tag {
            b"ZL" => decompress_zlib(compressed, u_size)?,
            b"L4" => decompress_lz4(compressed, u_size)?,
            b"ZS" => decompress_zstd(compressed, u_size)?,
            b"XZ" => decompress_xz(compressed, u_size)?,
            _ => {
                return Err(RootError::Decompression(format!(
                    "unsupported compression algorithm: {:?}",
                    String::from_utf8_lossy(tag)
                )));
            }
        };

        if decompressed.len() != u_size {
            return Err(RootError::Decompression(format!(
                "expected {} uncompressed bytes, got {}",
                u_size,
                decompressed.len()
            )));
        }

        out.extend_from_slice(&decompressed);
        offset = end;
    }

    if out.len() != expected_len {
        return Err(RootError::Decompression(format!(
            "total decompressed length {} != expected {}",
            out.len(),
            expected_len
        )));
    }

    Ok(out)
}

fn decompress_zlib(data: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected);
    flate2::read::ZlibDecoder::new(data)
        .take(expected as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| RootError::Decompression(format!("zlib: {}", e)))?;
    Ok(out)
}

fn decompress_lz4(data: &[u8], expected: usize) -> Result<Vec<u8>> {
    // ROOT LZ4 blocks carry an 8-byte xxhash64 of the payload first; not verified.
    if data.len() < 8 {
        return Err(RootError::Decompression("LZ4 block too small for checksum header".into()));
    }
    lz4_flex::decompress(&data[8..], expected)
        .map_err(|e| RootError::Decompression(format!("lz4: {}", e)))
}

fn decompress_zstd(data: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut out = vec![0u8; expected];
    let mut decoder = ruzstd::decoding::FrameDecoder::new();
    let written = decoder
        .decode_all(data, &mut out)
        .map_err(|e| RootError::Decompression(format!("zstd: {}", e)))?;
    out.truncate(written);
    Ok(out)
}

fn decompress_xz(data: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut input = std::io::BufReader::new(data);
    let mut out = Vec::with_capacity(expected);
    lzma_rs::xz_decompress(&mut input, &mut out)
        .map_err(|e| RootError::Decompression(format!("xz: {}", e)))?;
    Ok(out)
}

/// Read a 3-byte little-endian unsigned integer.
pub(crate) fn read_le24(b: &[u8]) -> usize {
    b[0] as usize | ((b[1] as usize) << 8) | ((b[2] as usize) << 16)
}
