//! Binary reader for ROOT's big-endian serialization format.

use crate::error::{Result, RootError};

/// `kByteCountMask`: set on the leading u32 of objects written with a byte count.
pub const BYTE_COUNT_MASK: u32 = 0x4000_0000;

/// `TObject::kIsReferenced`: a process-id slot follows the bits.
const K_IS_REFERENCED: u32 = 1 << 4;

/// `TObject::kIsOnHeap`, stripped when written and restored when read.
const K_IS_ON_HEAP: u32 = 0x0100_0000;

/// Decoded `TObject` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TObjectHeader {
    /// Streamer version of `TObject`.
    pub version: u16,
    /// `fUniqueID`.
    pub unique_id: u32,
    /// `fBits` (with `kIsOnHeap` restored).
    pub bits: u32,
}

/// A cursor-based reader over a byte slice, using ROOT's big-endian conventions.
pub struct RBuffer<'a> {
    data: &'a [u8],
    pos: usize,
}

macro_rules! read_be {
    ($($(#[$doc:meta])* $name:ident -> $ty:ty;)*) => {
        $(
            $(#[$doc])*
            #[inline]
            pub fn $name(&mut self) -> Result<$ty> {
                const N: usize = std::mem::size_of::<$ty>();
                let b = self.read_bytes(N)?;
                let mut raw = [0u8; N];
                raw.copy_from_slice(b);
                Ok(<$ty>::from_be_bytes(raw))
            }
        )*
    };
}

impl<'a> RBuffer<'a> {
    /// Create a new reader over the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Create a reader positioned at `pos`.
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    /// Current read position.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Total length of underlying buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Remaining bytes from current position.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Set read position absolutely.
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Jump forward to the end of a byte-counted object, if known.
    ///
    /// Fields this reader does not interpret are skipped this way. An end
    /// position behind the cursor means the object was over-read.
    pub fn seek_end(&mut self, end: Option<usize>) -> Result<()> {
        let Some(end) = end else {
            return Ok(());
        };
        if end < self.pos {
            return Err(RootError::Deserialization(format!(
                "object ends at {} but reader is already at {}",
                end, self.pos
            )));
        }
        if end > self.data.len() {
            return Err(RootError::BufferUnderflow {
                offset: self.pos,
                need: end - self.pos,
                have: self.remaining(),
            });
        }
        self.pos = end;
        Ok(())
    }

    /// Skip `n` bytes forward.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    /// Read a sub-slice of `n` bytes, advancing the cursor.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    read_be! {
        /// Read a single byte.
        read_u8 -> u8;
        /// Read a big-endian u16.
        read_u16 -> u16;
        /// Read a big-endian i16.
        read_i16 -> i16;
        /// Read a big-endian u32.
        read_u32 -> u32;
        /// Read a big-endian i32.
        read_i32 -> i32;
        /// Read a big-endian u64.
        read_u64 -> u64;
        /// Read a big-endian f32.
        read_f32 -> f32;
        /// Read a big-endian f64.
        read_f64 -> f64;
    }

    /// Read a ROOT-encoded string.
    ///
    /// Format: length byte (if < 255), or 255 + u32 length, then UTF-8 bytes.
    pub fn read_string(&mut self) -> Result<String> {
        let first = self.read_u8()?;
        let len = if first == 255 { self.read_u32()? as usize } else { first as usize };
        if len == 0 {
            return Ok(String::new());
        }
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read a null-terminated class name (as written after `kNewClassTag`).
    pub fn read_cstring(&mut self) -> Result<String> {
        let rest = &self.data[self.pos.min(self.data.len())..];
        let len = rest.iter().position(|&b| b == 0).ok_or(RootError::BufferUnderflow {
            offset: self.pos,
            need: rest.len() + 1,
            have: rest.len(),
        })?;
        let s = String::from_utf8_lossy(&rest[..len]).into_owned();
        self.pos += len + 1;
        Ok(s)
    }

    /// Read a ROOT streamer version header.
    ///
    /// Returns `(version, end_pos)` where `end_pos` is the absolute buffer
    /// position where this streamed object ends (`None` if no byte-count header).
    ///
    /// The byte count spans from right after the leading u32 to the end of the
    /// object, so it includes the version u16.
    pub fn read_version(&mut self) -> Result<(u16, Option<usize>)> {
        let start = self.pos;
        let raw = self.read_u32()?;
        if raw & BYTE_COUNT_MASK != 0 {
            let byte_count = (raw & !BYTE_COUNT_MASK) as usize;
            let version = self.read_u16()?;
            Ok((version, Some(start + 4 + byte_count)))
        } else {
            // No byte count: the first two bytes are the version.
            self.pos = start + 2;
            Ok(((raw >> 16) as u16, None))
        }
    }

    /// Read a `TObject` header: version, fUniqueID and fBits.
    pub fn read_tobject(&mut self) -> Result<TObjectHeader> {
        let (version, end) = self.read_version()?;
        let unique_id = self.read_u32()?;
        let bits = self.read_u32()? | K_IS_ON_HEAP;
        if bits & K_IS_REFERENCED != 0 {
            self.skip(2)?;
        }
        self.seek_end(end)?;
        Ok(TObjectHeader { version, unique_id, bits })
    }

    /// Read a `TNamed`: TObject + fName + fTitle.
    pub fn read_tnamed(&mut self) -> Result<(TObjectHeader, String, String)> {
        let (_ver, end) = self.read_version()?;
        let obj = self.read_tobject()?;
        let name = self.read_string()?;
        let title = self.read_string()?;
        self.seek_end(end)?;
        Ok((obj, name, title))
    }

    /// Skip an object written through a pointer (`WriteObjectAny`).
    ///
    /// A null pointer is a single zero u32; otherwise the object carries a
    /// byte count covering the class tag and the streamed body.
    pub fn skip_object_any(&mut self) -> Result<()> {
        let start = self.pos;
        let raw = self.read_u32()?;
        if raw == 0 {
            return Ok(());
        }
        if raw & BYTE_COUNT_MASK == 0 {
            return Err(RootError::Deserialization(format!(
                "object pointer at {} has no byte count (tag {:#x})",
                start, raw
            )));
        }
        let end = start + 4 + (raw & !BYTE_COUNT_MASK) as usize;
        self.seek_end(Some(end))
    }

    /// Read `n` big-endian f64 values.
    pub fn read_array_f64(&mut self, n: usize) -> Result<Vec<f64>> {
        self.read_array(n, 8, |b| f64::from_be_bytes(b.try_into().unwrap_or([0; 8])))
    }

    /// Read `n` big-endian f32 values, widened to f64.
    pub fn read_array_f32(&mut self, n: usize) -> Result<Vec<f64>> {
        self.read_array(n, 4, |b| f32::from_be_bytes(b.try_into().unwrap_or([0; 4])) as f64)
    }

    /// Read `n` big-endian i32 values, widened to f64.
    pub fn read_array_i32(&mut self, n: usize) -> Result<Vec<f64>> {
        self.read_array(n, 4, |b| i32::from_be_bytes(b.try_into().unwrap_or([0; 4])) as f64)
    }

    /// Read `n` big-endian i16 values, widened to f64.
    pub fn read_array_i16(&mut self, n: usize) -> Result<Vec<f64>> {
        self.read_array(n, 2, |b| i16::from_be_bytes(b.try_into().unwrap_or([0; 2])) as f64)
    }

    /// Read `n` i8 values, widened to f64.
    pub fn read_array_i8(&mut self, n: usize) -> Result<Vec<f64>> {
        self.read_array(n, 1, |b| b[0] as i8 as f64)
    }

    /// Read a `TArrayD`-style block: i32 length followed by f64 values.
    pub fn read_tarray_f64(&mut self) -> Result<Vec<f64>> {
        let n = self.read_u32()? as usize;
        self.read_array_f64(n)
    }

    // ── internal ────────────────────────────────────────────────

    fn read_array(&mut self, n: usize, width: usize, f: impl Fn(&[u8]) -> f64) -> Result<Vec<f64>> {
        let total = n.checked_mul(width).ok_or(RootError::BufferUnderflow {
            offset: self.pos,
            need: usize::MAX,
            have: self.remaining(),
        })?;
        let bytes = self.read_bytes(total)?;
        Ok(bytes.chunks_exact(width).map(f).collect())
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if self.pos.checked_add(n).is_none_or(|end| end > self.data.len()) {
            return Err(RootError::BufferUnderflow {
                offset: self.pos,
                need: n,
                have: self.remaining(),
            });
        }
        Ok(())
    }
}
