//! Binary writer producing ROOT's big-endian serialization format.
//!
//! Mirror image of [`RBuffer`](crate::rbuffer::RBuffer): every `write_*`
//! method here has a `read_*` counterpart there.

use std::collections::HashMap;

use crate::error::{Result, RootError};
use crate::rbuffer::BYTE_COUNT_MASK;

/// `kNewClassTag`: precedes a class name written for the first time.
const K_NEW_CLASS_TAG: u32 = 0xFFFF_FFFF;

/// `kClassMask`: marks a reference to a class tag written earlier.
const K_CLASS_MASK: u32 = 0x8000_0000;

/// `kMapOffset`: added to a class tag's offset so no reference is zero.
const K_MAP_OFFSET: u32 = 2;

/// Largest byte count representable next to `kByteCountMask`.
const K_MAX_BYTE_COUNT: usize = 0x3FFF_FFFE;

/// Placeholder for a byte count to be patched by [`WBuffer::end_version`].
#[must_use = "a reserved byte count must be closed with end_version"]
#[derive(Debug)]
pub struct ByteCount(usize);

/// Class tags already written into one key's object buffer.
///
/// ROOT refers back to a class by the offset of its first tag, counted from
/// the start of the key header, plus `kMapOffset`.
#[derive(Debug)]
pub struct ClassTags {
    origin: usize,
    seen: HashMap<String, u32>,
}

impl ClassTags {
    /// Tags for a payload that follows a key header of `key_len` bytes.
    pub fn new(key_len: usize) -> Self {
        Self { origin: key_len, seen: HashMap::new() }
    }
}

/// Growable big-endian output buffer.
#[derive(Debug, Default)]
pub struct WBuffer {
    data: Vec<u8>,
}

macro_rules! write_be {
    ($($(#[$doc:meta])* $name:ident($ty:ty);)*) => {
        $(
            $(#[$doc])*
            #[inline]
            pub fn $name(&mut self, v: $ty) {
                self.data.extend_from_slice(&v.to_be_bytes());
            }
        )*
    };
}

impl WBuffer {
    /// Empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current write position (== length).
    #[inline]
    pub fn pos(&self) -> usize {
        self.data.len()
    }

    /// Written bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer.
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    write_be! {
        /// Write a single byte.
        write_u8(u8);
        /// Write a signed byte.
        write_i8(i8);
        /// Write a big-endian u16.
        write_u16(u16);
        /// Write a big-endian i16.
        write_i16(i16);
        /// Write a big-endian u32.
        write_u32(u32);
        /// Write a big-endian i32.
        write_i32(i32);
        /// Write a big-endian f32.
        write_f32(f32);
        /// Write a big-endian f64.
        write_f64(f64);
    }

    /// Append raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Append `n` zero bytes.
    pub fn write_zeros(&mut self, n: usize) {
        self.data.resize(self.data.len() + n, 0);
    }

    /// Write a ROOT `TString`: one length byte, or 255 + u32 for long strings.
    pub fn write_string(&mut self, s: &str) {
        let bytes = s.as_bytes();
        if bytes.len() < 255 {
            self.write_u8(bytes.len() as u8);
        } else {
            self.write_u8(255);
            self.write_u32(bytes.len() as u32);
        }
        self.write_bytes(bytes);
    }

    /// Write a null-terminated string.
    pub fn write_cstring(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
        self.write_u8(0);
    }

    /// Start a byte-counted object: reserve the count, write the version.
    pub fn begin_version(&mut self, version: u16) -> ByteCount {
        let at = self.pos();
        self.write_u32(0);
        self.write_u16(version);
        ByteCount(at)
    }

    /// Close a byte-counted object opened by [`begin_version`](Self::begin_version)
    /// or [`begin_object`](Self::begin_object).
    pub fn end_version(&mut self, bc: ByteCount) -> Result<()> {
        let count = self.pos() - bc.0 - 4;
        if count > K_MAX_BYTE_COUNT {
            return Err(RootError::Serialization(format!(
                "streamed object of {} bytes exceeds the byte-count limit",
                count
            )));
        }
        self.patch_u32(bc.0, count as u32 | BYTE_COUNT_MASK);
        Ok(())
    }

    /// Start an object written through a pointer: byte count, then a new
    /// class tag and the class name. The body follows.
    pub fn begin_object(&mut self, class_name: &str) -> ByteCount {
        let at = self.pos();
        self.write_u32(0);
        self.write_u32(K_NEW_CLASS_TAG);
        self.write_cstring(class_name);
        ByteCount(at)
    }

    /// Like [`begin_object`](Self::begin_object), but a class already in
    /// `tags` is written as a back reference instead of by name.
    pub fn begin_tagged_object(&mut self, class_name: &str, tags: &mut ClassTags) -> ByteCount {
        let at = self.pos();
        self.write_u32(0);
        match tags.seen.get(class_name) {
            Some(&tag) => self.write_u32(tag | K_CLASS_MASK),
            None => {
                let tag = (tags.origin + self.pos()) as u32 + K_MAP_OFFSET;
                tags.seen.insert(class_name.to_string(), tag);
                self.write_u32(K_NEW_CLASS_TAG);
                self.write_cstring(class_name);
            }
        }
        ByteCount(at)
    }

    /// Write a null object pointer.
    pub fn write_null_object(&mut self) {
        self.write_u32(0);
    }

    /// Write a `TObject` header. `kIsOnHeap`/`kNotDeleted` are never stored.
    pub fn write_tobject(&mut self, bits: u32) {
        self.write_u16(1);
        self.write_u32(0);
        self.write_u32(bits & !0x0300_0000);
    }

    /// Write a `TNamed` (version 1): TObject, fName, fTitle.
    pub fn write_tnamed(&mut self, bits: u32, name: &str, title: &str) -> Result<()> {
        let bc = self.begin_version(1);
        self.write_tobject(bits);
        self.write_string(name);
        self.write_string(title);
        self.end_version(bc)
    }

    /// Write a `TArrayD`-style block: i32 length followed by f64 values.
    pub fn write_tarray_f64(&mut self, values: &[f64]) {
        self.write_i32(values.len() as i32);
        for &v in values {
            self.write_f64(v);
        }
    }

    /// Overwrite a u32 at an absolute position.
    pub fn patch_u32(&mut self, at: usize, v: u32) {
        self.data[at..at + 4].copy_from_slice(&v.to_be_bytes());
    }

    /// Overwrite a slice at an absolute position.
    pub fn patch_bytes(&mut self, at: usize, bytes: &[u8]) {
        self.data[at..at + bytes.len()].copy_from_slice(bytes);
    }
}

/// Serialized size of a `TString`.
pub fn string_len(s: &str) -> usize {
    let n = s.len();
    if n < 255 { 1 + n } else { 5 + n }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbuffer::RBuffer;

    #[test]
    fn strings_round_trip_through_reader() {
        let long = "y".repeat(400);
        let mut w = WBuffer::new();
        w.write_string("xaxis");
        w.write_string(&long);
        w.write_string("");
        assert_eq!(w.pos(), string_len("xaxis") + string_len(&long) + string_len(""));

        let bytes = w.into_inner();
        let mut r = RBuffer::new(&bytes);
        assert_eq!(r.read_string().unwrap(), "xaxis");
        assert_eq!(r.read_string().unwrap(), long);
        assert_eq!(r.read_string().unwrap(), "");
    }

    #[test]
    fn nested_byte_counts_are_readable() {
        let mut w = WBuffer::new();
        let outer = w.begin_version(4);
        w.write_tnamed(0x200, "h", "title").unwrap();
        w.write_f64(2.5);
        w.end_version(outer).unwrap();
        w.write_u8(0xEE);

        let bytes = w.into_inner();
        let mut r = RBuffer::new(&bytes);
        let (ver, end) = r.read_version().unwrap();
        assert_eq!(ver, 4);
        let (obj, name, title) = r.read_tnamed().unwrap();
        assert_eq!(obj.bits & 0x200, 0x200);
        assert_eq!((name.as_str(), title.as_str()), ("h", "title"));
        assert_eq!(r.read_f64().unwrap(), 2.5);
        assert_eq!(end, Some(r.pos()));
        assert_eq!(r.read_u8().unwrap(), 0xEE);
    }

    #[test]
    fn object_pointer_is_skippable() {
        let mut w = WBuffer::new();
        let bc = w.begin_object("TList");
        let inner = w.begin_version(5);
        w.write_tobject(0);
        w.write_string("");
        w.write_i32(0);
        w.end_version(inner).unwrap();
        w.end_version(bc).unwrap();
        w.write_null_object();
        w.write_u8(1);

        let bytes = w.into_inner();
        let mut r = RBuffer::new(&bytes);
        r.skip_object_any().unwrap();
        r.skip_object_any().unwrap();
        assert_eq!(r.read_u8().unwrap(), 1);
    }

    #[test]
    fn repeated_classes_are_back_references() {
        let key_len = 60;
        let mut tags = ClassTags::new(key_len);
        let mut w = WBuffer::new();
        w.write_i32(7);
        for _ in 0..2 {
            let bc = w.begin_tagged_object("TObjArray", &mut tags);
            w.write_u8(0);
            w.end_version(bc).unwrap();
        }

        let bytes = w.into_inner();
        let mut r = RBuffer::new(&bytes);
        assert_eq!(r.read_i32().unwrap(), 7);
        assert_eq!(r.read_u32().unwrap(), BYTE_COUNT_MASK | 15);
        let tag_pos = r.pos();
        assert_eq!(r.read_u32().unwrap(), K_NEW_CLASS_TAG);
        assert_eq!(r.read_cstring().unwrap(), "TObjArray");
        r.skip(1).unwrap();
        assert_eq!(r.read_u32().unwrap(), BYTE_COUNT_MASK | 5);
        let reference = r.read_u32().unwrap();
        assert_eq!(reference, K_CLASS_MASK | (key_len + tag_pos) as u32 + K_MAP_OFFSET);
    }
}
