//! TKey parsing and writing: the record header ROOT uses to locate objects.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::error::{Result, RootError};
use crate::histogram::ContentType;
use crate::rbuffer::RBuffer;
use crate::wbuffer::{WBuffer, string_len};

/// Key class version written for small (32-bit seek) files.
pub const KEY_VERSION_SMALL: u16 = 4;

/// Fixed part of a small key header, before the three strings.
const KEY_FIXED_LEN_SMALL: usize = 26;

/// A parsed TKey record.
#[derive(Debug, Clone)]
pub struct Key {
    /// Total number of bytes in compressed object + key header.
    pub n_bytes: u32,
    /// Version of key class.
    pub version: u16,
    /// Uncompressed object length.
    pub obj_len: u32,
    /// Key creation time (packed ROOT `TDatime`).
    pub datime: u32,
    /// Length of the key header itself.
    pub key_len: u16,
    /// Cycle number (ROOT versioning within a directory).
    pub cycle: u16,
    /// Absolute position of this key in the file.
    pub seek_key: u64,
    /// Parent directory seek position.
    pub seek_pdir: u64,
    /// Class name of the stored object.
    pub class_name: String,
    /// Object name.
    pub name: String,
    /// Object title.
    pub title: String,
}

/// What a key holds, decided from its class name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Dense 1D histogram (`TH1F`, `TH1D`, ...).
    Hist1D,
    /// Dense 2D histogram.
    Hist2D,
    /// Dense 3D histogram.
    Hist3D,
    /// Subdirectory (`TDirectory` / `TDirectoryFile`).
    Directory,
    /// Anything else (trees, functions, `TH2Poly`, ...).
    Unknown,
}

impl ObjectKind {
    /// Classify a ROOT class name.
    pub fn from_class_name(class_name: &str) -> Self {
        match class_name {
            "TDirectory" | "TDirectoryFile" => ObjectKind::Directory,
            _ => match ContentType::parse_class_name(class_name) {
                Some((1, _)) => ObjectKind::Hist1D,
                Some((2, _)) => ObjectKind::Hist2D,
                Some((3, _)) => ObjectKind::Hist3D,
                _ => ObjectKind::Unknown,
            },
        }
    }
}

/// Public info about a key (for `list_keys()`).
#[derive(Debug, Clone)]
pub struct KeyInfo {
    /// Object name.
    pub name: String,
    /// Object class name (e.g. "TH2F", "TDirectoryFile").
    pub class_name: String,
    /// Cycle number.
    pub cycle: u16,
    /// Classification of the class name.
    pub kind: ObjectKind,
}

impl KeyInfo {
    /// Create from an internal Key.
    pub fn from_key(key: &Key) -> Self {
        Self {
            name: key.name.clone(),
            class_name: key.class_name.clone(),
            cycle: key.cycle,
            kind: key.kind(),
        }
    }
}

impl Key {
    /// Read a TKey from the buffer at the current position.
    ///
    /// Versions above 1000 carry 64-bit seek pointers.
    pub fn read(r: &mut RBuffer) -> Result<Self> {
        let n_bytes = r.read_u32()?;
        let version = r.read_u16()?;
        let obj_len = r.read_u32()?;
        let datime = r.read_u32()?;
        let key_len = r.read_u16()?;
        let cycle = r.read_u16()?;

        let (seek_key, seek_pdir) = if version > 1000 {
            (r.read_u64()?, r.read_u64()?)
        } else {
            (r.read_u32()? as u64, r.read_u32()? as u64)
        };

        let class_name = r.read_string()?;
        let name = r.read_string()?;
        let title = r.read_string()?;

        Ok(Key {
            n_bytes,
            version,
            obj_len,
            datime,
            key_len,
            cycle,
            seek_key,
            seek_pdir,
            class_name,
            name,
            title,
        })
    }

    /// A small-format key for an object of `obj_len` bytes stored in
    /// `stored_len` bytes, placed at `seek_key`.
    #[allow(clippy::too_many_arguments)]
    pub fn new_small(
        class_name: &str,
        name: &str,
        title: &str,
        obj_len: usize,
        stored_len: usize,
        seek_key: u64,
        seek_pdir: u64,
        datime: u32,
    ) -> Result<Self> {
        let key_len = Self::header_len(class_name, name, title);
        let n_bytes = key_len + stored_len;
        let small = |v: u64, what: &str| -> Result<u32> {
            u32::try_from(v).ok().filter(|&v| v <= i32::MAX as u32).ok_or_else(|| {
                RootError::Serialization(format!("{} {} exceeds the small-file limit", what, v))
            })
        };
        Ok(Key {
            n_bytes: small(n_bytes as u64, "key size")?,
            version: KEY_VERSION_SMALL,
            obj_len: small(obj_len as u64, "object length")?,
            datime,
            key_len: u16::try_from(key_len).map_err(|_| {
                RootError::Serialization(format!("key header of {} bytes is too long", key_len))
            })?,
            cycle: 1,
            seek_key: small(seek_key, "seek position")? as u64,
            seek_pdir: small(seek_pdir, "parent seek position")? as u64,
            class_name: class_name.to_string(),
            name: name.to_string(),
            title: title.to_string(),
        })
    }

    /// Header length of a small key with these strings.
    pub fn header_len(class_name: &str, name: &str, title: &str) -> usize {
        KEY_FIXED_LEN_SMALL + string_len(class_name) + string_len(name) + string_len(title)
    }

    /// Write the key header in small format.
    pub fn write(&self, w: &mut WBuffer) -> Result<()> {
        if self.version > 1000 {
            return Err(RootError::Serialization(format!(
                "key '{}' uses 64-bit seeks; only small files are written",
                self.name
            )));
        }
        w.write_u32(self.n_bytes);
        w.write_u16(self.version);
        w.write_u32(self.obj_len);
        w.write_u32(self.datime);
        w.write_u16(self.key_len);
        w.write_u16(self.cycle);
        w.write_u32(self.seek_key as u32);
        w.write_u32(self.seek_pdir as u32);
        w.write_string(&self.class_name);
        w.write_string(&self.name);
        w.write_string(&self.title);
        Ok(())
    }

    /// Classification of the stored object.
    pub fn kind(&self) -> ObjectKind {
        ObjectKind::from_class_name(&self.class_name)
    }

    /// Creation time, if the packed value is a valid date.
    pub fn created(&self) -> Option<NaiveDateTime> {
        unpack_datime(self.datime)
    }
}

/// Pack a timestamp into ROOT's `TDatime` word.
///
/// Layout: `(year-1995)<<26 | month<<22 | day<<17 | hour<<12 | minute<<6 | second`.
/// Years before 1995 are clamped.
pub fn pack_datime(t: &NaiveDateTime) -> u32 {
    let year = (t.year() - 1995).clamp(0, 63) as u32;
    (year << 26)
        | (t.month() << 22)
        | (t.day() << 17)
        | (t.hour() << 12)
        | (t.minute() << 6)
        | t.second().min(59)
}

/// Inverse of [`pack_datime`].
pub fn unpack_datime(d: u32) -> Option<NaiveDateTime> {
    let year = (d >> 26) as i32 + 1995;
    let month = (d >> 22) & 0xF;
    let day = (d >> 17) & 0x1F;
    let hour = (d >> 12) & 0x1F;
    let minute = (d >> 6) & 0x3F;
    let second = d & 0x3F;
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_class_names() {
        assert_eq!(ObjectKind::from_class_name("TH1D"), ObjectKind::Hist1D);
        assert_eq!(ObjectKind::from_class_name("TH2F"), ObjectKind::Hist2D);
        assert_eq!(ObjectKind::from_class_name("TH3I"), ObjectKind::Hist3D);
        assert_eq!(ObjectKind::from_class_name("TDirectoryFile"), ObjectKind::Directory);
        assert_eq!(ObjectKind::from_class_name("TDirectory"), ObjectKind::Directory);
        assert_eq!(ObjectKind::from_class_name("TTree"), ObjectKind::Unknown);
        assert_eq!(ObjectKind::from_class_name("TH2Poly"), ObjectKind::Unknown);
    }

    #[test]
    fn small_key_round_trip() {
        let key = Key::new_small("TH2F", "numu_cc", "numu_cc", 900, 400, 1234, 100, 7).unwrap();
        assert_eq!(key.key_len as usize, 26 + 5 + 8 + 8);
        assert_eq!(key.n_bytes as usize, key.key_len as usize + 400);

        let mut w = WBuffer::new();
        key.write(&mut w).unwrap();
        assert_eq!(w.pos(), key.key_len as usize);

        let bytes = w.into_inner();
        let back = Key::read(&mut RBuffer::new(&bytes)).unwrap();
        assert_eq!(back.name, "numu_cc");
        assert_eq!(back.class_name, "TH2F");
        assert_eq!(back.seek_key, 1234);
        assert_eq!(back.seek_pdir, 100);
        assert_eq!(back.obj_len, 900);
        assert_eq!(back.kind(), ObjectKind::Hist2D);
    }

    #[test]
    fn oversized_seek_is_rejected() {
        let err = Key::new_small("TH1D", "h", "", 10, 10, 1 << 33, 100, 0).unwrap_err();
        assert!(matches!(err, RootError::Serialization(_)));
    }

    #[test]
    fn datime_round_trip() {
        let t = NaiveDate::from_ymd_opt(2024, 3, 17).unwrap().and_hms_opt(13, 45, 9).unwrap();
        assert_eq!(unpack_datime(pack_datime(&t)), Some(t));
        assert_eq!(unpack_datime(0), None);
    }
}
