//! TDirectory parsing and key-list navigation.

use std::collections::HashMap;

use crate::error::{Result, RootError};
use crate::key::Key;
use crate::rbuffer::RBuffer;
use crate::wbuffer::WBuffer;

/// `TDirectoryFile` class version written for small files.
pub const DIRECTORY_VERSION: u16 = 5;

/// Serialized size of a small [`DirectoryRecord`], including the trailing
/// padding ROOT reserves for a later switch to 64-bit seeks.
pub const DIRECTORY_RECORD_LEN: usize = 60;

/// The TDirectory streamer stored after a directory's key (or, for the top
/// directory, after the file's name record).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryRecord {
    /// Class version; above 1000 the seek fields are 64-bit.
    pub version: u16,
    /// Creation time (packed `TDatime`).
    pub datime_c: u32,
    /// Modification time (packed `TDatime`).
    pub datime_m: u32,
    /// Size of the key list record.
    pub nbytes_keys: u32,
    /// Bytes from the directory's key to this record.
    pub nbytes_name: u32,
    /// Position of the directory's own key.
    pub seek_dir: u64,
    /// Position of the parent directory's key (0 for the top directory).
    pub seek_parent: u64,
    /// Position of the key list record.
    pub seek_keys: u64,
    /// Directory UUID.
    pub uuid: [u8; 16],
}

impl DirectoryRecord {
    /// Read the record at the reader's position.
    pub fn read(r: &mut RBuffer) -> Result<Self> {
        let version = r.read_u16()?;
        let datime_c = r.read_u32()?;
        let datime_m = r.read_u32()?;
        let nbytes_keys = r.read_u32()?;
        let nbytes_name = r.read_u32()?;

        let (seek_dir, seek_parent, seek_keys) = if version > 1000 {
            (r.read_u64()?, r.read_u64()?, r.read_u64()?)
        } else {
            (r.read_u32()? as u64, r.read_u32()? as u64, r.read_u32()? as u64)
        };

        // Files from before ROOT 4 stop here.
        let mut uuid = [0u8; 16];
        if r.remaining() >= 18 {
            let _uuid_version = r.read_u16()?;
            uuid.copy_from_slice(r.read_bytes(16)?);
        }

        Ok(Self {
            version,
            datime_c,
            datime_m,
            nbytes_keys,
            nbytes_name,
            seek_dir,
            seek_parent,
            seek_keys,
            uuid,
        })
    }

    /// Write the record in small format ([`DIRECTORY_RECORD_LEN`] bytes).
    pub fn write(&self, w: &mut WBuffer) -> Result<()> {
        let small = |v: u64| {
            u32::try_from(v).map_err(|_| {
                RootError::Serialization(format!("directory seek {} exceeds the small-file limit", v))
            })
        };
        let start = w.pos();
        w.write_u16(DIRECTORY_VERSION);
        w.write_u32(self.datime_c);
        w.write_u32(self.datime_m);
        w.write_u32(self.nbytes_keys);
        w.write_u32(self.nbytes_name);
        w.write_u32(small(self.seek_dir)?);
        w.write_u32(small(self.seek_parent)?);
        w.write_u32(small(self.seek_keys)?);
        w.write_u16(1);
        w.write_bytes(&self.uuid);
        w.write_zeros(12);
        debug_assert_eq!(w.pos() - start, DIRECTORY_RECORD_LEN);
        Ok(())
    }
}

/// A parsed TDirectory: an ordered list of TKeys.
#[derive(Debug, Clone)]
pub struct Directory {
    keys: Vec<Key>,
    /// Position of the key list this directory was read from (0 if none).
    seek_keys: u64,
}

impl Directory {
    /// Read the key list from the file at `seek_keys`.
    ///
    /// The key list starts with a TKey header for the list itself, then
    /// a u32 `nkeys`, followed by `nkeys` TKey records.
    pub fn read_key_list(file_data: &[u8], seek_keys: u64) -> Result<Self> {
        if seek_keys == 0 {
            return Ok(Directory { keys: Vec::new(), seek_keys: 0 });
        }
        let seek = usize::try_from(seek_keys)
            .map_err(|_| RootError::Deserialization(format!("seek_keys {} too large", seek_keys)))?;
        if seek >= file_data.len() {
            return Err(RootError::Deserialization(format!(
                "key list at {} is past the end of the file ({} bytes)",
                seek,
                file_data.len()
            )));
        }

        let mut r = RBuffer::at(file_data, seek);

        // The key-list itself is stored as a TKey; skip its header.
        let _list_key = Key::read(&mut r)?;

        let nkeys = r.read_u32()? as usize;
        // Each key header is at least 26 bytes; guards against absurd counts.
        if nkeys > r.remaining() / 26 {
            return Err(RootError::Deserialization(format!(
                "key list claims {} keys in {} bytes",
                nkeys,
                r.remaining()
            )));
        }

        let mut keys = Vec::with_capacity(nkeys);
        for _ in 0..nkeys {
            keys.push(Key::read(&mut r)?);
        }

        Ok(Directory { keys, seek_keys })
    }

    /// Read directory from the decompressed payload of a TDirectoryFile key.
    ///
    /// The payload is a [`DirectoryRecord`] pointing at the subdirectory's key list.
    pub fn read_from_payload(payload: &[u8], file_data: &[u8]) -> Result<Self> {
        let record = DirectoryRecord::read(&mut RBuffer::new(payload))?;
        Self::read_key_list(file_data, record.seek_keys)
    }

    /// Position of the key list, identifying the directory within its file.
    /// Zero for a directory without keys.
    pub fn seek_keys(&self) -> u64 {
        self.seek_keys
    }

    /// Access the list of keys, in store order (every cycle).
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// One key per name: the highest cycle, at the position where the name
    /// first appears in store order.
    pub fn latest_keys(&self) -> Vec<&Key> {
        let mut out: Vec<&Key> = Vec::with_capacity(self.keys.len());
        let mut slot: HashMap<&str, usize> = HashMap::new();
        for key in &self.keys {
            match slot.get(key.name.as_str()) {
                Some(&i) => {
                    if key.cycle > out[i].cycle {
                        out[i] = key;
                    }
                }
                None => {
                    slot.insert(key.name.as_str(), out.len());
                    out.push(key);
                }
            }
        }
        out
    }

    /// The highest cycle stored under `name`.
    pub fn find_key(&self, name: &str) -> Option<&Key> {
        self.keys.iter().filter(|k| k.name == name).max_by_key(|k| k.cycle)
    }
}
