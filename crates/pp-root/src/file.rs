//! TFile header parsing and top-level ROOT file interface.

use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use crate::decompress::decompress;
use crate::directory::{Directory, DirectoryRecord};
use crate::error::{Result, RootError};
use crate::histogram::Histogram;
use crate::key::{Key, KeyInfo, ObjectKind};
use crate::objects;
use crate::rbuffer::RBuffer;

/// File magic.
pub(crate) const ROOT_MAGIC: &[u8; 4] = b"root";

/// Smallest file that can hold a header.
const MIN_FILE_LEN: usize = 64;

/// Backing storage for a ROOT file.
///
/// `Owned` is used for `from_bytes()` and testing.
enum DataSource {
    Owned(Vec<u8>),
    Mmap(memmap2::Mmap),
}

impl Deref for DataSource {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        match self {
            DataSource::Owned(v) => v,
            DataSource::Mmap(m) => m,
        }
    }
}

/// Parsed ROOT file header.
#[derive(Debug, Clone)]
struct FileHeader {
    /// fVersion (ROOT release, +1000000 for large files).
    version: u32,
    /// Whether the file uses large (64-bit) seek pointers (version >= 1000000).
    is_large: bool,
    /// fCompress.
    compress: u32,
    /// The top directory's streamer (located at fBEGIN + fNbytesName).
    top: DirectoryRecord,
}

/// A ROOT file opened for reading histograms.
pub struct RootFile {
    /// Raw file bytes (owned or memory-mapped).
    data: DataSource,
    header: FileHeader,
    /// Path for diagnostics.
    path: PathBuf,
}

impl std::fmt::Debug for RootFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootFile")
            .field("path", &self.path)
            .field("len", &self.data.len())
            .field("header", &self.header)
            .finish()
    }
}

impl RootFile {
    /// Open and parse a ROOT file from disk using memory mapping.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = fs::File::open(&path)?;
        // SAFETY: the map is only read. Concurrent truncation of the file by
        // another process is outside what this reader guards against.
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        Self::from_datasource(DataSource::Mmap(mmap), path)
    }

    /// Parse a ROOT file from a byte vector.
    pub fn from_bytes(data: Vec<u8>, path: PathBuf) -> Result<Self> {
        Self::from_datasource(DataSource::Owned(data), path)
    }

    fn from_datasource(data: DataSource, path: PathBuf) -> Result<Self> {
        if data.len() < MIN_FILE_LEN || &data[0..4] != ROOT_MAGIC {
            return Err(RootError::BadMagic);
        }
        let header = Self::parse_header(&data)?;
        tracing::debug!(
            path = %path.display(),
            version = header.version,
            compress = header.compress,
            "opened ROOT file"
        );
        Ok(Self { data, header, path })
    }

    /// Parse the file-level header and the embedded top directory.
    ///
    /// ROOT file header layout (small file, version < 1000000):
    /// ```text
    /// offset  size  field
    ///    0      4   magic "root"
    ///    4      4   fVersion
    ///    8      4   fBEGIN
    ///   12      4   fEND
    ///   16      4   fSeekFree
    ///   20      4   fNbytesFree
    ///   24      4   nfree
    ///   28      4   fNbytesName
    ///   32      1   fUnits
    ///   33      4   fCompress
    ///   37      4   fSeekInfo
    ///   41      4   fNbytesInfo
    ///   45     18   fUUID
    /// ```
    /// Large files widen fEND, fSeekFree and fSeekInfo to 8 bytes.
    fn parse_header(data: &[u8]) -> Result<FileHeader> {
        let mut r = RBuffer::at(data, 4);

        let version = r.read_u32()?;
        let is_large = version >= 1_000_000;
        let begin = r.read_u32()? as usize;

        if is_large {
            let _end = r.read_u64()?;
            let _seek_free = r.read_u64()?;
        } else {
            let _end = r.read_u32()?;
            let _seek_free = r.read_u32()?;
        }
        let _nbytes_free = r.read_u32()?;
        let _nfree = r.read_u32()?;
        let nbytes_name = r.read_u32()? as usize;
        let _units = r.read_u8()?;
        let compress = r.read_u32()?;

        let dir_offset = begin
            .checked_add(nbytes_name)
            .filter(|&o| o < data.len())
            .ok_or_else(|| {
                RootError::Deserialization("top directory offset past end of file".into())
            })?;
        let top = DirectoryRecord::read(&mut RBuffer::at(data, dir_offset))?;

        Ok(FileHeader { version, is_large, compress, top })
    }

    /// Path the file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// ROOT version that wrote the file.
    pub fn version(&self) -> u32 {
        self.header.version % 1_000_000
    }

    /// The `fCompress` setting from the header.
    pub fn compression(&self) -> u32 {
        self.header.compress
    }

    /// Whether file uses 64-bit seek pointers.
    pub fn is_large(&self) -> bool {
        self.header.is_large
    }

    /// The top-level directory.
    pub fn top_directory(&self) -> Result<Directory> {
        Directory::read_key_list(&self.data, self.header.top.seek_keys)
    }

    /// The directory stored under a `TDirectoryFile` key.
    pub fn subdirectory(&self, key: &Key) -> Result<Directory> {
        if key.kind() != ObjectKind::Directory {
            return Err(RootError::Deserialization(format!(
                "'{}' is not a directory (class: {})",
                key.name, key.class_name
            )));
        }
        let payload = self.read_key_payload(key)?;
        Directory::read_from_payload(&payload, &self.data)
    }

    /// List all keys in the top-level directory.
    pub fn list_keys(&self) -> Result<Vec<KeyInfo>> {
        let dir = self.top_directory()?;
        Ok(dir.keys().iter().map(KeyInfo::from_key).collect())
    }

    /// Get a histogram by its full path (e.g. `"subdir/hist_name"`).
    pub fn get_histogram(&self, path: &str) -> Result<Histogram> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((name, dirs)) = parts.split_last() else {
            return Err(RootError::KeyNotFound(path.to_string()));
        };

        let mut dir = self.top_directory()?;
        for &part in dirs {
            let key = dir
                .find_key(part)
                .ok_or_else(|| RootError::KeyNotFound(format!("{} (in path {})", part, path)))?;
            dir = self.subdirectory(key)?;
        }

        let key = dir.find_key(name).ok_or_else(|| RootError::KeyNotFound(path.to_string()))?;
        self.read_histogram(key)
    }

    /// Read the histogram stored under a key.
    pub fn read_histogram(&self, key: &Key) -> Result<Histogram> {
        let payload = self.read_key_payload(key)?;
        objects::read_histogram(&payload, &key.class_name)
    }

    /// Read and decompress the payload of a TKey.
    pub fn read_key_payload(&self, key: &Key) -> Result<Vec<u8>> {
        let seek = usize::try_from(key.seek_key).map_err(|_| {
            RootError::Deserialization(format!("seek offset too large: {}", key.seek_key))
        })?;
        let n_bytes = key.n_bytes as usize;
        let key_len = key.key_len as usize;
        let end = seek.checked_add(n_bytes).filter(|&e| e <= self.data.len()).ok_or(
            RootError::BufferUnderflow {
                offset: seek,
                need: n_bytes,
                have: self.data.len().saturating_sub(seek),
            },
        )?;
        if key_len > n_bytes {
            return Err(RootError::Deserialization(format!(
                "key '{}' header ({} bytes) is larger than the record ({} bytes)",
                key.name, key_len, n_bytes
            )));
        }

        // Object data starts after the key header.
        let stored = &self.data[seek + key_len..end];
        if key.obj_len as usize != stored.len() {
            decompress(stored, key.obj_len as usize)
        } else {
            Ok(stored.to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_non_root_file() {
        let data = vec![0u8; 100];
        let result = RootFile::from_bytes(data, PathBuf::from("test.root"));
        assert!(matches!(result, Err(RootError::BadMagic)));
    }

    #[test]
    fn reject_too_small() {
        let data = b"root".to_vec();
        let result = RootFile::from_bytes(data, PathBuf::from("test.root"));
        assert!(matches!(result, Err(RootError::BadMagic)));
    }

    #[test]
    fn reject_truncated_directory() {
        let mut data = vec![0u8; 80];
        data[0..4].copy_from_slice(ROOT_MAGIC);
        data[4..8].copy_from_slice(&62800u32.to_be_bytes());
        data[8..12].copy_from_slice(&100u32.to_be_bytes());
        let result = RootFile::from_bytes(data, PathBuf::from("test.root"));
        assert!(matches!(result, Err(RootError::Deserialization(_))));
    }

    #[test]
    fn open_missing_file_is_io_error() {
        let result = RootFile::open("/nonexistent/definitely/missing.root");
        assert!(matches!(result, Err(RootError::Io(_))));
    }
}
