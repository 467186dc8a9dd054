//! Writing small-format ROOT files with histograms and nested directories.
//!
//! Records are appended in memory as they are created; [`RootWriter::close`]
//! (or dropping the writer) appends the key lists and the free-segment
//! record, patches the header and directory records, and flushes the bytes
//! to the file opened by [`RootWriter::create`].
//!
//! File layout produced:
//! ```text
//! 0     header, padded to fBEGIN = 100
//! 100   TFile key, file name/title, top directory record
//! ...   directory keys + records, histogram keys + payloads (creation order)
//! ...   StreamerInfo list (not listed in any directory)
//! ...   one key list per directory
//! ...   free-segment record
//! fEND
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::compress::{Compression, compress};
use crate::directory::{DIRECTORY_RECORD_LEN, DIRECTORY_VERSION, DirectoryRecord};
use crate::error::{Result, RootError};
use crate::file::ROOT_MAGIC;
use crate::histogram::Histogram;
use crate::key::{Key, pack_datime};
use crate::objects::{self, STREAMER_INFO_CLASS, STREAMER_INFO_NAME, STREAMER_INFO_TITLE};
use crate::wbuffer::{WBuffer, string_len};

/// ROOT release stamped into the header (6.28/00).
const ROOT_VERSION: u32 = 62800;

/// fBEGIN: offset of the first record.
const BEGIN: u64 = 100;

/// Size of seek pointers in small files.
const UNITS: u8 = 4;

/// Upper bound of the single free segment.
const FREE_SEGMENT_LAST: i32 = 2_000_000_000;

/// Class name ROOT stores on subdirectory keys.
const SUBDIRECTORY_CLASS: &str = "TDirectory";

/// Options for [`RootWriter::create`].
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Compression applied to histogram payloads.
    pub compression: Compression,
    /// File title.
    pub title: String,
}

/// Handle to a directory inside a [`RootWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirId(usize);

struct DirState {
    name: String,
    title: String,
    record: DirectoryRecord,
    /// Absolute position of `record` in the output.
    record_pos: usize,
    keys: Vec<Key>,
    children: HashMap<String, DirId>,
}

/// Writer for a new ROOT file.
pub struct RootWriter {
    path: PathBuf,
    file: Option<fs::File>,
    out: WBuffer,
    options: WriteOptions,
    file_name: String,
    nbytes_name: u32,
    datime: u32,
    dirs: Vec<DirState>,
    /// Histogram classes written so far, described in the StreamerInfo.
    classes: BTreeSet<String>,
}

impl RootWriter {
    /// Create (truncate) `path` and start a ROOT file in it.
    pub fn create(path: impl AsRef<Path>, options: WriteOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = fs::File::create(&path)?;
        let file_name =
            path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let datime = pack_datime(&Local::now().naive_local());

        let mut out = WBuffer::new();
        out.write_zeros(BEGIN as usize);

        // TFile key, then fName/fTitle, then the top directory record.
        let payload_len =
            string_len(&file_name) + string_len(&options.title) + DIRECTORY_RECORD_LEN;
        let key = Key::new_small(
            "TFile",
            &file_name,
            &options.title,
            payload_len,
            payload_len,
            BEGIN,
            0,
            datime,
        )?;
        key.write(&mut out)?;
        out.write_string(&file_name);
        out.write_string(&options.title);
        let nbytes_name = (out.pos() as u64 - BEGIN) as u32;

        let record = DirectoryRecord {
            version: DIRECTORY_VERSION,
            datime_c: datime,
            datime_m: datime,
            nbytes_keys: 0,
            nbytes_name,
            seek_dir: BEGIN,
            seek_parent: 0,
            seek_keys: 0,
            uuid: uuid::Uuid::new_v4().into_bytes(),
        };
        let record_pos = out.pos();
        record.write(&mut out)?;

        let top = DirState {
            name: file_name.clone(),
            title: options.title.clone(),
            record,
            record_pos,
            keys: Vec::new(),
            children: HashMap::new(),
        };

        tracing::debug!(path = %path.display(), compression = ?options.compression, "creating ROOT file");
        Ok(Self {
            path,
            file: Some(file),
            out,
            options,
            file_name,
            nbytes_name,
            datime,
            dirs: vec![top],
            classes: BTreeSet::new(),
        })
    }

    /// The top-level directory.
    pub fn root(&self) -> DirId {
        DirId(0)
    }

    /// Path of the file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Subdirectory `name` of `parent`, created on first use.
    pub fn mkdir(&mut self, parent: DirId, name: &str) -> Result<DirId> {
        if name.is_empty() || name.contains('/') {
            return Err(RootError::Serialization(format!("invalid directory name '{}'", name)));
        }
        let parent_state = self.dir(parent)?;
        if let Some(&id) = parent_state.children.get(name) {
            return Ok(id);
        }
        let seek_pdir = parent_state.record.seek_dir;

        let seek = self.out.pos() as u64;
        let key = Key::new_small(
            SUBDIRECTORY_CLASS,
            name,
            name,
            DIRECTORY_RECORD_LEN,
            DIRECTORY_RECORD_LEN,
            seek,
            seek_pdir,
            self.datime,
        )?;
        key.write(&mut self.out)?;

        let record = DirectoryRecord {
            version: DIRECTORY_VERSION,
            datime_c: self.datime,
            datime_m: self.datime,
            nbytes_keys: 0,
            nbytes_name: key.key_len as u32,
            seek_dir: seek,
            seek_parent: seek_pdir,
            seek_keys: 0,
            uuid: uuid::Uuid::new_v4().into_bytes(),
        };
        let record_pos = self.out.pos();
        record.write(&mut self.out)?;

        let id = DirId(self.dirs.len());
        self.dirs.push(DirState {
            name: name.to_string(),
            title: name.to_string(),
            record,
            record_pos,
            keys: Vec::new(),
            children: HashMap::new(),
        });
        let parent_state = &mut self.dirs[parent.0];
        parent_state.keys.push(key);
        parent_state.children.insert(name.to_string(), id);

        tracing::debug!(dir = name, "created directory");
        Ok(id)
    }

    /// Create every directory along a `/`-separated path below `parent`.
    pub fn mkdir_p(&mut self, parent: DirId, path: &str) -> Result<DirId> {
        path.split('/').filter(|p| !p.is_empty()).try_fold(parent, |dir, part| self.mkdir(dir, part))
    }

    /// Write a histogram into a directory under its own name.
    ///
    /// Writing a name twice adds a new cycle; readers pick the highest one.
    pub fn write_histogram(&mut self, dir: DirId, h: &Histogram) -> Result<()> {
        let seek_pdir = self.dir(dir)?.record.seek_dir;
        let cycle = self.dirs[dir.0]
            .keys
            .iter()
            .filter(|k| k.name == h.name)
            .map(|k| k.cycle)
            .max()
            .map_or(1, |c| c.saturating_add(1));

        let payload = objects::write_histogram(h)?;
        let compressed = compress(&payload, self.options.compression)?;
        let stored = compressed.as_deref().unwrap_or(&payload);

        let class_name = h.class_name();
        let mut key = Key::new_small(
            &class_name,
            &h.name,
            &h.title,
            payload.len(),
            stored.len(),
            self.out.pos() as u64,
            seek_pdir,
            self.datime,
        )?;
        key.cycle = cycle;
        key.write(&mut self.out)?;
        self.out.write_bytes(stored);

        tracing::debug!(
            name = %h.name,
            class = %class_name,
            cycle,
            bytes = payload.len(),
            stored = stored.len(),
            "wrote histogram"
        );
        self.dirs[dir.0].keys.push(key);
        self.classes.insert(class_name);
        Ok(())
    }

    /// Finalize the file and flush it to disk.
    pub fn close(mut self) -> Result<()> {
        self.finish()
    }

    fn dir(&self, id: DirId) -> Result<&DirState> {
        self.dirs
            .get(id.0)
            .ok_or_else(|| RootError::Serialization(format!("unknown directory handle {}", id.0)))
    }

    fn finish(&mut self) -> Result<()> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };
        let datime = pack_datime(&Local::now().naive_local());

        let (seek_info, nbytes_info) = self.write_streamer_info(datime)?;
        for i in 0..self.dirs.len() {
            self.write_key_list(i, datime)?;
        }

        // Free-segment record
        let seek_free = self.out.pos() as u64;
        let free_key = Key::new_small(
            "TFile",
            &self.file_name,
            &self.options.title,
            10,
            10,
            seek_free,
            BEGIN,
            datime,
        )?;
        let end = seek_free + free_key.n_bytes as u64;
        let end_i32 = i32::try_from(end).map_err(|_| {
            RootError::Serialization(format!("file size {} exceeds the small-file limit", end))
        })?;
        free_key.write(&mut self.out)?;
        self.out.write_u16(1);
        self.out.write_i32(end_i32);
        self.out.write_i32(FREE_SEGMENT_LAST);

        let mut header = WBuffer::new();
        header.write_bytes(ROOT_MAGIC);
        header.write_u32(ROOT_VERSION);
        header.write_u32(BEGIN as u32);
        header.write_u32(end as u32);
        header.write_u32(seek_free as u32);
        header.write_u32(free_key.n_bytes);
        header.write_u32(1); // nfree
        header.write_u32(self.nbytes_name);
        header.write_u8(UNITS);
        header.write_u32(self.options.compression.setting());
        header.write_u32(seek_info);
        header.write_u32(nbytes_info);
        header.write_u16(1);
        header.write_bytes(&self.dirs[0].record.uuid);
        self.out.patch_bytes(0, header.as_slice());

        file.write_all(self.out.as_slice())?;
        file.sync_all()?;

        tracing::info!(
            path = %self.path.display(),
            bytes = end,
            directories = self.dirs.len(),
            "closed ROOT file"
        );
        Ok(())
    }

    /// Append the StreamerInfo record; returns its seek and size for the header.
    fn write_streamer_info(&mut self, datime: u32) -> Result<(u32, u32)> {
        let seek = self.out.pos() as u64;
        let key_len = Key::header_len(STREAMER_INFO_CLASS, STREAMER_INFO_NAME, STREAMER_INFO_TITLE);
        let payload = objects::write_streamer_info(self.classes.iter().map(String::as_str), key_len)?;
        let compressed = compress(&payload, self.options.compression)?;
        let stored = compressed.as_deref().unwrap_or(&payload);

        let key = Key::new_small(
            STREAMER_INFO_CLASS,
            STREAMER_INFO_NAME,
            STREAMER_INFO_TITLE,
            payload.len(),
            stored.len(),
            seek,
            BEGIN,
            datime,
        )?;
        key.write(&mut self.out)?;
        self.out.write_bytes(stored);

        tracing::debug!(classes = self.classes.len(), bytes = payload.len(), "wrote StreamerInfo");
        Ok((seek as u32, key.n_bytes))
    }

    /// Append the key list of directory `i` and point its record at it.
    fn write_key_list(&mut self, i: usize, datime: u32) -> Result<()> {
        let seek = self.out.pos() as u64;
        let state = &self.dirs[i];
        let class_name = if i == 0 { "TFile" } else { SUBDIRECTORY_CLASS };
        let list_len = 4 + state.keys.iter().map(|k| k.key_len as usize).sum::<usize>();
        let seek_pdir = if i == 0 { BEGIN } else { state.record.seek_dir };

        let list_key = Key::new_small(
            class_name,
            &state.name,
            &state.title,
            list_len,
            list_len,
            seek,
            seek_pdir,
            datime,
        )?;
        list_key.write(&mut self.out)?;
        self.out.write_i32(state.keys.len() as i32);
        for key in &state.keys {
            key.write(&mut self.out)?;
        }

        let state = &mut self.dirs[i];
        state.record.seek_keys = seek;
        state.record.nbytes_keys = list_key.n_bytes;
        state.record.datime_m = datime;

        let mut record = WBuffer::new();
        state.record.write(&mut record)?;
        self.out.patch_bytes(state.record_pos, record.as_slice());
        Ok(())
    }
}

impl Drop for RootWriter {
    fn drop(&mut self) {
        if self.file.is_some()
            && let Err(e) = self.finish()
        {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to finalize ROOT file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::RootFile;
    use crate::histogram::{Axis, ContentType};
    use crate::rbuffer::RBuffer;

    fn hist(name: &str) -> Histogram {
        let x = Axis::variable(&[0.0, 1.0, 3.0]).unwrap();
        let mut h = Histogram::new(name, name, vec![x], ContentType::D).unwrap();
        h.set_bin_content(&[1], 2.5).unwrap();
        h
    }

    #[test]
    fn header_and_top_directory_are_consistent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.root");
        let mut w = RootWriter::create(&path, WriteOptions::default()).unwrap();
        let root = w.root();
        w.write_histogram(root, &hist("h")).unwrap();
        w.close().unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], b"root");
        let end = u32::from_be_bytes(bytes[12..16].try_into().unwrap()) as usize;
        assert_eq!(end, bytes.len());
        let compress = u32::from_be_bytes(bytes[33..37].try_into().unwrap());
        assert_eq!(compress, 101);

        let f = RootFile::open(&path).unwrap();
        assert_eq!(f.version(), ROOT_VERSION);
        assert!(!f.is_large());
        let top = f.top_directory().unwrap();
        assert_eq!(top.keys().len(), 1);
        let created = top.keys()[0].created().expect("valid key timestamp");
        assert!(created.and_utc().timestamp() > 0);
    }

    #[test]
    fn streamer_info_describes_written_classes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("info.root");
        let mut w = RootWriter::create(&path, WriteOptions::default()).unwrap();
        let root = w.root();
        w.write_histogram(root, &hist("h")).unwrap();
        w.close().unwrap();

        let bytes = fs::read(&path).unwrap();
        let seek_info = u32::from_be_bytes(bytes[37..41].try_into().unwrap()) as usize;
        let nbytes_info = u32::from_be_bytes(bytes[41..45].try_into().unwrap());
        assert!(seek_info > BEGIN as usize);

        let key = Key::read(&mut RBuffer::at(&bytes, seek_info)).unwrap();
        assert_eq!(key.n_bytes, nbytes_info);
        assert_eq!(
            (key.class_name.as_str(), key.name.as_str()),
            (STREAMER_INFO_CLASS, STREAMER_INFO_NAME)
        );

        let f = RootFile::open(&path).unwrap();
        let payload = f.read_key_payload(&key).unwrap();
        let mut r = RBuffer::new(&payload);
        r.read_version().unwrap();
        r.read_tobject().unwrap();
        r.read_string().unwrap();
        // TH1D, TH1, TNamed, TObject, TAttLine, TAttFill, TAttMarker, TAxis,
        // TAttAxis, TArrayD, TArray
        assert_eq!(r.read_i32().unwrap(), 11);

        // Not part of any directory listing.
        assert!(f.list_keys().unwrap().iter().all(|k| k.name != STREAMER_INFO_NAME));
    }

    #[test]
    fn mkdir_is_idempotent_and_rejects_bad_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = RootWriter::create(dir.path().join("d.root"), WriteOptions::default()).unwrap();
        let root = w.root();
        let a = w.mkdir(root, "a").unwrap();
        assert_eq!(w.mkdir(root, "a").unwrap(), a);
        let b = w.mkdir_p(root, "a/b").unwrap();
        assert_ne!(a, b);
        assert_eq!(w.mkdir(a, "b").unwrap(), b);
        assert!(w.mkdir(root, "").is_err());
        assert!(w.mkdir(root, "x/y").is_err());
        assert!(w.mkdir(DirId(99), "z").is_err());
    }

    #[test]
    fn dropping_the_writer_finalizes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dropped.root");
        {
            let mut w = RootWriter::create(&path, WriteOptions::default()).unwrap();
            let root = w.root();
            w.write_histogram(root, &hist("kept")).unwrap();
        }
        let f = RootFile::open(&path).unwrap();
        assert_eq!(f.get_histogram("kept").unwrap().bin_content(&[1]).unwrap(), 2.5);
    }

    #[test]
    fn rewriting_a_name_bumps_the_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cycles.root");
        let mut w = RootWriter::create(&path, WriteOptions::default()).unwrap();
        let root = w.root();
        w.write_histogram(root, &hist("h")).unwrap();
        let mut second = hist("h");
        second.set_bin_content(&[2], 9.0).unwrap();
        w.write_histogram(root, &second).unwrap();
        w.close().unwrap();

        let f = RootFile::open(&path).unwrap();
        let cycles: Vec<u16> = f.list_keys().unwrap().iter().map(|k| k.cycle).collect();
        assert_eq!(cycles, vec![1, 2]);
        assert_eq!(f.get_histogram("h").unwrap().bin_content(&[2]).unwrap(), 9.0);
    }
}
