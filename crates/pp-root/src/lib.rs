//! # pp-root
//!
//! Native ROOT file reader and writer for dense histograms.
//!
//! Reads TH1/TH2/TH3 histograms (every dense content type) from `.root`
//! files with zlib, LZ4, ZSTD or XZ compressed payloads, and writes
//! small-format files holding histograms in nested directories. No ROOT
//! installation is needed.
//!
//! ## Example
//!
//! ```no_run
//! use pp_root::{Axis, ContentType, Histogram, RootFile, RootWriter, WriteOptions};
//!
//! let x = Axis::variable(&[0.0, 1.0, 2.0]).unwrap().with_title("log_{10}(E/GeV)");
//! let mut h = Histogram::new("numu", "numu", vec![x], ContentType::F).unwrap();
//! h.set_bin_content(&[1], 3.0).unwrap();
//!
//! let mut w = RootWriter::create("maps.root", WriteOptions::default()).unwrap();
//! let dir = w.mkdir_p(w.root(), "pid/trck").unwrap();
//! w.write_histogram(dir, &h).unwrap();
//! w.close().unwrap();
//!
//! let f = RootFile::open("maps.root").unwrap();
//! let back = f.get_histogram("pid/trck/numu").unwrap();
//! assert_eq!(back.bin_content(&[1]).unwrap(), 3.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compress;
pub mod decompress;
pub mod directory;
pub mod error;
pub mod file;
pub mod histogram;
pub mod key;
pub mod objects;
pub mod rbuffer;
pub mod wbuffer;
pub mod writer;

pub use compress::Compression;
pub use directory::Directory;
pub use error::{Result, RootError};
pub use file::RootFile;
pub use histogram::{Axis, ContentType, Histogram};
pub use key::{Key, KeyInfo, ObjectKind};
pub use writer::{DirId, RootWriter, WriteOptions};
