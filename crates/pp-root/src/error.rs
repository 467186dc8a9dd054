//! Error types for ROOT file I/O.

use thiserror::Error;

/// Errors raised while reading or writing ROOT files.
#[derive(Error, Debug)]
pub enum RootError {
    /// I/O error from the underlying file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not start with the `root` magic or is too short.
    #[error("not a ROOT file (bad magic or truncated header)")]
    BadMagic,

    /// A read ran past the end of a buffer.
    #[error("buffer underflow at offset {offset}: need {need} bytes, have {have}")]
    BufferUnderflow {
        /// Position of the failed read.
        offset: usize,
        /// Bytes requested.
        need: usize,
        /// Bytes available.
        have: usize,
    },

    /// A compressed block could not be decoded.
    #[error("decompression error: {0}")]
    Decompression(String),

    /// A payload could not be compressed.
    #[error("compression error: {0}")]
    Compression(String),

    /// Malformed on-disk structure.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// An object cannot be laid out in the small-file format.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// No key with the requested name.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Class not handled by this reader.
    #[error("unsupported class: {0}")]
    UnsupportedClass(String),

    /// Inconsistent histogram definition (axes, bins, cell counts).
    #[error("invalid histogram: {0}")]
    Histogram(String),
}

/// Result alias for ROOT I/O.
pub type Result<T> = std::result::Result<T, RootError>;
