//! ROOT object (de)serialization dispatch.

mod streamer_info;
mod th;
mod th_writer;

pub use streamer_info::{STREAMER_INFO_CLASS, STREAMER_INFO_NAME, STREAMER_INFO_TITLE};

use crate::error::{Result, RootError};
use crate::histogram::Histogram;
use crate::key::ObjectKind;

/// Read a histogram from a decompressed object payload, given its class name.
pub fn read_histogram(payload: &[u8], class_name: &str) -> Result<Histogram> {
    match ObjectKind::from_class_name(class_name) {
        ObjectKind::Hist1D | ObjectKind::Hist2D | ObjectKind::Hist3D => {
            th::read_th(payload, class_name)
        }
        _ => Err(RootError::UnsupportedClass(class_name.to_string())),
    }
}

/// Serialize a histogram into an uncompressed object payload for a key of
/// class [`Histogram::class_name`].
pub fn write_histogram(h: &Histogram) -> Result<Vec<u8>> {
    th_writer::write_th(h)
}

/// Serialize the `StreamerInfo` list describing `class_names` and their
/// dependencies, for a key whose header is `key_len` bytes long.
pub fn write_streamer_info<'a>(
    class_names: impl IntoIterator<Item = &'a str>,
    key_len: usize,
) -> Result<Vec<u8>> {
    let layouts = streamer_info::layouts_for(class_names)?;
    streamer_info::write_streamer_info(&layouts, key_len)
}
