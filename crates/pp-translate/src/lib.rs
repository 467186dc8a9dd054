//! # pp-translate
//!
//! Format translators between PaPA/PISA JSON maps and ROOT histograms.
//!
//! - [`papa`]: map discovery, logarithmic-axis detection and the two
//!   conversion directions (JSON → ROOT, ROOT → JSON).

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod papa;

pub use papa::{PapaError, Result};
