//! PaPA/PISA oscillation-analysis map format.
//!
//! The pipeline stores 2D energy / cos-zenith maps as JSON objects with
//! exactly the keys `ebins`, `czbins` and `map`, nested anywhere inside a
//! larger document.
//!
//! # Modules
//!
//! - [`schema`]: record types and axis constants.
//! - [`discover`]: finds map records inside an arbitrary JSON document.
//! - [`axis`]: logarithmic bin-edge detection.
//! - [`to_root`]: map records → 2D histograms.
//! - [`from_root`]: ROOT directory tree → nested JSON records.

pub mod axis;
pub mod discover;
pub mod error;
pub mod from_root;
pub mod schema;
pub mod to_root;

#[cfg(test)]
mod tests;

pub use axis::{DEFAULT_LOG_TOLERANCE, is_logarithmic, is_logarithmic_within, logspace};
pub use discover::{collect_histograms, find_histograms, is_map_record};
pub use error::{PapaError, Result};
pub use from_root::{convert_directory, root_to_maps};
pub use schema::*;
pub use to_root::{ToRootOptions, json_to_histograms, map_to_histogram, maps_to_histograms};
