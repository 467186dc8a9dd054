//! Map records → 2D ROOT histograms.

use pp_root::{Axis, ContentType, Histogram};
use serde::Deserialize;
use serde_json::Value;

use super::axis::{DEFAULT_LOG_TOLERANCE, is_logarithmic_within};
use super::discover::find_histograms;
use super::error::Result;
use super::schema::{
    AXIS_TEXT_SIZE, COSZEN_TITLE, LINEAR_ENERGY_TITLE, LOG_ENERGY_TITLE, MapRecord,
};

/// How map records are turned into histograms.
#[derive(Debug, Clone, Copy)]
pub struct ToRootOptions {
    /// Storage type of the bin contents (`F` → `TH2F`).
    pub content_type: ContentType,
    /// Bin in `log10(E)` when the energy edges are logarithmic.
    pub detect_log_energy: bool,
    /// Tolerance handed to the logarithmic-edge check.
    pub log_tolerance: f64,
}

impl Default for ToRootOptions {
    fn default() -> Self {
        Self {
            content_type: ContentType::F,
            detect_log_energy: true,
            log_tolerance: DEFAULT_LOG_TOLERANCE,
        }
    }
}

/// Parse a JSON document and convert every map record in it.
pub fn json_to_histograms(json: &str, options: &ToRootOptions) -> Result<Vec<Histogram>> {
    let document: Value = serde_json::from_str(json)?;
    maps_to_histograms(&document, options)
}

/// Convert every map record found in `document`, in discovery order.
pub fn maps_to_histograms(document: &Value, options: &ToRootOptions) -> Result<Vec<Histogram>> {
    find_histograms(document)
        .iter()
        .map(|(name, value)| {
            let record = MapRecord::deserialize(value)?;
            map_to_histogram(name, &record, options)
        })
        .collect()
}

/// Build the 2D histogram for one record, named and titled `name`.
///
/// X is energy (in `log10(E)` when the edges are logarithmic), Y is
/// cos-zenith. `map[ie][icz]` fills bin `(ie + 1, icz + 1)`.
pub fn map_to_histogram(
    name: &str,
    record: &MapRecord,
    options: &ToRootOptions,
) -> Result<Histogram> {
    record.validate(name)?;

    let log_energy =
        options.detect_log_energy && is_logarithmic_within(&record.ebins, options.log_tolerance);
    let (energy_edges, energy_title) = if log_energy {
        tracing::debug!("Converting energy axis of {:?} to log10(E)", name);
        (record.ebins.iter().map(|e| e.log10()).collect(), LOG_ENERGY_TITLE)
    } else {
        (record.ebins.clone(), LINEAR_ENERGY_TITLE)
    };

    let x = Axis::variable(&energy_edges)?
        .with_title(energy_title)
        .with_text_size(AXIS_TEXT_SIZE);
    let y = Axis::variable(&record.czbins)?
        .with_title(COSZEN_TITLE)
        .with_text_size(AXIS_TEXT_SIZE);

    let mut h = Histogram::new(name, name, vec![x, y], options.content_type)?;
    for (ie, row) in record.map.iter().enumerate() {
        for (icz, &value) in row.iter().enumerate() {
            h.set_bin_content(&[ie + 1, icz + 1], value)?;
        }
    }
    h.show_stats = false;

    tracing::debug!(
        "Built {} {:?}: {} energy x {} cos-zenith bins",
        h.class_name(),
        name,
        record.ebins.len() - 1,
        record.czbins.len() - 1
    );
    Ok(h)
}
