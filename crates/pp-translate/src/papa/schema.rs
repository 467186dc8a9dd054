//! Map record types and the axis conventions shared by both directions.

use serde::{Deserialize, Serialize};

use super::error::{PapaError, Result};

/// Energy bin edges (GeV).
pub const EBINS: &str = "ebins";
/// Cos-zenith bin edges.
pub const CZBINS: &str = "czbins";
/// Bin contents.
pub const MAP: &str = "map";

/// Key set of a 2D map record, sorted.
pub const MAP_RECORD_KEYS: [&str; 3] = [CZBINS, EBINS, MAP];

/// Energy axis title for linear binning.
pub const LINEAR_ENERGY_TITLE: &str = "E/GeV";
/// Energy axis title for binning in `log10(E)`.
pub const LOG_ENERGY_TITLE: &str = "log_{10}(E/GeV)";
/// Cos-zenith axis title.
pub const COSZEN_TITLE: &str = "cos(#theta)";
/// Label and title text size set on converted histograms.
pub const AXIS_TEXT_SIZE: f32 = 0.04;

/// A 2D energy / cos-zenith map.
///
/// `map[ie][icz]` is the content of the bin between `ebins[ie]..ebins[ie+1]`
/// and `czbins[icz]..czbins[icz+1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapRecord {
    pub ebins: Vec<f64>,
    pub czbins: Vec<f64>,
    pub map: Vec<Vec<f64>>,
}

impl MapRecord {
    /// Check edge ordering and that `map` is `(len(ebins)-1) × (len(czbins)-1)`.
    pub fn validate(&self, name: &str) -> Result<()> {
        check_edges(name, EBINS, &self.ebins)?;
        check_edges(name, CZBINS, &self.czbins)?;

        let (n_e, n_cz) = (self.ebins.len() - 1, self.czbins.len() - 1);
        if self.map.len() != n_e {
            return Err(PapaError::ShapeMismatch {
                name: name.to_string(),
                detail: format!("map has {} rows but ebins define {} bins", self.map.len(), n_e),
            });
        }
        if let Some((ie, row)) = self.map.iter().enumerate().find(|(_, row)| row.len() != n_cz) {
            return Err(PapaError::ShapeMismatch {
                name: name.to_string(),
                detail: format!(
                    "map row {} has {} columns but czbins define {} bins",
                    ie,
                    row.len(),
                    n_cz
                ),
            });
        }
        Ok(())
    }
}

/// A 1D energy spectrum: `entries[i]` is the content between `ebins[i]` and `ebins[i+1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record1D {
    pub ebins: Vec<f64>,
    pub entries: Vec<f64>,
}

/// A reco/true cos-zenith × energy response, indexed `map[reco][true][energy]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record3D {
    pub ebins: Vec<f64>,
    pub czbins_reco: Vec<f64>,
    pub czbins_true: Vec<f64>,
    pub map: Vec<Vec<Vec<f64>>>,
}

/// At least two finite, strictly ascending edges.
fn check_edges(name: &str, axis: &'static str, edges: &[f64]) -> Result<()> {
    let invalid = |detail: String| PapaError::InvalidEdges { name: name.to_string(), axis, detail };
    if edges.len() < 2 {
        return Err(invalid(format!("need at least 2 edges, got {}", edges.len())));
    }
    if let Some(i) = edges.iter().position(|e| !e.is_finite()) {
        return Err(invalid(format!("edge {} is not finite", i)));
    }
    if let Some(i) = edges.windows(2).position(|w| w[0] >= w[1]) {
        return Err(invalid(format!(
            "not strictly ascending at index {}: {} >= {}",
            i + 1,
            edges[i],
            edges[i + 1]
        )));
    }
    Ok(())
}
