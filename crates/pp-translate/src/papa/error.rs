//! Error type for map conversion.

use thiserror::Error;

/// Errors raised while converting between map records and histograms.
#[derive(Error, Debug)]
pub enum PapaError {
    /// Malformed JSON, or a record whose values have the wrong type.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ROOT I/O or histogram construction failed.
    #[error("ROOT error: {0}")]
    Root(#[from] pp_root::RootError),

    /// `map` dimensions disagree with the bin edge counts.
    #[error("shape mismatch in '{name}': {detail}")]
    ShapeMismatch {
        /// Record path.
        name: String,
        /// What disagrees.
        detail: String,
    },

    /// Bin edges that cannot define an axis.
    #[error("invalid {axis} in '{name}': {detail}")]
    InvalidEdges {
        /// Record path.
        name: String,
        /// Edge list key (`ebins`, `czbins`).
        axis: &'static str,
        /// What is wrong with them.
        detail: String,
    },

    /// A histogram with a dimension the map format has no record for.
    #[error("'{name}' has unsupported dimension {dimension}")]
    UnsupportedDimension {
        /// Object name.
        name: String,
        /// Its dimension.
        dimension: usize,
    },
}

/// Result alias for map conversion.
pub type Result<T> = std::result::Result<T, PapaError>;
