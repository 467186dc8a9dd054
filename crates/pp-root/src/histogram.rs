//! In-memory histogram model shared by the reader and the writer.
//!
//! Mirrors ROOT's `TH1`/`TH2`/`TH3` layout: one [`Axis`] per dimension and
//! a dense cell array that includes the under- and overflow bins of every
//! axis. Bin numbers are 1-based per axis (0 = underflow, `n + 1` =
//! overflow); the global cell index is `ix + (nx+2)·(iy + (ny+2)·iz)`.

use crate::error::{Result, RootError};

/// Default axis label/title size used by ROOT (`gStyle`).
pub const DEFAULT_TEXT_SIZE: f32 = 0.035;

/// Storage type of the bin contents, i.e. the class-name suffix
/// (`TH2F` → [`ContentType::F`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContentType {
    /// `float` contents (`TArrayF`).
    #[default]
    F,
    /// `double` contents (`TArrayD`).
    D,
    /// `int` contents (`TArrayI`).
    I,
    /// `short` contents (`TArrayS`).
    S,
    /// `char` contents (`TArrayC`).
    C,
}

impl ContentType {
    /// Class-name suffix character.
    pub fn suffix(self) -> char {
        match self {
            ContentType::F => 'F',
            ContentType::D => 'D',
            ContentType::I => 'I',
            ContentType::S => 'S',
            ContentType::C => 'C',
        }
    }

    fn from_suffix(c: &str) -> Option<Self> {
        match c {
            "F" => Some(ContentType::F),
            "D" => Some(ContentType::D),
            "I" => Some(ContentType::I),
            "S" => Some(ContentType::S),
            "C" => Some(ContentType::C),
            _ => None,
        }
    }

    /// Split a dense histogram class name (`TH1F` … `TH3C`) into its
    /// dimension and content type. Other `TH*` classes (`TH2Poly`, `TH1K`)
    /// are not dense and return `None`.
    pub fn parse_class_name(class_name: &str) -> Option<(usize, ContentType)> {
        let rest = class_name.strip_prefix("TH")?;
        let (dim, suffix) = rest.split_at_checked(1)?;
        let dim = match dim {
            "1" => 1,
            "2" => 2,
            "3" => 3,
            _ => return None,
        };
        Some((dim, Self::from_suffix(suffix)?))
    }

    /// Round a value to what this storage type holds.
    pub fn quantize(self, v: f64) -> f64 {
        match self {
            ContentType::F => v as f32 as f64,
            ContentType::D => v,
            ContentType::I => v as i32 as f64,
            ContentType::S => v as i16 as f64,
            ContentType::C => v as i8 as f64,
        }
    }
}

/// One histogram axis (`TAxis`).
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    /// Axis object name (`xaxis`, `yaxis`, `zaxis`).
    pub name: String,
    /// Axis title, shown along the axis.
    pub title: String,
    /// Number of bins (excluding under/overflow).
    pub n_bins: usize,
    /// Lower edge of the first bin.
    pub x_min: f64,
    /// Upper edge of the last bin.
    pub x_max: f64,
    /// Variable bin edges (`fXbins`, length `n_bins + 1`); empty for uniform binning.
    pub bins: Vec<f64>,
    /// Label text size.
    pub label_size: f32,
    /// Title text size.
    pub title_size: f32,
}

impl Axis {
    /// Uniform binning of `[x_min, x_max)` into `n_bins` bins.
    pub fn uniform(n_bins: usize, x_min: f64, x_max: f64) -> Result<Self> {
        if n_bins == 0 {
            return Err(RootError::Histogram("axis needs at least one bin".into()));
        }
        if !(x_min.is_finite() && x_max.is_finite() && x_min < x_max) {
            return Err(RootError::Histogram(format!(
                "invalid axis range [{}, {}]",
                x_min, x_max
            )));
        }
        Ok(Self {
            name: String::new(),
            title: String::new(),
            n_bins,
            x_min,
            x_max,
            bins: Vec::new(),
            label_size: DEFAULT_TEXT_SIZE,
            title_size: DEFAULT_TEXT_SIZE,
        })
    }

    /// Variable binning from explicit edges (at least two, strictly ascending).
    pub fn variable(edges: &[f64]) -> Result<Self> {
        if edges.len() < 2 {
            return Err(RootError::Histogram(format!(
                "variable axis needs at least 2 edges, got {}",
                edges.len()
            )));
        }
        if let Some(i) = edges.iter().position(|e| !e.is_finite()) {
            return Err(RootError::Histogram(format!("edge {} is not finite", i)));
        }
        if let Some(i) = edges.windows(2).position(|w| w[0] >= w[1]) {
            return Err(RootError::Histogram(format!(
                "edges not strictly ascending at index {}: {} >= {}",
                i + 1,
                edges[i],
                edges[i + 1]
            )));
        }
        let mut axis = Self::uniform(edges.len() - 1, edges[0], edges[edges.len() - 1])?;
        axis.bins = edges.to_vec();
        Ok(axis)
    }

    /// Placeholder axis ROOT stores for unused dimensions (1 bin on `[0, 1]`).
    pub fn unused() -> Self {
        Self {
            name: String::new(),
            title: String::new(),
            n_bins: 1,
            x_min: 0.0,
            x_max: 1.0,
            bins: Vec::new(),
            label_size: DEFAULT_TEXT_SIZE,
            title_size: DEFAULT_TEXT_SIZE,
        }
    }

    /// Set the title (builder style).
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set label and title text size (builder style).
    pub fn with_text_size(mut self, size: f32) -> Self {
        self.label_size = size;
        self.title_size = size;
        self
    }

    /// Whether the axis stores explicit edges.
    pub fn is_variable(&self) -> bool {
        !self.bins.is_empty()
    }

    /// Upper edge of 1-based `bin`, following `TAxis::GetBinUpEdge`.
    ///
    /// Out-of-range bins on a variable axis fall back to the uniform formula,
    /// as ROOT does.
    pub fn bin_up_edge(&self, bin: usize) -> f64 {
        if self.is_variable() && (1..=self.n_bins).contains(&bin) && bin < self.bins.len() {
            self.bins[bin]
        } else {
            let width = (self.x_max - self.x_min) / self.n_bins as f64;
            self.x_min + bin as f64 * width
        }
    }

    /// All `n_bins + 1` edges: `x_min` followed by each bin's upper edge.
    pub fn edges(&self) -> Vec<f64> {
        std::iter::once(self.x_min).chain((1..=self.n_bins).map(|b| self.bin_up_edge(b))).collect()
    }

    /// Number of cells along this axis including under/overflow.
    fn n_cells(&self) -> usize {
        self.n_bins + 2
    }
}

/// A 1D, 2D or 3D histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// Object name (also the key name when written).
    pub name: String,
    /// Histogram title.
    pub title: String,
    /// Storage type of the contents.
    pub content_type: ContentType,
    /// Number of entries (`fEntries`).
    pub entries: f64,
    /// Whether the statistics box is drawn (clear = `kNoStats` set).
    pub show_stats: bool,
    /// Sum of squared weights per cell, if stored (same layout as the cells).
    pub sumw2: Option<Vec<f64>>,
    axes: Vec<Axis>,
    cells: Vec<f64>,
}

impl Histogram {
    /// Empty histogram over the given axes (1 to 3).
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        axes: Vec<Axis>,
        content_type: ContentType,
    ) -> Result<Self> {
        if !(1..=3).contains(&axes.len()) {
            return Err(RootError::Histogram(format!(
                "histograms have 1 to 3 axes, got {}",
                axes.len()
            )));
        }
        let n_cells = checked_cells(&axes)?;
        let mut h = Self {
            name: name.into(),
            title: title.into(),
            content_type,
            entries: 0.0,
            show_stats: true,
            sumw2: None,
            axes,
            cells: vec![0.0; n_cells],
        };
        for (axis, default) in h.axes.iter_mut().zip(["xaxis", "yaxis", "zaxis"]) {
            if axis.name.is_empty() {
                axis.name = default.to_string();
            }
        }
        Ok(h)
    }

    /// Assemble a histogram from a full cell array (as read from disk).
    pub(crate) fn from_cells(
        name: String,
        title: String,
        axes: Vec<Axis>,
        content_type: ContentType,
        cells: Vec<f64>,
    ) -> Result<Self> {
        let mut h = Self::new(name, title, axes, content_type)?;
        if cells.len() != h.cells.len() {
            return Err(RootError::Histogram(format!(
                "cell array of {} values does not match {} cells",
                cells.len(),
                h.cells.len()
            )));
        }
        h.cells = cells;
        Ok(h)
    }

    /// Number of axes.
    pub fn dimension(&self) -> usize {
        self.axes.len()
    }

    /// The axes, x first.
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Mutable access to the axes (titles, text sizes). Binning must not change.
    pub fn axes_mut(&mut self) -> &mut [Axis] {
        &mut self.axes
    }

    /// Axis `i` (0 = x).
    pub fn axis(&self, i: usize) -> Option<&Axis> {
        self.axes.get(i)
    }

    /// ROOT class name, e.g. `TH2F`.
    pub fn class_name(&self) -> String {
        format!("TH{}{}", self.dimension(), self.content_type.suffix())
    }

    /// Total number of cells including under/overflow (`fNcells`).
    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    /// Full cell array including under/overflow.
    pub fn cells(&self) -> &[f64] {
        &self.cells
    }

    /// Global cell index of a per-axis bin tuple (`bin.len() == dimension`).
    pub fn global_bin(&self, bin: &[usize]) -> Result<usize> {
        if bin.len() != self.dimension() {
            return Err(RootError::Histogram(format!(
                "{} bin indices given for a {}D histogram",
                bin.len(),
                self.dimension()
            )));
        }
        let mut index = 0;
        let mut stride = 1;
        for (i, (&b, axis)) in bin.iter().zip(&self.axes).enumerate() {
            if b >= axis.n_cells() {
                return Err(RootError::Histogram(format!(
                    "bin {} out of range on axis {} ({} bins)",
                    b, i, axis.n_bins
                )));
            }
            index += b * stride;
            stride *= axis.n_cells();
        }
        Ok(index)
    }

    /// Content of a bin (`GetBinContent`).
    pub fn bin_content(&self, bin: &[usize]) -> Result<f64> {
        Ok(self.cells[self.global_bin(bin)?])
    }

    /// Set the content of a bin (`SetBinContent`): the value is rounded to
    /// the storage type and the entry count grows by one.
    pub fn set_bin_content(&mut self, bin: &[usize], value: f64) -> Result<()> {
        let idx = self.global_bin(bin)?;
        self.cells[idx] = self.content_type.quantize(value);
        self.entries += 1.0;
        Ok(())
    }
}

fn checked_cells(axes: &[Axis]) -> Result<usize> {
    axes.iter()
        .try_fold(1usize, |acc, a| acc.checked_mul(a.n_cells()))
        .filter(|&n| n <= i32::MAX as usize)
        .ok_or_else(|| RootError::Histogram("too many cells for a ROOT histogram".into()))
}
