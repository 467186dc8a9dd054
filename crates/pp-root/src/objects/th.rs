//! TH1/TH2/TH3 deserialization (all dense content types).
//!
//! ROOT serialization layout (byte-counted version headers on every level):
//! ```text
//! TH{1,2,3}{F,D,I,S,C}
//!   ├─ TH2 / TH3 (only for 2D/3D)
//!   │    ├─ TH1 (base)
//!   │    │    ├─ TNamed (name, title)
//!   │    │    ├─ TAttLine, TAttFill, TAttMarker (skipped via byte count)
//!   │    │    ├─ fNcells (i32)
//!   │    │    ├─ fXaxis, fYaxis, fZaxis (TAxis)
//!   │    │    ├─ fBarOffset, fBarWidth (i16), fEntries, fTsumw, fTsumw2, fTsumwx, fTsumwx2
//!   │    │    ├─ fMaximum, fMinimum (v ≥ 2), fNormFactor (v ≥ 3)
//!   │    │    ├─ fContour, fSumw2 (TArrayD), fOption (TString)
//!   │    │    ├─ fFunctions (TList*), fBufferSize + fBuffer (v ≥ 4)
//!   │    │    └─ fBinStatErrOpt (v ≥ 7), fStatOverflows (v ≥ 8)
//!   │    ├─ TAtt3D (3D only)
//!   │    └─ extra moment sums (skipped via byte count)
//!   └─ TArray{F,D,I,S,C}: i32 length + fNcells values
//! ```

use crate::error::{Result, RootError};
use crate::histogram::{Axis, ContentType, Histogram};
use crate::rbuffer::RBuffer;

/// `TH1::kNoStats`.
pub(crate) const K_NO_STATS: u32 = 1 << 9;

/// Everything read from the TH1 base.
struct Th1Base {
    name: String,
    title: String,
    bits: u32,
    n_cells: usize,
    axes: [Axis; 3],
    entries: f64,
    sumw2: Option<Vec<f64>>,
}

/// Read a dense histogram of the given class from decompressed object bytes.
pub fn read_th(data: &[u8], class_name: &str) -> Result<Histogram> {
    let (dim, content_type) = ContentType::parse_class_name(class_name)
        .ok_or_else(|| RootError::UnsupportedClass(class_name.to_string()))?;

    let mut r = RBuffer::new(data);
    let (ver, end) = r.read_version()?;
    if ver < 1 {
        return Err(RootError::Deserialization(format!(
            "unsupported {} version: {}",
            class_name, ver
        )));
    }

    let base = match dim {
        1 => read_th1_base(&mut r)?,
        _ => {
            // TH2 / TH3 wrap the TH1 base; their own moment sums are skipped.
            let (_ver, inner_end) = r.read_version()?;
            let base = read_th1_base(&mut r)?;
            r.seek_end(inner_end)?;
            base
        }
    };

    let arr_n = r.read_u32()? as usize;
    if arr_n != base.n_cells {
        return Err(RootError::Deserialization(format!(
            "{} array size {} != fNcells {}",
            class_name, arr_n, base.n_cells
        )));
    }
    let cells = match content_type {
        ContentType::F => r.read_array_f32(arr_n)?,
        ContentType::D => r.read_array_f64(arr_n)?,
        ContentType::I => r.read_array_i32(arr_n)?,
        ContentType::S => r.read_array_i16(arr_n)?,
        ContentType::C => r.read_array_i8(arr_n)?,
    };
    r.seek_end(end)?;

    let Th1Base { name, title, bits, n_cells: _, axes, entries, sumw2 } = base;
    let axes: Vec<Axis> = axes.into_iter().take(dim).collect();
    let mut h = Histogram::from_cells(name, title, axes, content_type, cells)?;
    h.entries = entries;
    h.show_stats = bits & K_NO_STATS == 0;
    h.sumw2 = sumw2.filter(|s| s.len() == h.n_cells());
    Ok(h)
}

/// Read the TH1 base class.
fn read_th1_base(r: &mut RBuffer) -> Result<Th1Base> {
    let (th1_ver, th1_end) = r.read_version()?;

    let (obj, name, title) = r.read_tnamed()?;

    // TAttLine, TAttFill, TAttMarker
    for _ in 0..3 {
        skip_streamer_object(r)?;
    }

    let n_cells = r.read_i32()?;
    if n_cells < 3 {
        return Err(RootError::Deserialization(format!("invalid fNcells {}", n_cells)));
    }

    let axes = [read_taxis(r)?, read_taxis(r)?, read_taxis(r)?];

    let _bar_offset = r.read_i16()?;
    let _bar_width = r.read_i16()?;
    let entries = r.read_f64()?;
    let _tsumw = r.read_f64()?;
    let _tsumw2 = r.read_f64()?;
    let _tsumwx = r.read_f64()?;
    let _tsumwx2 = r.read_f64()?;
    if th1_ver >= 2 {
        let _max = r.read_f64()?;
        let _min = r.read_f64()?;
    }
    if th1_ver >= 3 {
        let _norm = r.read_f64()?;
    }

    // fContour
    let contour_n = r.read_u32()? as usize;
    r.skip(contour_n.saturating_mul(8))?;

    // fSumw2
    let sumw2 = r.read_tarray_f64()?;
    let sumw2 = (!sumw2.is_empty()).then_some(sumw2);

    let _option = r.read_string()?;
    r.skip_object_any()?;

    // Buffer, error options and overflow policy are not used; the byte
    // count takes us past them.
    r.seek_end(th1_end)?;

    Ok(Th1Base {
        name,
        title,
        bits: obj.bits,
        n_cells: n_cells as usize,
        axes,
        entries,
        sumw2,
    })
}

/// Read a TAxis.
fn read_taxis(r: &mut RBuffer) -> Result<Axis> {
    let (_ver, axis_end) = r.read_version()?;

    let (_obj, name, title) = r.read_tnamed()?;
    let (label_size, title_size) = read_tattaxis(r)?;

    let n_bins = r.read_i32()?;
    let x_min = r.read_f64()?;
    let x_max = r.read_f64()?;
    let bins = r.read_tarray_f64()?;

    // fFirst, fLast, fBits2, fTimeDisplay, fTimeFormat, fLabels, fModLabs
    r.seek_end(axis_end)?;

    if n_bins < 1 {
        return Err(RootError::Deserialization(format!("axis '{}' has {} bins", name, n_bins)));
    }
    let n_bins = n_bins as usize;
    if !bins.is_empty() && bins.len() != n_bins + 1 {
        return Err(RootError::Deserialization(format!(
            "axis '{}' has {} bins but {} edges",
            name,
            n_bins,
            bins.len()
        )));
    }

    Ok(Axis { name, title, n_bins, x_min, x_max, bins, label_size, title_size })
}

/// Read `TAttAxis`, keeping the label and title sizes.
fn read_tattaxis(r: &mut RBuffer) -> Result<(f32, f32)> {
    let (ver, end) = r.read_version()?;
    let mut sizes = (crate::histogram::DEFAULT_TEXT_SIZE, crate::histogram::DEFAULT_TEXT_SIZE);
    if ver >= 4 && end.is_some() {
        let _ndivisions = r.read_i32()?;
        let _axis_color = r.read_i16()?;
        let _label_color = r.read_i16()?;
        let _label_font = r.read_i16()?;
        let _label_offset = r.read_f32()?;
        sizes.0 = r.read_f32()?;
        let _tick_length = r.read_f32()?;
        let _title_offset = r.read_f32()?;
        sizes.1 = r.read_f32()?;
    }
    r.seek_end(end)?;
    Ok(sizes)
}

/// Skip a streamer object that has a version header with byte_count.
///
/// Every modern ROOT file writes these with a byte count; without one there
/// is no way to know the object's extent.
fn skip_streamer_object(r: &mut RBuffer) -> Result<()> {
    let start = r.pos();
    let (_ver, end) = r.read_version()?;
    if end.is_none() {
        return Err(RootError::Deserialization(format!(
            "object at {} has no byte count and cannot be skipped",
            start
        )));
    }
    r.seek_end(end)
}
