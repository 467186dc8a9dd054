//! TH1/TH2/TH3 serialization, the inverse of [`th`](super::th).
//!
//! Cosmetic attributes without a counterpart in [`Histogram`] are written
//! with ROOT's defaults.

use crate::error::Result;
use crate::histogram::{Axis, ContentType, Histogram};
use crate::wbuffer::WBuffer;

use super::th::K_NO_STATS;

const TH1_VERSION: u16 = 8;
const TH2_VERSION: u16 = 5;
const TH3_VERSION: u16 = 6;
const TAXIS_VERSION: u16 = 10;
const TATTAXIS_VERSION: u16 = 4;
const TATTLINE_VERSION: u16 = 2;
const TATTFILL_VERSION: u16 = 2;
const TATTMARKER_VERSION: u16 = 2;
const TATT3D_VERSION: u16 = 1;
const TLIST_VERSION: u16 = 5;

/// `EStatOverflows::kNeutral`.
const STAT_OVERFLOWS_NEUTRAL: i32 = 2;

/// Class version of the concrete histogram class (`TH1F` is 3, `TH2F` 4, ...).
fn class_version(dim: usize) -> u16 {
    if dim == 1 { 3 } else { 4 }
}

/// Serialize a histogram into an uncompressed object payload.
pub fn write_th(h: &Histogram) -> Result<Vec<u8>> {
    let dim = h.dimension();
    let mut w = WBuffer::new();

    let top = w.begin_version(class_version(dim));
    match dim {
        1 => write_th1_base(&mut w, h)?,
        2 => {
            let th2 = w.begin_version(TH2_VERSION);
            write_th1_base(&mut w, h)?;
            w.write_f64(1.0); // fScalefactor
            for _ in 0..3 {
                w.write_f64(0.0); // fTsumwy, fTsumwy2, fTsumwxy
            }
            w.end_version(th2)?;
        }
        _ => {
            let th3 = w.begin_version(TH3_VERSION);
            write_th1_base(&mut w, h)?;
            let att3d = w.begin_version(TATT3D_VERSION);
            w.end_version(att3d)?;
            for _ in 0..7 {
                w.write_f64(0.0); // fTsumwy .. fTsumwyz
            }
            w.end_version(th3)?;
        }
    }

    w.write_i32(h.n_cells() as i32);
    for &v in h.cells() {
        match h.content_type {
            ContentType::F => w.write_f32(v as f32),
            ContentType::D => w.write_f64(v),
            ContentType::I => w.write_i32(v as i32),
            ContentType::S => w.write_i16(v as i16),
            ContentType::C => w.write_i8(v as i8),
        }
    }
    w.end_version(top)?;

    Ok(w.into_inner())
}

fn write_th1_base(w: &mut WBuffer, h: &Histogram) -> Result<()> {
    let th1 = w.begin_version(TH1_VERSION);

    let bits = if h.show_stats { 0 } else { K_NO_STATS };
    w.write_tnamed(bits, &h.name, &h.title)?;

    let line = w.begin_version(TATTLINE_VERSION);
    w.write_i16(602); // color
    w.write_i16(1); // style
    w.write_i16(1); // width
    w.end_version(line)?;

    let fill = w.begin_version(TATTFILL_VERSION);
    w.write_i16(0);
    w.write_i16(1001);
    w.end_version(fill)?;

    let marker = w.begin_version(TATTMARKER_VERSION);
    w.write_i16(1);
    w.write_i16(1);
    w.write_f32(1.0);
    w.end_version(marker)?;

    w.write_i32(h.n_cells() as i32);

    let unused = Axis::unused();
    for (i, default_name) in ["xaxis", "yaxis", "zaxis"].into_iter().enumerate() {
        let axis = h.axis(i).unwrap_or(&unused);
        write_taxis(w, axis, default_name)?;
    }

    w.write_i16(0); // fBarOffset
    w.write_i16(1000); // fBarWidth
    w.write_f64(h.entries);
    for _ in 0..4 {
        w.write_f64(0.0); // fTsumw, fTsumw2, fTsumwx, fTsumwx2: recomputed by ROOT when zero
    }
    w.write_f64(-1111.0); // fMaximum
    w.write_f64(-1111.0); // fMinimum
    w.write_f64(0.0); // fNormFactor
    w.write_tarray_f64(&[]); // fContour
    w.write_tarray_f64(h.sumw2.as_deref().unwrap_or(&[]));
    w.write_string(""); // fOption

    // fFunctions: an empty TList
    let list = w.begin_object("TList");
    let body = w.begin_version(TLIST_VERSION);
    w.write_tobject(0);
    w.write_string("");
    w.write_i32(0);
    w.end_version(body)?;
    w.end_version(list)?;

    w.write_i32(0); // fBufferSize
    w.write_u8(0); // fBuffer (null)
    w.write_i32(0); // fBinStatErrOpt
    w.write_i32(STAT_OVERFLOWS_NEUTRAL);

    w.end_version(th1)
}

fn write_taxis(w: &mut WBuffer, axis: &Axis, default_name: &str) -> Result<()> {
    let bc = w.begin_version(TAXIS_VERSION);
    let name = if axis.name.is_empty() { default_name } else { axis.name.as_str() };
    w.write_tnamed(0, name, &axis.title)?;

    let att = w.begin_version(TATTAXIS_VERSION);
    w.write_i32(510); // fNdivisions
    w.write_i16(1); // fAxisColor
    w.write_i16(1); // fLabelColor
    w.write_i16(42); // fLabelFont
    w.write_f32(0.005); // fLabelOffset
    w.write_f32(axis.label_size);
    w.write_f32(0.03); // fTickLength
    w.write_f32(1.0); // fTitleOffset
    w.write_f32(axis.title_size);
    w.write_i16(1); // fTitleColor
    w.write_i16(42); // fTitleFont
    w.end_version(att)?;

    w.write_i32(axis.n_bins as i32);
    w.write_f64(axis.x_min);
    w.write_f64(axis.x_max);
    w.write_tarray_f64(&axis.bins);
    w.write_i32(0); // fFirst
    w.write_i32(0); // fLast
    w.write_u16(0); // fBits2
    w.write_u8(0); // fTimeDisplay
    w.write_string(""); // fTimeFormat
    w.write_null_object(); // fLabels
    w.write_null_object(); // fModLabs

    w.end_version(bc)
}
