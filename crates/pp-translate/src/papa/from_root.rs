//! ROOT directory tree → nested map records.
//!
//! Every histogram axis is read back as `[x_min, up_edge(1), ..., up_edge(n)]`.
//! Energy axes are stored in `log10(E)` unless titled [`LINEAR_ENERGY_TITLE`],
//! and come out in GeV either way.

use std::collections::HashSet;

use pp_root::{Axis, Directory, Histogram, ObjectKind, RootError, RootFile};
use serde_json::{Map, Value};

use super::error::{PapaError, Result};
use super::schema::{LINEAR_ENERGY_TITLE, MapRecord, Record1D, Record3D};

/// Convert the whole file, mirroring its directory tree.
pub fn root_to_maps(file: &RootFile) -> Result<Map<String, Value>> {
    let top = file.top_directory()?;
    convert_directory(file, &top)
}

/// Convert one directory: histograms become records, subdirectories nested
/// objects, anything else is skipped.
///
/// Of several cycles of one name only the highest is converted. A
/// subdirectory that leads back to a directory already being converted is a
/// deserialization error.
pub fn convert_directory(file: &RootFile, dir: &Directory) -> Result<Map<String, Value>> {
    let mut visiting = HashSet::new();
    convert_tree(file, dir, &mut visiting)
}

fn convert_tree(
    file: &RootFile,
    dir: &Directory,
    visiting: &mut HashSet<u64>,
) -> Result<Map<String, Value>> {
    // Directories without a key list cannot recurse, so only real lists are tracked.
    if dir.seek_keys() != 0 && !visiting.insert(dir.seek_keys()) {
        return Err(RootError::Deserialization(format!(
            "directory key list at {} is its own ancestor",
            dir.seek_keys()
        ))
        .into());
    }

    let mut out = Map::new();
    for key in dir.latest_keys() {
        let value = match key.kind() {
            ObjectKind::Hist1D => {
                tracing::info!("Converting 1D histogram {}", key.name);
                serde_json::to_value(hist1d_to_record(&file.read_histogram(key)?)?)?
            }
            ObjectKind::Hist2D => {
                tracing::info!("Converting 2D histogram {}", key.name);
                serde_json::to_value(hist2d_to_record(&file.read_histogram(key)?)?)?
            }
            ObjectKind::Hist3D => {
                tracing::info!("Converting 3D histogram {}", key.name);
                serde_json::to_value(hist3d_to_record(&file.read_histogram(key)?)?)?
            }
            ObjectKind::Directory => {
                tracing::info!("Converting subdirectory {}", key.name);
                Value::Object(convert_tree(file, &file.subdirectory(key)?, visiting)?)
            }
            ObjectKind::Unknown => {
                tracing::debug!(
                    "Skipping object {} which is of type {}",
                    key.name,
                    key.class_name
                );
                continue;
            }
        };
        out.insert(key.name.clone(), value);
    }
    tracing::info!("Converted {} histograms", out.len());
    visiting.remove(&dir.seek_keys());
    Ok(out)
}

/// `{ebins, entries}` from a 1D histogram.
pub fn hist1d_to_record(h: &Histogram) -> Result<Record1D> {
    let [e_axis] = axes::<1>(h)?;
    let ebins = energy_edges(e_axis);
    log_range(&ebins, "energy");

    let entries =
        (1..=e_axis.n_bins).map(|ie| h.bin_content(&[ie])).collect::<pp_root::Result<_>>()?;
    Ok(Record1D { ebins, entries })
}

/// `{ebins, czbins, map}` from a 2D histogram: X energy, Y cos-zenith.
pub fn hist2d_to_record(h: &Histogram) -> Result<MapRecord> {
    let [e_axis, cz_axis] = axes::<2>(h)?;
    let ebins = energy_edges(e_axis);
    let czbins = cz_axis.edges();
    log_range(&ebins, "energy");
    log_range(&czbins, "cos(zenith)");

    let map = (1..=e_axis.n_bins)
        .map(|ie| {
            (1..=cz_axis.n_bins)
                .map(|icz| h.bin_content(&[ie, icz]))
                .collect::<pp_root::Result<Vec<f64>>>()
        })
        .collect::<pp_root::Result<_>>()?;
    Ok(MapRecord { ebins, czbins, map })
}

/// `{ebins, czbins_reco, czbins_true, map}` from a 3D histogram: X reco
/// cos-zenith, Y true cos-zenith, Z energy; `map[reco][true][energy]`.
pub fn hist3d_to_record(h: &Histogram) -> Result<Record3D> {
    let [reco_axis, true_axis, e_axis] = axes::<3>(h)?;
    let czbins_reco = reco_axis.edges();
    let czbins_true = true_axis.edges();
    let ebins = energy_edges(e_axis);
    log_range(&czbins_reco, "reco cos(zenith)");
    log_range(&czbins_true, "true cos(zenith)");
    log_range(&ebins, "energy");

    let map = (1..=reco_axis.n_bins)
        .map(|ir| {
            (1..=true_axis.n_bins)
                .map(|it| {
                    (1..=e_axis.n_bins)
                        .map(|ie| h.bin_content(&[ir, it, ie]))
                        .collect::<pp_root::Result<Vec<f64>>>()
                })
                .collect::<pp_root::Result<Vec<_>>>()
        })
        .collect::<pp_root::Result<_>>()?;
    Ok(Record3D { ebins, czbins_reco, czbins_true, map })
}

/// Energy edges in GeV.
pub fn energy_edges(axis: &Axis) -> Vec<f64> {
    let edges = axis.edges();
    if axis.title == LINEAR_ENERGY_TITLE {
        edges
    } else {
        edges.into_iter().map(|x| 10f64.powf(x)).collect()
    }
}

fn axes<const N: usize>(h: &Histogram) -> Result<[&Axis; N]> {
    let axes: Vec<&Axis> = h.axes().iter().collect();
    axes.try_into().map_err(|_| PapaError::UnsupportedDimension {
        name: h.name.clone(),
        dimension: h.dimension(),
    })
}

fn log_range(edges: &[f64], label: &str) {
    if let (Some(first), Some(last)) = (edges.first(), edges.last()) {
        tracing::debug!(
            "Found {} bins in {} from {:.2} to {:.2}",
            edges.len() - 1,
            label,
            first,
            last
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pp_root::ContentType;

    fn hist(axes: Vec<Axis>) -> Histogram {
        Histogram::new("h", "h", axes, ContentType::D).unwrap()
    }

    #[test]
    fn log_energy_is_unlogged() {
        let x = Axis::variable(&[0.0, 1.0, 2.0]).unwrap().with_title("log_{10}(E/GeV)");
        let y = Axis::variable(&[-1.0, 0.0, 1.0]).unwrap();
        let rec = hist2d_to_record(&hist(vec![x, y])).unwrap();
        assert_relative_eq!(rec.ebins[0], 1.0);
        assert_relative_eq!(rec.ebins[1], 10.0, max_relative = 1e-12);
        assert_relative_eq!(rec.ebins[2], 100.0, max_relative = 1e-12);
        assert_eq!(rec.czbins, vec![-1.0, 0.0, 1.0]);
        assert_eq!(rec.map, vec![vec![0.0; 2]; 2]);
    }

    #[test]
    fn linear_energy_title_keeps_values() {
        let x = Axis::variable(&[1.0, 50.0, 100.0]).unwrap().with_title(LINEAR_ENERGY_TITLE);
        assert_eq!(energy_edges(&x), vec![1.0, 50.0, 100.0]);
        let untitled = Axis::uniform(2, 0.0, 2.0).unwrap();
        let edges = energy_edges(&untitled);
        assert_relative_eq!(edges[2], 100.0, max_relative = 1e-12);
    }

    #[test]
    fn one_dimensional_entries_align_with_edges() {
        let mut h = hist(vec![Axis::uniform(3, 0.0, 3.0).unwrap()]);
        h.set_bin_content(&[0], 99.0).unwrap(); // underflow is dropped
        h.set_bin_content(&[1], 1.0).unwrap();
        h.set_bin_content(&[3], 3.0).unwrap();
        let rec = hist1d_to_record(&h).unwrap();
        assert_eq!(rec.ebins.len(), 4);
        assert_eq!(rec.entries, vec![1.0, 0.0, 3.0]);
    }

    #[test]
    fn three_dimensional_layout_is_reco_true_energy() {
        let axes = vec![
            Axis::uniform(2, -1.0, 1.0).unwrap(),
            Axis::uniform(3, -1.0, 1.0).unwrap(),
            Axis::uniform(4, 0.0, 2.0).unwrap(),
        ];
        let mut h = hist(axes);
        h.set_bin_content(&[2, 1, 4], 5.0).unwrap();
        let rec = hist3d_to_record(&h).unwrap();

        assert_eq!(rec.czbins_reco.len(), 3);
        assert_eq!(rec.czbins_true.len(), 4);
        assert_eq!(rec.ebins.len(), 5);
        for edges in [&rec.czbins_reco, &rec.czbins_true, &rec.ebins] {
            assert!(edges.windows(2).all(|w| w[0] < w[1]));
        }
        assert_eq!(rec.map.len(), 2);
        assert_eq!(rec.map[0].len(), 3);
        assert_eq!(rec.map[0][0].len(), 4);
        assert_eq!(rec.map[1][0][3], 5.0);
    }

    #[test]
    fn dimension_mismatch_is_reported() {
        let h = hist(vec![Axis::uniform(1, 0.0, 1.0).unwrap()]);
        assert!(matches!(
            hist2d_to_record(&h),
            Err(PapaError::UnsupportedDimension { dimension: 1, .. })
        ));
    }
}
