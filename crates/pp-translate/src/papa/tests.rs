//! End-to-end tests for the map format: JSON → ROOT file → JSON.

use approx::assert_relative_eq;
use pp_root::{
    Axis, Compression, ContentType, Histogram, RootError, RootFile, RootWriter, WriteOptions,
};
use proptest::prelude::*;
use serde_json::{Value, json};

use super::*;

fn write_all(path: &std::path::Path, hists: &[Histogram]) {
    let mut w = RootWriter::create(path, WriteOptions::default()).unwrap();
    let root = w.root();
    for h in hists {
        w.write_histogram(root, h).unwrap();
    }
    w.close().unwrap();
}

fn round_trip(doc: &Value, options: &ToRootOptions) -> serde_json::Map<String, Value> {
    let hists = maps_to_histograms(doc, options).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rt.root");
    write_all(&path, &hists);
    root_to_maps(&RootFile::open(&path).unwrap()).unwrap()
}

fn as_record(v: &Value) -> MapRecord {
    serde_json::from_value(v.clone()).unwrap()
}

// ---------------------------------------------------------------------------
// Documented scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_log_map_scenario() {
    let doc = json!({"a": {"ebins": [1, 10, 100], "czbins": [-1, 0, 1], "map": [[1, 2], [3, 4]]}});
    let hists = maps_to_histograms(&doc, &ToRootOptions::default()).unwrap();
    assert_eq!(hists.len(), 1);

    let h = &hists[0];
    assert_eq!(h.name, "a");
    assert_eq!(h.dimension(), 2);
    assert_eq!(h.axes()[0].title, LOG_ENERGY_TITLE);
    assert_eq!(h.axes()[0].n_bins, 2);
    assert_eq!(h.axes()[1].n_bins, 2);
    let contents: Vec<f64> =
        [[1, 1], [1, 2], [2, 1], [2, 2]].iter().map(|b| h.bin_content(b).unwrap()).collect();
    assert_eq!(contents, vec![1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn test_binary_to_json_scenario() {
    let x = Axis::variable(&[0.0, 1.0, 2.0]).unwrap().with_title(LOG_ENERGY_TITLE);
    let y = Axis::variable(&[-1.0, 0.0, 1.0]).unwrap().with_title(COSZEN_TITLE);
    let h = Histogram::new("h", "h", vec![x, y], ContentType::F).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scenario.root");
    write_all(&path, &[h]);

    let maps = root_to_maps(&RootFile::open(&path).unwrap()).unwrap();
    let rec = as_record(&maps["h"]);
    assert_relative_eq!(rec.ebins[0], 1.0);
    assert_relative_eq!(rec.ebins[1], 10.0, max_relative = 1e-12);
    assert_relative_eq!(rec.ebins[2], 100.0, max_relative = 1e-12);
    assert_eq!(rec.czbins, vec![-1.0, 0.0, 1.0]);
}

// ---------------------------------------------------------------------------
// Round trips
// ---------------------------------------------------------------------------

#[test]
fn test_linear_round_trip_is_exact() {
    let rec = json!({"ebins": [1.0, 3.5, 20.0, 80.0], "czbins": [-1.0, -0.2, 0.4, 1.0],
                     "map": [[0.5, 1.0, 2.0], [3.0, 4.25, 5.0], [6.0, 7.0, 8.5]]});
    let maps = round_trip(&json!({"nu": rec}), &ToRootOptions::default());
    assert_eq!(as_record(&maps["nu"]), as_record(&rec));
}

#[test]
fn test_log_round_trip_within_tolerance() {
    let ebins = logspace(0.0, 2.0, 11);
    let czbins = vec![-1.0, 0.0, 1.0];
    let map: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, 0.5 * i as f64]).collect();
    let doc = json!({"pid": {"trck": {"ebins": ebins, "czbins": czbins, "map": map}}});

    let maps = round_trip(&doc, &ToRootOptions::default());
    let rec = as_record(&maps["pid_trck"]);
    for (got, want) in rec.ebins.iter().zip(&ebins) {
        assert_relative_eq!(*got, *want, max_relative = 1e-12);
    }
    assert_eq!(rec.czbins, czbins);
    assert_eq!(rec.map, map);
}

#[test]
fn test_nested_directories_mirror_tree() {
    let uniform = |n, lo, hi| Axis::uniform(n, lo, hi).unwrap();
    let h1 = Histogram::new("flux", "flux", vec![uniform(2, 0.0, 2.0)], ContentType::D).unwrap();
    let h2 = Histogram::new(
        "map",
        "map",
        vec![uniform(2, 0.0, 2.0), uniform(2, -1.0, 1.0)],
        ContentType::F,
    )
    .unwrap();
    let h3 = Histogram::new(
        "resp",
        "resp",
        vec![uniform(2, -1.0, 1.0), uniform(3, -1.0, 1.0), uniform(4, 0.0, 2.0)],
        ContentType::F,
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tree.root");
    let mut w = RootWriter::create(&path, WriteOptions::default()).unwrap();
    let root = w.root();
    w.write_histogram(root, &h1).unwrap();
    let sub = w.mkdir(root, "sub").unwrap();
    w.write_histogram(sub, &h2).unwrap();
    let deeper = w.mkdir(sub, "deeper").unwrap();
    w.write_histogram(deeper, &h3).unwrap();
    w.close().unwrap();

    let maps = root_to_maps(&RootFile::open(&path).unwrap()).unwrap();
    assert_eq!(maps.keys().collect::<Vec<_>>(), vec!["flux", "sub"]);
    assert_eq!(maps["flux"]["entries"], json!([0.0, 0.0]));
    assert!(maps["sub"]["map"]["czbins"].is_array());

    let resp: Record3D = serde_json::from_value(maps["sub"]["deeper"]["resp"].clone()).unwrap();
    let lens = (resp.czbins_reco.len(), resp.czbins_true.len(), resp.ebins.len());
    assert_eq!(lens, (3, 4, 5));
}

#[test]
fn test_highest_cycle_wins() {
    let doc = json!({"a": {"ebins": [1.0, 2.0], "czbins": [0.0, 1.0], "map": [[1.0]]}});
    let mut first = maps_to_histograms(&doc, &ToRootOptions::default()).unwrap();
    let mut second = first.clone();
    second[0].set_bin_content(&[1, 1], 7.0).unwrap();
    first.extend(second);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cycles.root");
    write_all(&path, &first);

    let maps = root_to_maps(&RootFile::open(&path).unwrap()).unwrap();
    assert_eq!(maps.len(), 1);
    assert_eq!(as_record(&maps["a"]).map, vec![vec![7.0]]);
}

#[test]
fn test_foreign_objects_are_skipped() {
    let axis = Axis::uniform(2, 0.0, 2.0).unwrap();
    let keep = Histogram::new("keep", "keep", vec![axis.clone()], ContentType::D).unwrap();
    let odd = Histogram::new("odd1", "odd1", vec![axis], ContentType::D).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("foreign.root");
    let options = WriteOptions { compression: Compression::None, ..Default::default() };
    let mut w = RootWriter::create(&path, options).unwrap();
    let root = w.root();
    w.write_histogram(root, &keep).unwrap();
    w.write_histogram(root, &odd).unwrap();
    w.close().unwrap();

    // Relabel "odd1" as a class the converter does not know, both in its own
    // key header and in the directory's key list.
    let mut bytes = std::fs::read(&path).unwrap();
    let from = b"\x04TH1D\x04odd1";
    let to = b"\x04TXYZ\x04odd1";
    let mut hits = 0;
    for i in 0..=bytes.len() - from.len() {
        if &bytes[i..i + from.len()] == from {
            bytes[i..i + to.len()].copy_from_slice(to);
            hits += 1;
        }
    }
    assert_eq!(hits, 2);

    let file = RootFile::from_bytes(bytes, path).unwrap();
    let maps = root_to_maps(&file).unwrap();
    assert_eq!(maps.keys().collect::<Vec<_>>(), vec!["keep"]);
}

#[test]
fn test_directory_pointing_at_ancestor_is_rejected() {
    let h = Histogram::new("h", "h", vec![Axis::uniform(2, 0.0, 2.0).unwrap()], ContentType::D)
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loop.root");
    let mut w = RootWriter::create(&path, WriteOptions::default()).unwrap();
    let root = w.root();
    let sub = w.mkdir(root, "loop").unwrap();
    w.write_histogram(sub, &h).unwrap();
    w.close().unwrap();

    let file = RootFile::open(&path).unwrap();
    let top = file.top_directory().unwrap();
    let key = top.keys().iter().find(|k| k.name == "loop").unwrap().clone();
    drop(file);

    // fSeekKeys sits 26 bytes into the small directory record.
    let mut bytes = std::fs::read(&path).unwrap();
    let at = key.seek_key as usize + key.key_len as usize + 26;
    let top_keys = u32::try_from(top.seek_keys()).unwrap();
    bytes[at..at + 4].copy_from_slice(&top_keys.to_be_bytes());

    let file = RootFile::from_bytes(bytes, path).unwrap();
    let err = root_to_maps(&file).unwrap_err();
    assert!(
        matches!(err, PapaError::Root(RootError::Deserialization(_))),
        "unexpected error: {err}"
    );
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_generated_log_grids_are_detected(lo in -2.0f64..2.0, decades in 0.5f64..4.0, n in 3usize..60) {
        prop_assert!(is_logarithmic(&logspace(lo, lo + decades, n)));
    }

    #[test]
    fn prop_wide_linear_grids_are_rejected(first in 0.01f64..1.0, n in 3usize..60) {
        let last = first * 1.0e4;
        let step = (last - first) / (n - 1) as f64;
        let edges: Vec<f64> = (0..n).map(|i| first + step * i as f64).collect();
        prop_assert!(!is_logarithmic(&edges));
    }

    #[test]
    fn prop_disjoint_records_are_all_found(k in 1usize..12, nest in 0usize..3) {
        let mut doc = serde_json::Map::new();
        for i in 0..k {
            let mut v = json!({"ebins": [1, 2], "czbins": [0, 1], "map": [[i]]});
            for depth in 0..nest {
                let mut wrapper = serde_json::Map::new();
                wrapper.insert(format!("d{}", depth), v);
                v = Value::Object(wrapper);
            }
            doc.insert(format!("r{}", i), v);
        }
        let found = find_histograms(&Value::Object(doc));
        prop_assert_eq!(found.len(), k);
    }

    #[test]
    fn prop_superset_keys_are_not_records(extra in "[a-z]{1,8}") {
        prop_assume!(!["ebins", "czbins", "map"].contains(&extra.as_str()));
        let mut obj = json!({"ebins": [1, 2], "czbins": [0, 1], "map": [[1]]});
        obj[extra.as_str()] = json!(0);
        prop_assert!(!is_map_record(&obj));
        prop_assert!(find_histograms(&obj).is_empty());
    }

    #[test]
    fn prop_map_grid_survives_round_trip(
        values in proptest::collection::vec(0u32..100_000, 6),
        log_energy in any::<bool>(),
    ) {
        let ebins = if log_energy { logspace(0.0, 3.0, 4) } else { vec![1.0, 5.0, 9.0, 30.0] };
        let map: Vec<Vec<f64>> = values.chunks(2).map(|c| c.iter().map(|&v| v as f64).collect()).collect();
        let doc = json!({"m": {"ebins": ebins, "czbins": [-1.0, 0.0, 1.0], "map": map}});
        let maps = round_trip(&doc, &ToRootOptions::default());
        let rec = as_record(&maps["m"]);
        prop_assert_eq!(rec.map, map);
        for (got, want) in rec.ebins.iter().zip(&ebins) {
            prop_assert!((got - want).abs() <= 1e-9 * want.abs());
        }
    }
}
