//! Integration tests: write histograms with `RootWriter`, read them back with `RootFile`.

use pp_root::{
    Axis, Compression, ContentType, Histogram, ObjectKind, RootError, RootFile, RootWriter,
    WriteOptions,
};
use proptest::prelude::*;

fn pid_hist(name: &str, ct: ContentType) -> Histogram {
    let e = Axis::variable(&[0.5, 1.0, 1.5, 2.0]).unwrap().with_title("log_{10}(E/GeV)");
    let cz = Axis::variable(&[-1.0, -0.5, 0.0, 0.5, 1.0]).unwrap().with_title("cos(#theta)");
    let mut h = Histogram::new(name, name, vec![e, cz], ct).unwrap();
    for ie in 1..=3 {
        for icz in 1..=4 {
            h.set_bin_content(&[ie, icz], (ie * 10 + icz) as f64).unwrap();
        }
    }
    h
}

fn write_file(path: &std::path::Path, compression: Compression) {
    let mut w = RootWriter::create(path, WriteOptions { compression, title: "maps".into() })
        .expect("failed to create ROOT file");
    let root = w.root();
    w.write_histogram(root, &pid_hist("top", ContentType::D)).unwrap();

    let trck = w.mkdir_p(root, "pid/trck").unwrap();
    w.write_histogram(trck, &pid_hist("numu_cc", ContentType::F)).unwrap();
    w.write_histogram(trck, &pid_hist("nue_cc", ContentType::F)).unwrap();

    let axes = vec![
        Axis::variable(&[1.0, 2.0, 3.0]).unwrap(),
        Axis::variable(&[-1.0, 0.0, 0.5, 1.0]).unwrap(),
        Axis::variable(&[-1.0, -0.5, 0.0, 0.5, 1.0]).unwrap(),
    ];
    let mut h3 = Histogram::new("reco", "reco", axes, ContentType::D).unwrap();
    h3.set_bin_content(&[2, 3, 4], 0.125).unwrap();
    let reco = w.mkdir_p(root, "reco").unwrap();
    w.write_histogram(reco, &h3).unwrap();
    w.close().expect("failed to close ROOT file");
}

#[test]
fn nested_directories_round_trip() {
    for compression in [Compression::None, Compression::Zlib(1), Compression::Zlib(9)] {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maps.root");
        write_file(&path, compression);

        let f = RootFile::open(&path).expect("failed to open written file");
        assert_eq!(f.compression(), compression.setting());

        let keys = f.list_keys().unwrap();
        let names: Vec<(&str, ObjectKind)> =
            keys.iter().map(|k| (k.name.as_str(), k.kind)).collect();
        assert_eq!(
            names,
            vec![
                ("top", ObjectKind::Hist2D),
                ("pid", ObjectKind::Directory),
                ("reco", ObjectKind::Directory),
            ]
        );

        let h = f.get_histogram("pid/trck/numu_cc").unwrap();
        assert_eq!(h.class_name(), "TH2F");
        assert_eq!(h.axes()[0].edges(), vec![0.5, 1.0, 1.5, 2.0]);
        assert_eq!(h.axes()[1].title, "cos(#theta)");
        assert_eq!(h.bin_content(&[3, 4]).unwrap(), 34.0);
        assert_eq!(h.entries, 12.0);

        let top = f.get_histogram("top").unwrap();
        assert_eq!(top.class_name(), "TH2D");
        assert_eq!(top, pid_hist("top", ContentType::D));

        let h3 = f.get_histogram("/reco/reco").unwrap();
        let lens: Vec<usize> = h3.axes().iter().map(|a| a.edges().len()).collect();
        assert_eq!(lens, vec![3, 4, 5]);
        assert_eq!(h3.bin_content(&[2, 3, 4]).unwrap(), 0.125);
    }
}

#[test]
fn directory_walk_finds_every_histogram() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("walk.root");
    write_file(&path, Compression::default());
    let f = RootFile::open(&path).unwrap();

    fn walk(f: &RootFile, dir: &pp_root::Directory, prefix: &str, out: &mut Vec<String>) {
        for key in dir.latest_keys() {
            let path = format!("{}{}", prefix, key.name);
            match key.kind() {
                ObjectKind::Directory => {
                    let sub = f.subdirectory(key).unwrap();
                    walk(f, &sub, &format!("{}/", path), out);
                }
                ObjectKind::Unknown => {}
                _ => {
                    f.read_histogram(key).unwrap();
                    out.push(path);
                }
            }
        }
    }

    let mut found = Vec::new();
    walk(&f, &f.top_directory().unwrap(), "", &mut found);
    assert_eq!(found, vec!["top", "pid/trck/numu_cc", "pid/trck/nue_cc", "reco/reco"]);
}

#[test]
fn missing_paths_are_key_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.root");
    write_file(&path, Compression::None);
    let f = RootFile::open(&path).unwrap();

    assert!(matches!(f.get_histogram("pid/trck/nope"), Err(RootError::KeyNotFound(_))));
    assert!(matches!(f.get_histogram("nodir/h"), Err(RootError::KeyNotFound(_))));
    assert!(matches!(f.get_histogram(""), Err(RootError::KeyNotFound(_))));
    // A histogram is not a directory.
    assert!(f.get_histogram("top/inner").is_err());
}

#[test]
fn large_payloads_are_compressed() {
    let dir = tempfile::tempdir().unwrap();
    let edges: Vec<f64> = (0..=200).map(|i| i as f64 * 0.01).collect();
    let axes = vec![Axis::variable(&edges).unwrap(), Axis::variable(&edges).unwrap()];
    let h = Histogram::new("big", "big", axes, ContentType::D).unwrap();

    let mut sizes = Vec::new();
    for compression in [Compression::None, Compression::Zlib(6)] {
        let path = dir.path().join(format!("big_{}.root", compression.setting()));
        let mut w = RootWriter::create(&path, WriteOptions { compression, ..Default::default() })
            .unwrap();
        let root = w.root();
        w.write_histogram(root, &h).unwrap();
        w.close().unwrap();

        let f = RootFile::open(&path).unwrap();
        assert_eq!(f.get_histogram("big").unwrap(), h);
        sizes.push(std::fs::metadata(&path).unwrap().len());
    }
    assert!(sizes[1] < sizes[0], "compressed file should be smaller: {:?}", sizes);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn contents_survive_round_trip(
        values in proptest::collection::vec(-1.0e6f64..1.0e6, 12),
        double in any::<bool>(),
    ) {
        let ct = if double { ContentType::D } else { ContentType::F };
        let mut h = pid_hist("h", ct);
        for (i, v) in values.iter().enumerate() {
            h.set_bin_content(&[i / 4 + 1, i % 4 + 1], *v).unwrap();
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prop.root");
        let mut w = RootWriter::create(&path, WriteOptions::default()).unwrap();
        let root = w.root();
        w.write_histogram(root, &h).unwrap();
        w.close().unwrap();

        let back = RootFile::open(&path).unwrap().get_histogram("h").unwrap();
        prop_assert_eq!(back.cells(), h.cells());
    }
}
