#![no_main]

use std::path::PathBuf;

use libfuzzer_sys::fuzz_target;
use pp_root::{Directory, ObjectKind, RootFile};

fn walk(file: &RootFile, dir: &Directory, depth: usize) {
    if depth > 8 {
        return;
    }
    for key in dir.latest_keys() {
        match key.kind() {
            ObjectKind::Directory => {
                if let Ok(sub) = file.subdirectory(key) {
                    walk(file, &sub, depth + 1);
                }
            }
            ObjectKind::Unknown => {}
            _ => {
                let _ = file.read_histogram(key);
            }
        }
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(file) = RootFile::from_bytes(data.to_vec(), PathBuf::from("fuzz.root")) else {
        return;
    };
    if let Ok(top) = file.top_directory() {
        walk(&file, &top, 0);
    }
});
