//! `root2json`: ROOT histograms → PaPA/PISA JSON maps.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use pp_root::RootFile;
use pp_translate::papa::root_to_maps;

/// Convert the histogram tree of `input` into nested JSON records in `output`.
pub fn cmd_root2json(input: &Path, output: &Path, pretty: bool) -> Result<()> {
    let file = match RootFile::open(input) {
        Ok(f) => f,
        Err(e) => {
            tracing::error!("Failed to open ROOT file {}", input.display());
            return Err(e).with_context(|| format!("failed to open {}", input.display()));
        }
    };

    let maps = root_to_maps(&file)
        .with_context(|| format!("failed to convert {}", input.display()))?;

    let out = File::create(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    let mut out = BufWriter::new(out);
    if pretty {
        serde_json::to_writer_pretty(&mut out, &maps)?;
    } else {
        serde_json::to_writer(&mut out, &maps)?;
    }
    out.flush()?;

    tracing::info!("Wrote {}", output.display());
    Ok(())
}
