//! `json2root`: PaPA/PISA JSON maps → ROOT histograms.

use anyhow::{Context, Result};
use std::path::Path;

use pp_root::{Compression, RootWriter, WriteOptions};
use pp_translate::papa::{ToRootOptions, json_to_histograms};

/// Convert every map record in `input` into a 2D histogram in `output`.
///
/// All records are converted before the output is opened, so a bad input
/// leaves no file behind.
pub fn cmd_json2root(
    input: &Path,
    output: &Path,
    options: &ToRootOptions,
    compression: Compression,
) -> Result<()> {
    let json = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let hists = json_to_histograms(&json, options)
        .with_context(|| format!("failed to convert {}", input.display()))?;

    let write_options = WriteOptions { compression, ..Default::default() };
    let mut writer = match RootWriter::create(output, write_options) {
        Ok(w) => w,
        Err(e) => {
            tracing::error!("Failed to open ROOT file {}", output.display());
            return Err(e).with_context(|| format!("failed to create {}", output.display()));
        }
    };

    let root = writer.root();
    for h in &hists {
        writer
            .write_histogram(root, h)
            .with_context(|| format!("failed to write histogram '{}'", h.name))?;
    }
    writer.close().with_context(|| format!("failed to finalize {}", output.display()))?;

    tracing::info!("Wrote {} histograms to {}", hists.len(), output.display());
    Ok(())
}
