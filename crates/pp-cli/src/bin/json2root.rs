//! Convert JSON maps as used in PaPA/PISA into ROOT histograms.

use anyhow::Result;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

use pp_root::{Compression, ContentType};
use pp_translate::papa::ToRootOptions;

#[derive(Parser)]
#[command(name = "json2root")]
#[command(about = "Convert JSON maps as used in PaPA/PISA into ROOT histograms")]
#[command(version)]
struct Cli {
    /// Input JSON file
    #[arg(value_name = "JSONFILE")]
    infile: PathBuf,

    /// File to store the output
    #[arg(short, long, value_name = "ROOTFILE", default_value = "out.root")]
    outfile: PathBuf,

    /// Set verbosity level (repeat for more)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Store contents as double (TH2D) instead of float (TH2F)
    #[arg(long)]
    double: bool,

    /// Write objects uncompressed
    #[arg(long)]
    no_compress: bool,

    /// Always bin energy linearly, even when the edges are logarithmic
    #[arg(long)]
    linear_energy: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    pp_cli::init_logging(cli.verbose);

    let options = ToRootOptions {
        content_type: if cli.double { ContentType::D } else { ContentType::F },
        detect_log_energy: !cli.linear_energy,
        ..Default::default()
    };
    let compression = if cli.no_compress { Compression::None } else { Compression::default() };

    pp_cli::cmd_json2root(&cli.infile, &cli.outfile, &options, compression)
}
