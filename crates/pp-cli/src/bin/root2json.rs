//! Convert ROOT histograms into JSON maps as used in PaPA/PISA.

use anyhow::Result;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "root2json")]
#[command(about = "Convert ROOT histograms into JSON maps as used in PaPA/PISA")]
#[command(version)]
struct Cli {
    /// Input ROOT file
    #[arg(value_name = "ROOTFILE")]
    infile: PathBuf,

    /// File to store the output
    #[arg(short, long, value_name = "JSONFILE", default_value = "out.json")]
    outfile: PathBuf,

    /// Set verbosity level (repeat for more)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Indent the JSON output
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    pp_cli::init_logging(cli.verbose);
    pp_cli::cmd_root2json(&cli.infile, &cli.outfile, cli.pretty)
}
