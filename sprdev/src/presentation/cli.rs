use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "sprdev: SPR binding-assay aggregation", long_about = None)]
pub struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long = "json-logs", global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Aggregate one experiment into an ingestion workbook
    Run {
        /// experiment configuration (TOML)
        config: PathBuf,

        /// base name of the output workbook
        #[arg(long = "save-name")]
        save_name: String,

        /// where the workbook goes (defaults to ~/Desktop, else the current dir)
        #[arg(long = "out-dir")]
        out_dir: Option<PathBuf>,

        /// read the compound set as tab-separated text on stdin
        #[arg(long = "stdin-compounds")]
        stdin_compounds: bool,

        /// fixed image-name disambiguator (10..=98) instead of a random one
        #[arg(long, value_parser = clap::value_parser!(u8).range(10..=98))]
        disambiguator: Option<u8>,
    },

    /// Validate a configuration without touching any export
    Check { config: PathBuf },

    /// Print displacement metrics; renames and writes nothing
    Metrics { config: PathBuf },

    /// Rename the curve images of one directory
    Rename {
        dir: PathBuf,

        /// kinetics export carrying the solution label of each channel
        #[arg(long)]
        kinetics: PathBuf,

        #[arg(long = "raw-data-file")]
        raw_data_file: String,

        /// ss (steady state) or senso (sensorgram)
        #[arg(long)]
        kind: String,

        #[arg(long, value_parser = clap::value_parser!(u8).range(10..=98))]
        disambiguator: Option<u8>,
    },
}
