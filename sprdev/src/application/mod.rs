pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use spr_core::error::Result;

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run {
            config,
            save_name,
            out_dir,
            stdin_compounds,
            disambiguator,
        } => handlers::handle_run(config, save_name, out_dir, stdin_compounds, disambiguator),
        Commands::Check { config } => handlers::handle_check(config),
        Commands::Metrics { config } => handlers::handle_metrics(config),
        Commands::Rename {
            dir,
            kinetics,
            raw_data_file,
            kind,
            disambiguator,
        } => handlers::handle_rename(dir, kinetics, raw_data_file, kind, disambiguator),
    }
}
