//! beacon-watch CLI - console consumer for beacon tracking.
//!
//! Subscribes to watcher notifications and renders them, either as a live
//! event stream (`watch`) or a one-shot discovery table (`scan`).

mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;

use cli::{Cli, Commands};
use error::{exit_codes, CliError};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    if let Err(e) = simple_logger::SimpleLogger::new().with_level(level).init() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(cli).await {
        Ok(()) => std::process::exit(exit_codes::SUCCESS),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Watch(args) => commands::run_watch(args, cli.port, cli.json).await,
        Commands::Scan(args) => commands::run_scan(args, cli.port, cli.json).await,
    }
}
