//! Cairn CLI: run and inspect Cairn servers.
//!
//! Install with `cargo install cairn-cli`, then run:
//!
//! ```bash
//! cairn serve
//! ```
//!
//! See `cairn --help` for all available commands and options.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "cairn",
    about = "Cairn application server",
    version,
    after_help = "See https://github.com/cairn-server/cairn for full documentation."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a server from a configuration file
    Serve {
        /// Configuration file (environment variables override its values)
        #[arg(long, default_value = "cairn.toml")]
        config: PathBuf,
    },

    /// Validate a configuration file and print the deployment plan
    Check {
        /// Configuration file (environment variables override its values)
        #[arg(long, default_value = "cairn.toml")]
        config: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { config } => commands::serve::run(&config),
        Commands::Check { config } => commands::check::run(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
