//! tfbin: fetch provider plugin binaries through a local cache.

mod cli;
mod commands;
mod platform;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::{CacheCommands, Cli, Commands};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Err(err) = run(cli) {
        tracing::error!(error = %format!("{err:#}"), "tfbin failed");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Fetch(args) => commands::fetch::run(args),
        Commands::Search(args) => commands::search::run(args),
        Commands::Cache(CacheCommands::List(args)) => commands::cache::list(args),
    }
}

/// Stderr logging; `RUST_LOG` wins over the verbosity flags when set.
fn init_tracing(verbose: u8, quiet: bool) {
    let default = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
