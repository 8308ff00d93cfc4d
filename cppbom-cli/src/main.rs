//! cppbom -- Command-line interface for the C/C++ SBOM generation engine
//!
//! Scans a C/C++ project directory with multiple detection strategies and
//! writes a CycloneDX JSON SBOM.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod error;

use cli::{Cli, Commands};
use error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Minimal subscriber for CLI use: compact format, stderr only.
    // The SBOM itself is the only stdout payload (when --output -).
    let log_level = cli.log_level.as_deref().unwrap_or("warn");
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let result = run(cli).await;

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Scan(args) => commands::scan::execute(args).await,
    }
}
