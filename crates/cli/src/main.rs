//! # Butler Relay CLI
//!
//! Command-line entry point.
//!
//! Provides:
//! - configuration loading and validation
//! - relay orchestration and lifecycle
//! - graceful shutdown on Ctrl-C / SIGTERM

mod cli;
mod commands;
mod error;
mod relay;

use anyhow::Result;
use clap::Parser;
use observability::{LoggingConfig, Verbosity};
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_emit, run_info, run_relay, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    observability::init_logging(LoggingConfig {
        format: cli.log_format,
        verbosity: Verbosity::from_flags(cli.quiet, cli.verbose),
    })?;

    info!(version = env!("CARGO_PKG_VERSION"), "Butler Relay starting");

    let result = match &cli.command {
        Commands::Run(args) => run_relay(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
        Commands::Emit(args) => run_emit(args).await,
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}
