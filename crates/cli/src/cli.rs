//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use observability::LogFormat;
use std::path::PathBuf;

/// Butler Relay - UDP event ingestion and notification fan-out
#[derive(Parser, Debug)]
#[command(
    name = "butler-relay",
    author,
    version,
    about = "UDP event relay with notification fan-out",
    long_about = "Receives task-failure and session/connection datagrams over UDP,\n\
                  decodes them into events and fans each event out to the configured\n\
                  sinks (MQTT, Slack, Teams, New Relic, log)."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "BUTLER_RELAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format: json, pretty or compact
    #[arg(
        long,
        default_value = "pretty",
        global = true,
        env = "BUTLER_RELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the UDP listeners and relay events until interrupted
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display listeners and the sink routing table
    Info(InfoArgs),

    /// Send one datagram to a running relay
    Emit(EmitArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "BUTLER_RELAY_CONFIG"
    )]
    pub config: PathBuf,

    /// Override the UDP bind host from configuration
    #[arg(long, env = "BUTLER_RELAY_UDP_HOST")]
    pub host: Option<String>,

    /// Override the task failure listener port
    #[arg(long, env = "BUTLER_RELAY_TASK_FAILURE_PORT")]
    pub task_failure_port: Option<u16>,

    /// Override the session/connection listener port
    #[arg(long, env = "BUTLER_RELAY_SESSION_PORT")]
    pub session_port: Option<u16>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "BUTLER_RELAY_METRICS_PORT")]
    pub metrics_port: u16,

    /// Log notifications instead of delivering them
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml", env = "BUTLER_RELAY_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", env = "BUTLER_RELAY_CONFIG")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the per-route sink table
    #[arg(long)]
    pub routes: bool,
}

/// Arguments for the `emit` command
#[derive(Parser, Debug)]
pub struct EmitArgs {
    /// Listener address, e.g. 127.0.0.1:9998
    #[arg(short, long)]
    pub target: String,

    /// Raw datagram text, fields separated by ';'
    #[arg(short, long)]
    pub payload: String,
}
