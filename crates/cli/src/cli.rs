//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Field Relay - republish detected fields to an HTTP control endpoint
#[derive(Parser, Debug)]
#[command(
    name = "field-relay",
    author,
    version,
    about = "Field-mapped notification relay",
    long_about = "Relays named detection results to an HTTP control endpoint.\n\n\
                  Reads detection batches as JSON lines, selects mapped fields, formats \n\
                  their values and PUTs one JSON payload per field."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "FIELD_RELAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "FIELD_RELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Relay detection batches to the endpoint
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "relay.toml", env = "FIELD_RELAY_CONFIG")]
    pub config: PathBuf,

    /// Detection batches, one JSON array per line ("-" for stdin)
    #[arg(short, long, default_value = "-", env = "FIELD_RELAY_INPUT")]
    pub input: String,

    /// Override settings directory from configuration
    #[arg(long, env = "FIELD_RELAY_SETTINGS_DIR")]
    pub settings_dir: Option<PathBuf>,

    /// Override endpoint URL from configuration
    #[arg(long, env = "FIELD_RELAY_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Settings reload interval in seconds (0 = no reload)
    #[arg(long, default_value = "2", env = "FIELD_RELAY_RELOAD_INTERVAL")]
    pub reload_interval: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "FIELD_RELAY_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "relay.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "relay.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
