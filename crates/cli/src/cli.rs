//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Metrics Loadgen - paced statsd counter generator
#[derive(Parser, Debug)]
#[command(
    name = "metrics-loadgen",
    author,
    version,
    about = "Paced statsd counter load generator",
    long_about = "Generates a steady stream of statsd counter increments against a receiver.\n\n\
                  Every tick a batch of increments is fanned out concurrently; the run stops \n\
                  at the requested duration and the sink is always released."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "LOADGEN_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "LOADGEN_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Emit counters against a receiver
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display effective configuration and receivers
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Receiver to emit against (e.g. statsd, log)
    #[arg(short, long, default_value = "statsd", env = "LOADGEN_RECEIVER")]
    pub receiver: String,

    /// Run duration in seconds
    #[arg(short, long, default_value = "60", env = "LOADGEN_DURATION")]
    pub duration: u64,

    /// Increments per tick (per minute with the default tick)
    #[arg(long, default_value = "1000", env = "LOADGEN_RATE")]
    pub rate: u64,

    /// Path to configuration file (TOML or JSON); built-in defaults if omitted
    #[arg(short, long, env = "LOADGEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override statsd address (host:port or :port)
    #[arg(long, env = "LOADGEN_STATSD_ADDRESS")]
    pub address: Option<String>,

    /// Override statsd metric prefix
    #[arg(long, env = "LOADGEN_STATSD_PREFIX")]
    pub prefix: Option<String>,

    /// Override tick interval in milliseconds
    #[arg(long, env = "LOADGEN_TICK_MS")]
    pub tick_ms: Option<u64>,

    /// Fail on unknown receivers instead of ignoring them
    #[arg(long)]
    pub strict: bool,

    /// Prometheus metrics port (0 = disabled)
    #[arg(long, default_value = "0", env = "LOADGEN_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "loadgen.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; built-in defaults if omitted
    #[arg(short, long, env = "LOADGEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
