use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::config::LogFormat;
use super::constants::{
    ENV_CONFIG, ENV_GRPC_PORT, ENV_HOST, ENV_LOG_FORMAT, ENV_MAX_MESSAGE_BYTES, ENV_METRICS_PORT,
    ENV_RECEIVER_NAME, ENV_VERBOSITY,
};
use crate::domain::metrics::Verbosity;

#[derive(Parser)]
#[command(name = "otelbridge")]
#[command(version, about = "OTLP metrics receiver", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Host address to bind
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Receiver instance name (used in logs and self-metrics)
    #[arg(long, global = true, env = ENV_RECEIVER_NAME)]
    pub receiver_name: Option<String>,

    /// OTLP gRPC port
    #[arg(long, global = true, env = ENV_GRPC_PORT)]
    pub grpc_port: Option<u16>,

    /// Maximum decoded gRPC message size in bytes
    #[arg(long, global = true, env = ENV_MAX_MESSAGE_BYTES)]
    pub max_message_bytes: Option<usize>,

    /// Logging consumer verbosity (basic or detailed)
    #[arg(long, global = true, env = ENV_VERBOSITY)]
    pub verbosity: Option<Verbosity>,

    /// Port for the Prometheus self-metrics endpoint (disabled when unset)
    #[arg(long, global = true, env = ENV_METRICS_PORT)]
    pub metrics_port: Option<u16>,

    /// Log output format (compact or json)
    #[arg(long, global = true, env = ENV_LOG_FORMAT, value_parser = parse_log_format)]
    pub log_format: Option<LogFormat>,
}

/// Parse log format from CLI/env string
fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    match s.to_lowercase().as_str() {
        "compact" => Ok(LogFormat::Compact),
        "json" => Ok(LogFormat::Json),
        _ => Err(format!(
            "Invalid log format '{}'. Valid options: compact, json",
            s
        )),
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the receiver (default command)
    Start,
    /// Load and validate configuration, then print it
    CheckConfig,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub config: Option<PathBuf>,
    pub receiver_name: Option<String>,
    pub grpc_port: Option<u16>,
    pub max_message_bytes: Option<usize>,
    pub verbosity: Option<Verbosity>,
    pub metrics_port: Option<u16>,
    pub log_format: Option<LogFormat>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    (CliConfig::from(&cli), cli.command)
}

impl From<&Cli> for CliConfig {
    fn from(cli: &Cli) -> Self {
        Self {
            host: cli.host.clone(),
            config: cli.config.clone(),
            receiver_name: cli.receiver_name.clone(),
            grpc_port: cli.grpc_port,
            max_message_bytes: cli.max_message_bytes,
            verbosity: cli.verbosity,
            metrics_port: cli.metrics_port,
            log_format: cli.log_format,
        }
    }
}
