use super::config::LogLevel;
use crate::domain::Signal;
use clap::Parser;
use std::path::PathBuf;

/// Export protobuf-encoded OTLP collector requests to an OTLP/HTTP endpoint.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, short, env = "OTLP_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Signal kind of every input file
    #[arg(long, short, value_enum)]
    pub signal: Signal,

    /// Base endpoint, overriding the configuration file
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Log level, overriding the configuration file
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Files holding one encoded export request each
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
}
