pub mod groups;
pub mod serde_helpers;
mod validation;

pub use groups::{QueueConfig, RetryConfig};

use crate::domain::Signal;
use crate::sender::endpoint::{self, EndpointError, Endpoints};
use crate::sender::{ClientConfig, ClientError, ClientErrorPolicy, Compression};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_helpers::{load_env_millis, load_env_string_opt, load_env_var};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Environment error: {0}")]
    EnvError(String),
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
    #[error(transparent)]
    Client(#[from] ClientError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!(
                "unknown level '{other}', valid values: error, warn, info, debug, trace"
            )),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Immutable exporter configuration. Built once and handed to
/// [`crate::Exporter::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL; the signal path is appended per signal.
    pub endpoint: Option<String>,
    pub traces_endpoint: Option<String>,
    pub metrics_endpoint: Option<String>,
    pub logs_endpoint: Option<String>,
    /// Passed through verbatim on every request.
    pub headers: HashMap<String, String>,
    pub compression: Compression,
    /// Per-attempt exchange timeout.
    #[serde(with = "serde_helpers")]
    pub timeout: Duration,
    pub client_errors: ClientErrorPolicy,
    pub signals: Vec<Signal>,
    pub log_level: LogLevel,
    pub queue: QueueConfig,
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            traces_endpoint: None,
            metrics_endpoint: None,
            logs_endpoint: None,
            headers: HashMap::new(),
            compression: Compression::Gzip,
            timeout: Duration::from_secs(30),
            client_errors: ClientErrorPolicy::BadRequestOnly,
            signals: Signal::ALL.to_vec(),
            log_level: LogLevel::Info,
            queue: QueueConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// File (or defaults), then environment overrides, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        load_env_string_opt("OTLP_ENDPOINT", &mut self.endpoint);
        load_env_string_opt("OTLP_TRACES_ENDPOINT", &mut self.traces_endpoint);
        load_env_string_opt("OTLP_METRICS_ENDPOINT", &mut self.metrics_endpoint);
        load_env_string_opt("OTLP_LOGS_ENDPOINT", &mut self.logs_endpoint);
        load_env_var("OTLP_COMPRESSION", &mut self.compression)?;
        load_env_millis("OTLP_TIMEOUT_MS", &mut self.timeout)?;
        load_env_var("OTLP_QUEUE_ENABLED", &mut self.queue.enabled)?;
        load_env_var("OTLP_QUEUE_SIZE", &mut self.queue.queue_size)?;
        load_env_var("OTLP_NUM_CONSUMERS", &mut self.queue.num_consumers)?;
        load_env_var("OTLP_RETRY_ENABLED", &mut self.retry.enabled)?;
        load_env_var("LOG_LEVEL", &mut self.log_level)?;
        Ok(())
    }

    fn override_for(&self, signal: Signal) -> Option<&str> {
        match signal {
            Signal::Traces => self.traces_endpoint.as_deref(),
            Signal::Metrics => self.metrics_endpoint.as_deref(),
            Signal::Logs => self.logs_endpoint.as_deref(),
        }
    }

    /// Resolves a destination for every enabled signal.
    pub fn endpoints(&self) -> Result<Endpoints, ConfigError> {
        let mut endpoints = Endpoints::default();
        for &signal in &self.signals {
            let url = endpoint::resolve(signal, self.endpoint.as_deref(), self.override_for(signal))?;
            endpoints.set(signal, url);
        }
        Ok(endpoints)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            headers: self.headers.clone(),
            timeout: self.timeout,
            ..ClientConfig::default()
        }
    }
}
