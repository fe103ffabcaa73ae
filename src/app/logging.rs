use super::config::LogLevel;
use parking_lot::RwLock;
use std::sync::OnceLock;
use thiserror::Error;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoggingError {
    #[error("Invalid log directive '{directive}': {reason}")]
    InvalidDirective { directive: String, reason: String },
    #[error("Logging initialization failed: {0}")]
    InitFailed(String),
}

/// Collects per-target filter directives and installs the global subscriber.
pub struct LoggingSystem {
    directives: RwLock<Vec<String>>,
    json: bool,
}

impl LoggingSystem {
    pub fn new(json: bool) -> Self {
        Self {
            directives: RwLock::new(Vec::new()),
            json,
        }
    }

    /// Adds a `target=level` directive after checking it parses.
    pub fn add_directive(&self, directive: &str) -> Result<(), LoggingError> {
        let directive = directive.trim();
        directive
            .parse::<Directive>()
            .map_err(|e| LoggingError::InvalidDirective {
                directive: directive.to_string(),
                reason: e.to_string(),
            })?;
        self.directives.write().push(directive.to_string());
        Ok(())
    }

    /// HTTP stack crates are chatty at debug.
    pub fn add_default_directives(&self) {
        let mut directives = self.directives.write();
        for target in ["hyper", "hyper_util", "reqwest", "h2", "rustls"] {
            directives.push(format!("{target}=warn"));
        }
    }

    pub fn directive_count(&self) -> usize {
        self.directives.read().len()
    }

    pub fn build_filter_string(&self, default_level: LogLevel) -> String {
        let directives = self.directives.read();
        let mut parts = Vec::with_capacity(directives.len() + 1);
        parts.push(default_level.as_str().to_string());
        parts.extend(directives.iter().cloned());
        parts.join(",")
    }

    pub fn initialize(&self, default_level: LogLevel) -> Result<(), LoggingError> {
        let filter_string = self.build_filter_string(default_level);
        let env_filter = EnvFilter::try_new(&filter_string).map_err(|e| {
            LoggingError::InitFailed(format!("invalid filter '{filter_string}': {e}"))
        })?;

        let registry = tracing_subscriber::registry().with(env_filter);
        let result = if self.json {
            registry
                .with(fmt::layer().json().with_target(true).with_current_span(false))
                .try_init()
        } else {
            registry
                .with(fmt::layer().with_target(true).with_level(true).compact())
                .try_init()
        };

        result.map_err(|e| LoggingError::InitFailed(e.to_string()))
    }
}

/// Installs the global subscriber once per process. Later calls report the
/// outcome of the first.
pub fn setup_logging(level: LogLevel, json: bool) -> Result<(), LoggingError> {
    static INIT: OnceLock<Result<(), LoggingError>> = OnceLock::new();

    INIT.get_or_init(|| {
        let system = LoggingSystem::new(json);
        system.add_default_directives();
        system.initialize(level)
    })
    .clone()
}
