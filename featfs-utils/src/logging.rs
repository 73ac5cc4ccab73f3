//! Logging setup for the featfs binary
//!
//! One `tracing` subscriber with an `EnvFilter` and up to two `fmt` layers,
//! one per destination.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::{paths, FeatfsError, Result};

/// Environment variable overriding the log filter
pub const LOG_ENV_VAR: &str = "FEATFS_LOG";

const DEFAULT_LOG_FILE: &str = "featfs.log";

/// Where log lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stderr,
    /// `featfs.log` under the state directory
    File,
    Both,
}

impl LogOutput {
    fn to_stderr(self) -> bool {
        matches!(self, Self::Stderr | Self::Both)
    }

    fn to_file(self) -> bool {
        matches!(self, Self::File | Self::Both)
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub output: LogOutput,
    /// `EnvFilter` directives, e.g. "info,featfs_server::activation=debug"
    pub filter: String,
    /// Log span enter/exit
    pub span_events: bool,
    pub file_line: bool,
    /// Overrides `featfs.log`
    pub file_name: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            output: LogOutput::Stderr,
            filter: "info".into(),
            span_events: false,
            file_line: false,
            file_name: None,
        }
    }
}

impl LogConfig {
    /// Config for the service binary
    ///
    /// `FEATFS_LOG` wins over `filter`, which normally comes from the
    /// settings file.
    pub fn service(output: LogOutput, filter: &str) -> Self {
        let filter = std::env::var(LOG_ENV_VAR).unwrap_or_else(|_| filter.to_string());
        Self {
            output,
            filter,
            file_line: true,
            ..Self::default()
        }
    }

    /// Verbose stderr logging
    pub fn development() -> Self {
        Self {
            filter: "debug".into(),
            span_events: true,
            file_line: true,
            ..Self::default()
        }
    }
}

/// Initialize logging with default configuration
pub fn init_logging() -> Result<()> {
    init_logging_with_config(LogConfig::default())
}

/// Install the global subscriber described by `config`
pub fn init_logging_with_config(config: LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| FeatfsError::config(format!("Invalid log filter: {}", e)))?;

    let stderr_layer = config
        .output
        .to_stderr()
        .then(|| fmt_layer(&config).with_writer(std::io::stderr));

    let file_layer = if config.output.to_file() {
        let file = open_log_file(config.file_name.as_deref().unwrap_or(DEFAULT_LOG_FILE))?;
        Some(fmt_layer(&config).with_ansi(false).with_writer(Mutex::new(file)))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| FeatfsError::internal(format!("Failed to init logging: {}", e)))
}

fn fmt_layer<S>(config: &LogConfig) -> fmt::Layer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let span_events = if config.span_events {
        FmtSpan::ENTER | FmtSpan::EXIT
    } else {
        FmtSpan::NONE
    };
    fmt::layer()
        .with_target(true)
        .with_span_events(span_events)
        .with_file(config.file_line)
        .with_line_number(config.file_line)
}

fn open_log_file(file_name: &str) -> Result<std::fs::File> {
    let dir = paths::log_dir();
    std::fs::create_dir_all(&dir).map_err(|e| FeatfsError::FileWrite {
        path: dir.clone(),
        source: e,
    })?;

    let path = dir.join(file_name);
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| FeatfsError::FileWrite { path, source: e })
}
