//! Logging configuration and initialization
//!
//! Central `tracing` setup shared by the server and the ingest CLI.
//! Library code must use the structured macros (`debug!`, `info!`, `warn!`,
//! `error!`) rather than `println!`; run summaries go through the reporter
//! and are emitted here as structured events.
//!
//! # Example
//!
//! ```no_run
//! use scanbase_common::logging::{init_logging, LogConfig};
//!
//! let config = LogConfig::from_env();
//! init_logging(&config).unwrap();
//! tracing::info!("started");
//! ```

use crate::error::{Result, ScanbaseError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Log level for filtering messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ScanbaseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ScanbaseError::Config(format!("Invalid log level: {s}"))),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured log collection
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ScanbaseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(ScanbaseError::Config(format!("Invalid log format: {s}"))),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Minimum level to emit
    pub level: LogLevel,

    /// Text or JSON output
    pub format: LogFormat,

    /// When set, also write a daily-rotated log file into this directory
    pub log_dir: Option<PathBuf>,

    /// Log file name prefix (e.g. "scanbase-server" ->
    /// "scanbase-server.2025-01-18.log")
    pub log_file_prefix: String,

    /// Extra filter directives (e.g. "sqlx=warn,tower_http=debug")
    pub filter_directives: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Text,
            log_dir: None,
            log_file_prefix: "scanbase".to_string(),
            filter_directives: None,
        }
    }
}

impl LogConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// - `LOG_LEVEL`: trace | debug | info | warn | error
    /// - `LOG_FORMAT`: text | json
    /// - `LOG_DIR`: directory for rotated log files (file output off if unset)
    /// - `LOG_FILE_PREFIX`: log file name prefix
    /// - `LOG_FILTER`: extra filter directives
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            if let Ok(parsed) = level.parse() {
                config.level = parsed;
            }
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            if let Ok(parsed) = format.parse() {
                config.format = parsed;
            }
        }
        if let Ok(dir) = std::env::var("LOG_DIR") {
            config.log_dir = Some(PathBuf::from(dir));
        }
        if let Ok(prefix) = std::env::var("LOG_FILE_PREFIX") {
            config.log_file_prefix = prefix;
        }
        if let Ok(filter) = std::env::var("LOG_FILTER") {
            config.filter_directives = Some(filter);
        }

        config
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.log_file_prefix = prefix.into();
        self
    }
}

/// Initialize the global tracing subscriber. Call once at startup.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let mut filter =
        EnvFilter::from_default_env().add_directive(config.level.to_tracing_level().into());

    if let Some(ref directives) = config.filter_directives {
        for directive in directives.split(',') {
            filter = filter.add_directive(directive.parse().map_err(|err| {
                ScanbaseError::Config(format!("Invalid filter directive '{directive}': {err}"))
            })?);
        }
    }

    let file_writer = file_writer(config)?;

    // the text and json layer stacks have different concrete types, so each
    // format arm builds its own
    match config.format {
        LogFormat::Text => {
            let console_layer = fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(true)
                .with_span_events(FmtSpan::CLOSE);
            let file_layer = file_writer.map(|writer| {
                fmt::layer()
                    .with_writer(writer)
                    .with_target(true)
                    .with_ansi(false)
            });
            tracing_subscriber::registry()
                .with(filter)
                .with(console_layer)
                .with(file_layer)
                .try_init()
                .map_err(|err| ScanbaseError::Logging(err.to_string()))?;
        },
        LogFormat::Json => {
            let console_layer = fmt::layer()
                .json()
                .with_writer(std::io::stdout)
                .with_target(true)
                .with_span_events(FmtSpan::CLOSE);
            let file_layer = file_writer.map(|writer| {
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_target(true)
                    .with_ansi(false)
            });
            tracing_subscriber::registry()
                .with(filter)
                .with(console_layer)
                .with(file_layer)
                .try_init()
                .map_err(|err| ScanbaseError::Logging(err.to_string()))?;
        },
    }

    Ok(())
}

/// Set up the daily-rotated file appender when a log directory is configured.
fn file_writer(
    config: &LogConfig,
) -> Result<Option<tracing_appender::non_blocking::NonBlocking>> {
    let Some(ref dir) = config.log_dir else {
        return Ok(None);
    };
    std::fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::daily(dir, &config.log_file_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    // The guard must outlive the process for the writer to flush.
    std::mem::forget(guard);
    Ok(Some(non_blocking))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_from_str() {
        assert_eq!("trace".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn log_format_from_str() {
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    // Initializes the real global subscriber, so this is the only test in
    // the crate allowed to call init_logging.
    #[test]
    fn json_format_initializes_with_a_file_layer() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            format: LogFormat::Json,
            log_dir: Some(dir.path().to_path_buf()),
            ..LogConfig::default()
        };
        init_logging(&config).unwrap();
        tracing::info!("logging initialized");

        // the global subscriber slot is taken now
        assert!(matches!(
            init_logging(&config),
            Err(ScanbaseError::Logging(_))
        ));
    }

    #[test]
    fn config_builders() {
        let config = LogConfig::default()
            .with_level(LogLevel::Debug)
            .with_file_prefix("scanbase-test");
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.log_file_prefix, "scanbase-test");
        assert!(config.log_dir.is_none());
    }
}
