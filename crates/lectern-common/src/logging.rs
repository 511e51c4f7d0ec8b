//! Logging configuration and initialization
//!
//! Every Lectern binary sets up `tracing` through this module:
//!
//! - Console output (stderr, so command output on stdout stays pipeable), a
//!   daily-rotated log file, or both
//! - Text or JSON format
//! - Level and per-module filter directives
//! - Environment-based overrides (`LOG_*` variables)
//!
//! Use the structured macros with fields rather than `println!` for diagnostics:
//!
//! ```rust,ignore
//! use tracing::{info, warn};
//!
//! info!(lesson_id = %lesson_id, object_key = %key, "Upload handed off");
//! warn!(error = %err, stage = %stage, "Ingestion stage failed");
//! ```
//!
//! # Example
//!
//! ```no_run
//! use lectern_common::logging::{init_logging, LogConfig};
//! use tracing::info;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     let _guard = init_logging(&config)?;
//!
//!     info!("Application started");
//!     Ok(())
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

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
    /// Convert to tracing Level
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
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(anyhow::anyhow!("Invalid log level: {}", s)),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// Output target for logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// Console (stderr) only
    #[default]
    Console,
    /// Rolling file only
    File,
    /// Console and rolling file
    Both,
}

impl LogOutput {
    fn includes_console(self) -> bool {
        matches!(self, LogOutput::Console | LogOutput::Both)
    }

    fn includes_file(self) -> bool {
        matches!(self, LogOutput::File | LogOutput::Both)
    }
}

impl std::str::FromStr for LogOutput {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "console" | "stderr" => Ok(LogOutput::Console),
            "file" => Ok(LogOutput::File),
            "both" | "all" => Ok(LogOutput::Both),
            _ => Err(anyhow::anyhow!("Invalid log output: {}", s)),
        }
    }
}

impl std::fmt::Display for LogOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogOutput::Console => write!(f, "console"),
            LogOutput::File => write!(f, "file"),
            LogOutput::Both => write!(f, "both"),
        }
    }
}

/// Log format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow::anyhow!("Invalid log format: {}", s)),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Minimum log level to display
    pub level: LogLevel,

    /// Output target (console, file, or both)
    pub output: LogOutput,

    /// Log format (text or JSON)
    pub format: LogFormat,

    /// Directory for log files (only used when output includes file)
    pub log_dir: PathBuf,

    /// Log file name prefix (e.g., "lectern" -> "lectern.2026-10-17")
    pub log_file_prefix: String,

    /// Additional filter directives (e.g., "reqwest=warn,lectern_cli=debug")
    pub filter_directives: Option<String>,

    /// Whether to include file and line number in logs
    pub include_location: bool,

    /// Whether to include thread IDs in logs
    pub include_thread_ids: bool,

    /// Whether to include target module names in logs
    pub include_targets: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            output: LogOutput::Console,
            format: LogFormat::Text,
            log_dir: PathBuf::from("./logs"),
            log_file_prefix: "lectern".to_string(),
            filter_directives: None,
            include_location: false,
            include_thread_ids: false,
            include_targets: true,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables on top of the defaults
    ///
    /// See [`LogConfig::apply_env`] for the variables read.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields from environment variables
    ///
    /// - `LOG_LEVEL`: trace, debug, info, warn, error
    /// - `LOG_OUTPUT`: console, file, both
    /// - `LOG_FORMAT`: text, json
    /// - `LOG_DIR`: directory for log files
    /// - `LOG_FILE_PREFIX`: prefix for log files
    /// - `LOG_FILTER`: additional filter directives
    /// - `LOG_INCLUDE_LOCATION`, `LOG_INCLUDE_THREAD_IDS`, `LOG_INCLUDE_TARGETS`: true/false
    ///
    /// Every variable is applied even when an earlier one is invalid; the
    /// invalid ones are left at their previous value and reported together.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        let mut invalid = Vec::new();

        if let Some(level) = var("LOG_LEVEL") {
            match level.parse() {
                Ok(level) => self.level = level,
                Err(e) => invalid.push(format!("LOG_LEVEL: {}", e)),
            }
        }

        if let Some(output) = var("LOG_OUTPUT") {
            match output.parse() {
                Ok(output) => self.output = output,
                Err(e) => invalid.push(format!("LOG_OUTPUT: {}", e)),
            }
        }

        if let Some(format) = var("LOG_FORMAT") {
            match format.parse() {
                Ok(format) => self.format = format,
                Err(e) => invalid.push(format!("LOG_FORMAT: {}", e)),
            }
        }

        if let Some(dir) = var("LOG_DIR") {
            self.log_dir = PathBuf::from(dir);
        }

        if let Some(prefix) = var("LOG_FILE_PREFIX") {
            self.log_file_prefix = prefix;
        }

        if let Some(filter) = var("LOG_FILTER") {
            self.filter_directives = Some(filter);
        }

        if let Some(val) = var("LOG_INCLUDE_LOCATION") {
            self.include_location = val.parse().unwrap_or(false);
        }

        if let Some(val) = var("LOG_INCLUDE_THREAD_IDS") {
            self.include_thread_ids = val.parse().unwrap_or(false);
        }

        if let Some(val) = var("LOG_INCLUDE_TARGETS") {
            self.include_targets = val.parse().unwrap_or(true);
        }

        if !invalid.is_empty() {
            anyhow::bail!("Ignored invalid logging settings ({})", invalid.join("; "));
        }
        Ok(())
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> LogConfigBuilder {
        LogConfigBuilder::default()
    }
}

/// Builder for LogConfig
#[derive(Default)]
pub struct LogConfigBuilder {
    config: LogConfig,
}

impl LogConfigBuilder {
    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.config.output = output;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.log_dir = dir.into();
        self
    }

    pub fn log_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.log_file_prefix = prefix.into();
        self
    }

    pub fn filter_directives(mut self, filter: impl Into<String>) -> Self {
        self.config.filter_directives = Some(filter.into());
        self
    }

    pub fn include_location(mut self, include: bool) -> Self {
        self.config.include_location = include;
        self
    }

    pub fn include_thread_ids(mut self, include: bool) -> Self {
        self.config.include_thread_ids = include;
        self
    }

    pub fn include_targets(mut self, include: bool) -> Self {
        self.config.include_targets = include;
        self
    }

    pub fn build(self) -> LogConfig {
        self.config
    }
}

/// Keeps the non-blocking file writer flushing until dropped
///
/// Hold it for the lifetime of the program; dropping it flushes and stops
/// the background writer thread.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the global tracing subscriber
///
/// Must be called at most once per process; a second call returns an error.
pub fn init_logging(config: &LogConfig) -> Result<LoggingGuard> {
    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut file_guard = None;

    if config.output.includes_console() {
        layers.push(console_layer(config)?);
    }

    if config.output.includes_file() {
        let (layer, guard) = file_layer(config)?;
        layers.push(layer);
        file_guard = Some(guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Build the level filter plus any extra directives
fn build_filter(config: &LogConfig) -> Result<EnvFilter> {
    let mut filter =
        EnvFilter::from_default_env().add_directive(config.level.to_tracing_level().into());

    if let Some(ref directives) = config.filter_directives {
        for directive in directives.split(',').filter(|d| !d.trim().is_empty()) {
            filter = filter.add_directive(
                directive
                    .trim()
                    .parse()
                    .with_context(|| format!("Failed to parse filter directive '{}'", directive))?,
            );
        }
    }

    Ok(filter)
}

fn console_layer(config: &LogConfig) -> Result<BoxedLayer> {
    let filter = build_filter(config)?;
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.include_targets)
        .with_thread_ids(config.include_thread_ids)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_span_events(FmtSpan::CLOSE);

    Ok(match config.format {
        LogFormat::Text => layer.with_filter(filter).boxed(),
        LogFormat::Json => layer.json().with_filter(filter).boxed(),
    })
}

fn file_layer(config: &LogConfig) -> Result<(BoxedLayer, WorkerGuard)> {
    std::fs::create_dir_all(&config.log_dir).context("Failed to create log directory")?;

    let appender = tracing_appender::rolling::daily(&config.log_dir, &config.log_file_prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = build_filter(config)?;
    let layer = fmt::layer()
        .with_writer(writer)
        .with_target(config.include_targets)
        .with_thread_ids(config.include_thread_ids)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(false);

    let layer = match config.format {
        LogFormat::Text => layer.with_filter(filter).boxed(),
        LogFormat::Json => layer.json().with_filter(filter).boxed(),
    };

    Ok((layer, guard))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!("trace".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("Info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("ERROR".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_log_output_from_str() {
        assert_eq!("console".parse::<LogOutput>().unwrap(), LogOutput::Console);
        assert_eq!("stderr".parse::<LogOutput>().unwrap(), LogOutput::Console);
        assert_eq!("file".parse::<LogOutput>().unwrap(), LogOutput::File);
        assert_eq!("both".parse::<LogOutput>().unwrap(), LogOutput::Both);
        assert!("syslog".parse::<LogOutput>().is_err());
    }

    #[test]
    fn test_log_output_targets() {
        assert!(LogOutput::Console.includes_console());
        assert!(!LogOutput::Console.includes_file());
        assert!(LogOutput::Both.includes_console() && LogOutput::Both.includes_file());
        assert!(!LogOutput::File.includes_console());
    }

    #[test]
    fn test_config_builder() {
        let config = LogConfig::builder()
            .level(LogLevel::Debug)
            .output(LogOutput::File)
            .format(LogFormat::Json)
            .log_dir("/var/log/lectern")
            .log_file_prefix("upload")
            .filter_directives("reqwest=warn")
            .build();

        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.output, LogOutput::File);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.log_dir, PathBuf::from("/var/log/lectern"));
        assert_eq!(config.log_file_prefix, "upload");
        assert_eq!(config.filter_directives.as_deref(), Some("reqwest=warn"));
    }

    #[test]
    fn test_build_filter_rejects_bad_directive() {
        let config = LogConfig::builder()
            .filter_directives("lectern_cli=notalevel")
            .build();
        assert!(build_filter(&config).is_err());

        let config = LogConfig::builder()
            .filter_directives("reqwest=warn, hyper=error,")
            .build();
        assert!(build_filter(&config).is_ok());
    }

    #[test]
    fn test_invalid_env_value_does_not_block_later_ones() {
        let vars: std::collections::HashMap<&str, &str> = [
            ("LOG_LEVEL", "loud"),
            ("LOG_FORMAT", "json"),
            ("LOG_FILE_PREFIX", "lectern-test"),
        ]
        .into_iter()
        .collect();

        let mut config = LogConfig::builder().level(LogLevel::Warn).build();
        let err = config
            .apply_vars(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap_err();

        assert!(err.to_string().contains("LOG_LEVEL"));
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.log_file_prefix, "lectern-test");
    }
}
