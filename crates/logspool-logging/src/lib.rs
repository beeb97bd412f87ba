//! Logging setup for logspool hosts and tests
//!
//! Two concerns live here:
//!
//! - [`SpoolSubscriberBuilder`] installs the process-wide tracing subscriber
//!   (console and/or rolling file output, JSON lines or pretty text, with
//!   `RUST_LOG` overriding the configured level).
//! - [`SpoolLayer`] captures tracing events as owned log events so that an
//!   appender can persist and forward them.
//!
//! # Quick Start
//!
//! ```ignore
//! use logspool_logging::{LogConfig, SpoolSubscriberBuilder};
//!
//! let (builder, events) = SpoolSubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .with_spool_capture();
//! let _guard = builder.init()?;
//!
//! // `events` now yields every captured tracing event
//! ```

pub mod config;
pub mod layer;

pub use config::{
    CaptureConfig, ConsoleConfig, FileConfig, JsonlConfig, LogConfig, RotationStrategy,
};
pub use layer::{SPOOL_TARGET_PREFIX, SpoolLayer, level_from_tracing};

use std::fs::{self, File};

use logspool_core::LogEvent;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Errors raised while installing the subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The log file or its directory could not be created
    #[error("Could not open log file: {0}")]
    File(#[from] std::io::Error),

    /// A global subscriber is already installed
    #[error("Could not install subscriber: {0}")]
    Install(String),
}

/// Builder for configuring and initializing the tracing subscriber
///
/// By default, console output uses JSON lines. Use
/// [`LogConfig::development`] for human-readable output.
pub struct SpoolSubscriberBuilder {
    config: LogConfig,
    spool_layer: Option<SpoolLayer>,
}

impl SpoolSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
            spool_layer: None,
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// Also capture events into the spool
    pub fn with_spool_layer(mut self, layer: SpoolLayer) -> Self {
        self.spool_layer = Some(layer);
        self
    }

    /// Capture events into the spool as described by the configuration
    ///
    /// Returns the receiver the captured events arrive on.
    pub fn with_spool_capture(mut self) -> (Self, mpsc::UnboundedReceiver<LogEvent>) {
        let (layer, events) = SpoolLayer::configured(&self.config.capture);
        self.spool_layer = Some(layer);
        (self, events)
    }

    /// The configuration that will be installed
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Initialize the subscriber globally
    ///
    /// Returns the file writer's guard when file output is configured; keep
    /// it alive for as long as the program logs.
    ///
    /// # Errors
    ///
    /// Fails if the log file cannot be opened or a global subscriber is
    /// already installed.
    pub fn init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.config.filter_directives()));
        let console = &self.config.console;
        let jsonl = &self.config.jsonl;

        let (file_writer, guard) = match &self.config.file {
            Some(file_config) => {
                let (writer, guard) = create_file_writer(file_config)?;
                (Some(writer), Some(guard))
            }
            None => (None, None),
        };

        let pretty_console = (console.enabled && console.pretty).then(|| {
            tracing_subscriber::fmt::layer()
                .with_ansi(console.ansi)
                .with_target(true)
        });

        let json_console = (console.enabled && !console.pretty).then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(jsonl.include_spans)
                .flatten_event(jsonl.flatten_events)
                .with_file(jsonl.include_location)
                .with_line_number(jsonl.include_location)
        });

        let file_layer = file_writer.map(|writer| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(jsonl.include_spans)
                .flatten_event(jsonl.flatten_events)
                .with_file(jsonl.include_location)
                .with_line_number(jsonl.include_location)
                .with_writer(writer)
        });

        Registry::default()
            .with(env_filter)
            .with(pretty_console)
            .with(json_console)
            .with(file_layer)
            .with(self.spool_layer)
            .try_init()
            .map_err(|e| LoggingError::Install(e.to_string()))?;

        Ok(guard)
    }

    /// Initialize the subscriber, ignoring an already installed one
    ///
    /// Test binaries call this from many tests; only the first call wins.
    pub fn try_init(self) -> Option<WorkerGuard> {
        self.init().ok().flatten()
    }
}

impl Default for SpoolSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Open the writer for file output; `Never` truncates a single file
fn create_file_writer(file_config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    let rotation = match file_config.rotation {
        RotationStrategy::Never => {
            fs::create_dir_all(&file_config.directory)?;
            let file_path = file_config
                .directory
                .join(format!("{}.log", file_config.prefix));
            let file = File::create(&file_path)?;
            return Ok(tracing_appender::non_blocking(file));
        }
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
    };

    let appender = RollingFileAppender::new(rotation, &file_config.directory, &file_config.prefix);
    Ok(tracing_appender::non_blocking(appender))
}

/// Initialize logging with default settings (JSON lines to console)
pub fn init_default() -> Result<(), LoggingError> {
    SpoolSubscriberBuilder::new().init().map(|_| ())
}

/// Initialize logging for development (verbose, pretty console output)
pub fn init_development() -> Result<(), LoggingError> {
    SpoolSubscriberBuilder::new()
        .with_config(LogConfig::development())
        .init()
        .map(|_| ())
}

/// Initialize logging for testing (minimal output)
pub fn init_testing() {
    let _ = SpoolSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .try_init();
}
