//! Log event types
//!
//! A [`LogEvent`] is the owned form of a log record that the spool writes
//! to disk and later hands to the transport. Everything it holds is plain
//! data so that any serde format can store it.

use std::collections::BTreeMap;
use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a log record
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum Level {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Source location of the call that produced a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerData {
    /// Module path of the caller
    pub module: String,
    /// Source file of the caller
    pub file: String,
    /// Line within `file`
    pub line: u32,
}

/// A single log record as stored in the backlog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    /// When the record was created
    pub timestamp: DateTime<Utc>,
    /// Severity
    pub level: Level,
    /// Name of the logger (usually the tracing target)
    pub logger: String,
    /// Formatted message
    pub message: String,
    /// Name of the thread that emitted the record
    pub thread: Option<String>,
    /// Structured key/value fields, kept ordered for stable encoding
    pub fields: BTreeMap<String, String>,
    /// Caller location, only kept when the appender is told to include it
    pub caller: Option<CallerData>,
}

impl LogEvent {
    /// Create a record stamped with the current time
    pub fn new(level: Level, logger: impl Into<String>, message: impl Into<String>) -> Self {
        Self::at(Utc::now(), level, logger, message)
    }

    /// Create a record with an explicit timestamp
    pub fn at(
        timestamp: DateTime<Utc>,
        level: Level,
        logger: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            level,
            logger: logger.into(),
            message: message.into(),
            thread: None,
            fields: BTreeMap::new(),
            caller: None,
        }
    }

    /// Set the emitting thread name
    pub fn with_thread(mut self, thread: impl Into<String>) -> Self {
        self.thread = Some(thread.into());
        self
    }

    /// Add a structured field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.fields.insert(key.into(), value.to_string());
        self
    }

    /// Attach caller location
    pub fn with_caller(mut self, module: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        self.caller = Some(CallerData {
            module: module.into(),
            file: file.into(),
            line,
        });
        self
    }

    /// Drop caller location, if any
    pub fn without_caller(mut self) -> Self {
        self.caller = None;
        self
    }
}

impl Display for LogEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {:<5} {} - {}",
            self.timestamp.to_rfc3339(),
            self.level,
            self.logger,
            self.message
        )
    }
}
