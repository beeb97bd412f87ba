//! Backlog configuration
//!
//! [`BacklogConfig`] is read once when an appender starts and never changes
//! afterwards. It derives serde with per-field defaults so hosts can embed it
//! in their own configuration files and only spell out what they override.

use std::path::{MAIN_SEPARATOR, PathBuf};
use std::time::Duration;

use logspool_storage::{CodecKind, TEMP_MARKER};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default backlog directory
pub const DEFAULT_DIRECTORY: &str = "./logs/";

/// Default suffix of published event files
pub const DEFAULT_FILE_SUFFIX: &str = ".ser";

/// Default number of events sent per drain cycle
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Default period between drain cycles, in milliseconds
pub const DEFAULT_DRAIN_INTERVAL_MS: u64 = 60_000;

/// Default maximum number of event files kept on disk
pub const DEFAULT_QUOTA: usize = 500;

/// Configuration of one file-buffering appender
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacklogConfig {
    /// Directory holding the backlog
    pub directory: PathBuf,
    /// Suffix of published event files
    pub file_suffix: String,
    /// Maximum number of events sent per drain cycle
    pub batch_size: usize,
    /// Period between drain cycles, in milliseconds
    pub drain_interval_ms: u64,
    /// Maximum number of event files kept on disk
    pub quota: usize,
    /// Keep caller location on persisted events
    pub include_caller_data: bool,
    /// Enforce the quota even while the transport is disconnected
    pub evict_when_disconnected: bool,
    /// Format of event files
    pub codec: CodecKind,
}

impl Default for BacklogConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_DIRECTORY),
            file_suffix: DEFAULT_FILE_SUFFIX.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            drain_interval_ms: DEFAULT_DRAIN_INTERVAL_MS,
            quota: DEFAULT_QUOTA,
            include_caller_data: false,
            evict_when_disconnected: false,
            codec: CodecKind::default(),
        }
    }
}

impl BacklogConfig {
    /// Create a configuration with every option at its default
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration for a fast local loop, mainly for tests
    ///
    /// Small batches and a short interval so a backlog drains in well under
    /// a second.
    pub fn fast(directory: impl Into<PathBuf>) -> Self {
        Self {
            batch_size: 10,
            drain_interval_ms: 50,
            ..Self::default()
        }
        .with_directory(directory)
    }

    /// Set the backlog directory
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = normalize_directory(directory.into());
        self
    }

    /// Set the suffix of published event files
    pub fn with_file_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.file_suffix = suffix.into();
        self
    }

    /// Set the number of events sent per drain cycle
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the drain period
    pub fn with_drain_interval(mut self, interval: Duration) -> Self {
        self.drain_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the maximum number of event files kept on disk
    pub fn with_quota(mut self, quota: usize) -> Self {
        self.quota = quota;
        self
    }

    /// Keep or strip caller location on persisted events
    pub fn with_caller_data(mut self, include: bool) -> Self {
        self.include_caller_data = include;
        self
    }

    /// Enforce the quota even while the transport is disconnected
    pub fn with_evict_when_disconnected(mut self, evict: bool) -> Self {
        self.evict_when_disconnected = evict;
        self
    }

    /// Set the event file format
    pub fn with_codec(mut self, codec: CodecKind) -> Self {
        self.codec = codec;
        self
    }

    /// The backlog directory, ending with a path separator
    pub fn backlog_directory(&self) -> PathBuf {
        normalize_directory(self.directory.clone())
    }

    /// Period between drain cycles
    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }

    /// Validate configuration invariants
    ///
    /// Returns every problem found. An empty list means the configuration
    /// can be started.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.directory.as_os_str().is_empty() {
            errors.push(ConfigError::EmptyDirectory);
        }

        if self.file_suffix.is_empty() {
            errors.push(ConfigError::EmptySuffix);
        } else if self.file_suffix.ends_with(TEMP_MARKER) {
            errors.push(ConfigError::SuffixIsTempMarker);
        }

        if self.batch_size == 0 {
            errors.push(ConfigError::ZeroBatchSize);
        }

        if self.drain_interval_ms == 0 {
            errors.push(ConfigError::ZeroDrainInterval);
        }

        if self.quota == 0 {
            errors.push(ConfigError::ZeroQuota);
        }

        errors
    }

    /// Check if the configuration is valid
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

/// Make sure a non-empty directory path ends with the path separator
pub fn normalize_directory(directory: PathBuf) -> PathBuf {
    let text = directory.as_os_str().to_string_lossy();
    if text.is_empty() || text.ends_with(MAIN_SEPARATOR) || text.ends_with('/') {
        return directory;
    }
    directory.join("")
}

/// A configuration option that prevents the appender from starting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No backlog directory
    #[error("directory must not be empty")]
    EmptyDirectory,
    /// No file suffix, so the backlog cannot be told apart from other files
    #[error("file_suffix must not be empty")]
    EmptySuffix,
    /// Published files would look like files still being written
    #[error("file_suffix must not end with the temp marker '-tmp'")]
    SuffixIsTempMarker,
    /// Nothing would ever be sent
    #[error("batch_size must be greater than zero")]
    ZeroBatchSize,
    /// The drain task would spin
    #[error("drain_interval_ms must be greater than zero")]
    ZeroDrainInterval,
    /// Every event would be evicted
    #[error("quota must be greater than zero")]
    ZeroQuota,
}
