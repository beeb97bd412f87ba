//! Configuration types for the logging system

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Main logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default log level (can be overridden by RUST_LOG)
    pub default_level: String,

    /// Console output configuration
    pub console: ConsoleConfig,

    /// File output configuration
    pub file: Option<FileConfig>,

    /// JSON line formatting, used by file output and non-pretty console output
    pub jsonl: JsonlConfig,

    /// What the spool captures, and how loud the spool itself is
    pub capture: CaptureConfig,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            console: ConsoleConfig::default(),
            file: None,
            jsonl: JsonlConfig::default(),
            capture: CaptureConfig::default(),
        }
    }
}

impl LogConfig {
    /// Filter directives used when `RUST_LOG` is not set
    ///
    /// The spool's own crates get `capture.internal_level` so a busy drain
    /// task can be quietened without hiding the host's events.
    pub fn filter_directives(&self) -> String {
        let mut directives = self.default_level.clone();
        for target in SPOOL_CRATES {
            directives.push_str(&format!(",{target}={}", self.capture.internal_level));
        }
        directives
    }

    /// Create a config for development (verbose console output)
    pub fn development() -> Self {
        Self {
            default_level: "debug".to_string(),
            console: ConsoleConfig {
                enabled: true,
                pretty: true,
                ansi: true,
            },
            capture: CaptureConfig {
                level: "debug".to_string(),
                internal_level: "debug".to_string(),
                ..CaptureConfig::default()
            },
            ..Default::default()
        }
    }

    /// Create a config for production (JSONL file output only)
    pub fn production(log_dir: PathBuf) -> Self {
        Self {
            default_level: "info".to_string(),
            console: ConsoleConfig {
                enabled: false,
                pretty: false,
                ansi: false,
            },
            file: Some(FileConfig {
                directory: log_dir,
                ..FileConfig::default()
            }),
            jsonl: JsonlConfig::default(),
            capture: CaptureConfig::default(),
        }
    }

    /// Create a config for testing (minimal output)
    pub fn testing() -> Self {
        Self {
            default_level: "warn".to_string(),
            console: ConsoleConfig {
                enabled: true,
                pretty: true,
                ansi: false,
            },
            capture: CaptureConfig {
                internal_level: "warn".to_string(),
                ..CaptureConfig::default()
            },
            ..Default::default()
        }
    }
}

/// Crates whose diagnostics follow `CaptureConfig::internal_level`
const SPOOL_CRATES: [&str; 2] = ["logspool_storage", "logspool_drain"];

/// Spool capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Most verbose level captured into the spool
    pub level: String,
    /// Target prefixes never captured, on top of the spool's own targets
    pub ignored_targets: Vec<String>,
    /// Output level for the spool's own diagnostics
    pub internal_level: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            ignored_targets: Vec::new(),
            internal_level: "info".to_string(),
        }
    }
}

impl CaptureConfig {
    /// The capture level, or `None` if `level` does not name one
    pub fn max_level(&self) -> Option<tracing::Level> {
        self.level.parse().ok()
    }
}

/// Console output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Enable console output
    pub enabled: bool,
    /// Use pretty (human-readable) format instead of JSON lines
    pub pretty: bool,
    /// Include ANSI colors
    pub ansi: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pretty: false,
            ansi: false,
        }
    }
}

/// File output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Directory for log files
    pub directory: PathBuf,
    /// File name prefix
    pub prefix: String,
    /// Rotation strategy
    pub rotation: RotationStrategy,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./diagnostics"),
            prefix: "logspool".to_string(),
            rotation: RotationStrategy::Daily,
        }
    }
}

/// File rotation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RotationStrategy {
    /// Rotate daily
    #[default]
    Daily,
    /// Rotate hourly
    Hourly,
    /// Never rotate (single file, truncated at startup)
    Never,
}

/// JSONL formatting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonlConfig {
    /// Flatten event fields to root level
    pub flatten_events: bool,
    /// Include span list in events
    pub include_spans: bool,
    /// Include file/line information
    pub include_location: bool,
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            flatten_events: true,
            include_spans: true,
            include_location: true,
        }
    }
}
