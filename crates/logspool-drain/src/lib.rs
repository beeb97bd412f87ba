//! # logspool drain
//!
//! Store-and-forward delivery of log events to a collector that is not
//! always reachable.
//!
//! [`FileBufferingAppender`] persists every event it is handed and runs a
//! background [`DrainTask`] that periodically forwards the backlog through a
//! [`Transport`](logspool_core::Transport). Delivery is at-least-once:
//! a file is deleted only after the transport accepted it, after it is found
//! to be unreadable, or when the quota evicts it.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use logspool_core::{Level, LogEvent, MockTransport};
//! use logspool_drain::{Appender, BacklogConfig, FileBufferingAppender};
//!
//! let config = BacklogConfig::new()
//!     .with_directory("/var/spool/app")
//!     .with_quota(1_000);
//! let appender = FileBufferingAppender::new(config, Arc::new(MockTransport::new()));
//!
//! appender.start().await?;
//! appender.on_event(LogEvent::new(Level::Warn, "app", "disk almost full")).await;
//!
//! // Flush what we can before shutting down
//! appender.drain_now().await;
//! appender.stop().await;
//! ```

pub mod appender;
pub mod config;
pub mod error;
pub mod scheduler;

// Re-exports
pub use appender::{Appender, FileBufferingAppender, spawn_forwarder};
pub use config::{BacklogConfig, ConfigError, normalize_directory};
pub use error::{DrainError, DrainResult};
pub use scheduler::{DrainCycle, DrainOutcome, DrainTask};
