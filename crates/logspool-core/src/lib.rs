//! # logspool core
//!
//! Core types, traits, and errors shared by the logspool crates.
//!
//! The spool stores every [`LogEvent`] on disk before handing it to a
//! [`Transport`], so the types here are deliberately small and owned: an
//! event must survive a round trip through a file and a process restart.
//!
//! ## Key Traits
//!
//! - [`Transport`]: capability for forwarding one event to the remote collector
//!
//! ## Key Types
//!
//! - [`LogEvent`]: a single serializable log record
//! - [`Level`]: severity of a log record
//! - [`MockTransport`]: in-memory transport for tests and local runs

pub mod error;
pub mod event;
pub mod mock_transport;
pub mod transport;

// Re-export main types
pub use error::*;
pub use event::*;
pub use mock_transport::*;
pub use transport::*;
