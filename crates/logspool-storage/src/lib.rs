//! # logspool storage
//!
//! The on-disk backlog behind the spool.
//!
//! Every event is written to its own file, and a file only becomes visible
//! under its final name once its content is complete. A drain cycle lists
//! the directory, applies the quota, and works through the oldest files.
//!
//! ## Features
//!
//! - **EventCodec trait**: one event in, one byte blob out, and back
//! - **PostcardCodec / JsonCodec**: the two stored formats
//! - **DurableWriter**: write-then-rename persistence and stale temp cleanup
//! - **BacklogIndex**: oldest-first listing of published event files
//! - **QuotaEvictor**: count-based cap with oldest-first eviction
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use logspool_core::{Level, LogEvent};
//! use logspool_storage::{BacklogIndex, DurableWriter, PostcardCodec, QuotaEvictor};
//!
//! let writer = DurableWriter::new("/var/spool/app/", ".ser", Arc::new(PostcardCodec));
//! writer.persist(&LogEvent::new(Level::Info, "app", "started")).await?;
//!
//! let index = BacklogIndex::new("/var/spool/app/", ".ser");
//! let plan = QuotaEvictor::new(500).plan(index.list().await, 50);
//! ```

pub mod backlog;
pub mod codec;
pub mod error;
pub mod quota;
pub mod writer;

// Re-exports
pub use backlog::{BacklogIndex, PendingEvent};
pub use codec::{CodecKind, EventCodec, JsonCodec, POSTCARD_MAGIC, PostcardCodec};
pub use error::StorageError;
pub use quota::{DrainPlan, QuotaEvictor, QuotaPartition};
pub use writer::{DurableWriter, TEMP_MARKER, temp_path_for};
