//! Event encoding for backlog files
//!
//! Each backlog file holds exactly one encoded [`LogEvent`]. The codec is
//! the only component that knows the byte layout; everything else moves
//! opaque blobs around.

use std::fmt::Debug;
use std::sync::Arc;

use logspool_core::LogEvent;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Magic prefix of postcard-encoded backlog files (format version 1)
pub const POSTCARD_MAGIC: &[u8; 4] = b"LSP1";

/// Turns one event into bytes and back
pub trait EventCodec: Debug + Send + Sync {
    /// Encode an event for storage
    fn encode(&self, event: &LogEvent) -> Result<Vec<u8>, StorageError>;

    /// Decode an event previously produced by [`encode`](EventCodec::encode)
    ///
    /// Any input that is not a complete, well-formed encoding yields
    /// [`StorageError::Deserialization`].
    fn decode(&self, bytes: &[u8]) -> Result<LogEvent, StorageError>;
}

/// Compact binary codec: magic header followed by a postcard body
#[derive(Debug, Clone, Copy, Default)]
pub struct PostcardCodec;

impl EventCodec for PostcardCodec {
    fn encode(&self, event: &LogEvent) -> Result<Vec<u8>, StorageError> {
        let mut bytes = POSTCARD_MAGIC.to_vec();
        let body =
            postcard::to_allocvec(event).map_err(|e| StorageError::serialization(e.to_string()))?;
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    fn decode(&self, bytes: &[u8]) -> Result<LogEvent, StorageError> {
        let body = bytes
            .strip_prefix(POSTCARD_MAGIC.as_slice())
            .ok_or_else(|| StorageError::deserialization("missing or unknown format header"))?;

        let (event, rest) = postcard::take_from_bytes::<LogEvent>(body)?;
        if !rest.is_empty() {
            return Err(StorageError::deserialization(format!(
                "{} trailing bytes after event",
                rest.len()
            )));
        }
        Ok(event)
    }
}

/// Human-readable codec: one JSON document per file
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl EventCodec for JsonCodec {
    fn encode(&self, event: &LogEvent) -> Result<Vec<u8>, StorageError> {
        serde_json::to_vec(event).map_err(|e| StorageError::serialization(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<LogEvent, StorageError> {
        serde_json::from_slice(bytes).map_err(|e| StorageError::deserialization(e.to_string()))
    }
}

/// Selects a codec by name in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    /// [`PostcardCodec`] (default)
    #[default]
    Postcard,
    /// [`JsonCodec`]
    Json,
}

impl CodecKind {
    /// Build the codec this kind names
    pub fn build(self) -> Arc<dyn EventCodec> {
        match self {
            CodecKind::Postcard => Arc::new(PostcardCodec),
            CodecKind::Json => Arc::new(JsonCodec),
        }
    }
}
