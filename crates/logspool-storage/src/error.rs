//! Error types for logspool-storage
//!
//! This module defines the error types used throughout the storage crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error during storage operations
    #[error("I/O error: {0}")]
    Io(String),

    /// Error while encoding an event
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error while decoding an event; the stored file is unusable
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// A fully written temp file could not be renamed to its final name
    #[error("Could not publish {from} as {to}: {reason}")]
    Publish {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl StorageError {
    /// Create a new Serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Create a new Deserialization error
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::Deserialization(message.into())
    }

    /// Create a new I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    /// Whether the error means stored bytes could not be turned back into an event
    pub fn is_corrupt(&self) -> bool {
        matches!(self, StorageError::Deserialization(_))
    }
}

/// Convert from postcard Error to StorageError
impl From<postcard::Error> for StorageError {
    fn from(err: postcard::Error) -> Self {
        StorageError::Deserialization(err.to_string())
    }
}
