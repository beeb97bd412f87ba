//! Error types for logspool

use thiserror::Error;

/// Errors reported by a [`Transport`](crate::Transport) when forwarding an event
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection to the collector is down; the caller should pause
    #[error("Transport disconnected")]
    Disconnected,

    /// The event could not be written to the wire
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// The collector refused the event
    #[error("Event rejected: {0}")]
    Rejected(String),
}

impl TransportError {
    /// Whether this error signals that the connection itself is gone
    pub fn is_disconnect(&self) -> bool {
        matches!(self, TransportError::Disconnected)
    }
}
