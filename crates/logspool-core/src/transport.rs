//! Transport abstraction for forwarding log events
//!
//! The [`Transport`] trait is the only view the spool has of the network.
//! Connecting, reconnecting, framing and the wire format all live behind it;
//! the drain cycle only asks whether the link is up and hands over one
//! decoded event at a time.
//!
//! ## Implementations
//!
//! - [`MockTransport`](crate::MockTransport): in-memory transport for testing
//! - socket or HTTP transports are provided by the host

use async_trait::async_trait;

use crate::error::TransportError;
use crate::event::LogEvent;

/// Capability for forwarding log events to a remote collector
///
/// Implementations are responsible for their own connect and send timeouts:
/// the drain cycle awaits [`send`](Transport::send) without a deadline, so a
/// send that never completes stalls every later cycle.
///
/// # Example
///
/// ```rust,ignore
/// use logspool_core::{LogEvent, Transport, TransportError};
///
/// async fn forward<T: Transport>(transport: &T, event: &LogEvent) -> Result<(), TransportError> {
///     if !transport.is_connected() {
///         return Err(TransportError::Disconnected);
///     }
///     transport.send(event).await
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Whether the link to the collector is currently up
    fn is_connected(&self) -> bool;

    /// Forward one event
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Disconnected`] when the link dropped during
    /// the attempt; any other error means this event failed but the link may
    /// still be usable.
    async fn send(&self, event: &LogEvent) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    async fn send(&self, event: &LogEvent) -> Result<(), TransportError> {
        (**self).send(event).await
    }
}
