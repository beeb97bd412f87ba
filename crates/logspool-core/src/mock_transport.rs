//! Mock transport implementation for testing
//!
//! Provides an in-memory transport for exercising the drain cycle without a
//! collector. Delivered events are recorded in order; connectivity and
//! per-message failures can be scripted.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use logspool_core::{Level, LogEvent, MockTransport, Transport};
//!
//! let transport = MockTransport::new();
//! transport.reject_message("poison");
//!
//! transport.send(&LogEvent::new(Level::Info, "app", "hello")).await.unwrap();
//! assert_eq!(transport.sent_messages(), vec!["hello".to_string()]);
//! ```

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::TransportError;
use crate::event::LogEvent;
use crate::transport::Transport;

/// A scriptable in-memory transport
#[derive(Debug)]
pub struct MockTransport {
    /// Reported connectivity
    connected: AtomicBool,
    /// Events accepted so far, in delivery order
    sent: Mutex<Vec<LogEvent>>,
    /// Messages that are rejected instead of delivered
    rejected: Mutex<HashSet<String>>,
    /// Drop the link once this many events have been accepted
    disconnect_after: Mutex<Option<usize>>,
    /// Every call to `send`, successful or not
    attempts: AtomicUsize,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create a connected transport that accepts everything
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            sent: Mutex::new(Vec::new()),
            rejected: Mutex::new(HashSet::new()),
            disconnect_after: Mutex::new(None),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Create a transport that starts out disconnected
    pub fn disconnected() -> Self {
        let transport = Self::new();
        transport.set_connected(false);
        transport
    }

    /// Change the reported connectivity
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Reject every event whose message equals `message`
    pub fn reject_message(&self, message: impl Into<String>) {
        self.rejected.lock().insert(message.into());
    }

    /// Stop rejecting `message`
    pub fn accept_message(&self, message: &str) {
        self.rejected.lock().remove(message);
    }

    /// Go offline as soon as `count` events in total have been delivered
    pub fn disconnect_after(&self, count: usize) {
        *self.disconnect_after.lock() = Some(count);
    }

    /// Events delivered so far
    pub fn sent(&self) -> Vec<LogEvent> {
        self.sent.lock().clone()
    }

    /// Messages of the events delivered so far
    pub fn sent_messages(&self) -> Vec<String> {
        self.sent.lock().iter().map(|e| e.message.clone()).collect()
    }

    /// Number of `send` calls, including failed ones
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send(&self, event: &LogEvent) -> Result<(), TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }

        if self.rejected.lock().contains(&event.message) {
            return Err(TransportError::Rejected(format!(
                "message '{}' is scripted to fail",
                event.message
            )));
        }

        let delivered = {
            let mut sent = self.sent.lock();
            sent.push(event.clone());
            sent.len()
        };

        if let Some(limit) = *self.disconnect_after.lock()
            && delivered >= limit
        {
            self.set_connected(false);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Level;

    fn event(message: &str) -> LogEvent {
        LogEvent::new(Level::Info, "test", message)
    }

    #[tokio::test]
    async fn test_records_in_order() {
        let transport = MockTransport::new();
        transport.send(&event("a")).await.unwrap();
        transport.send(&event("b")).await.unwrap();

        assert_eq!(transport.sent_messages(), vec!["a", "b"]);
        assert_eq!(transport.attempts(), 2);
    }

    #[tokio::test]
    async fn test_disconnected_refuses() {
        let transport = MockTransport::disconnected();
        assert!(!transport.is_connected());

        let err = transport.send(&event("a")).await.unwrap_err();
        assert!(err.is_disconnect());
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_message() {
        let transport = MockTransport::new();
        transport.reject_message("bad");

        assert!(matches!(
            transport.send(&event("bad")).await,
            Err(TransportError::Rejected(_))
        ));
        assert!(transport.is_connected());

        transport.accept_message("bad");
        transport.send(&event("bad")).await.unwrap();
        assert_eq!(transport.sent_messages(), vec!["bad"]);
    }

    #[tokio::test]
    async fn test_disconnect_after() {
        let transport = MockTransport::new();
        transport.disconnect_after(1);

        transport.send(&event("a")).await.unwrap();
        assert!(!transport.is_connected());
        assert!(transport.send(&event("b")).await.is_err());
        assert_eq!(transport.sent_messages(), vec!["a"]);
    }
}
