//! Capture layer feeding tracing events into the spool
//!
//! [`SpoolLayer`] turns every tracing event that passes its filters into an
//! owned [`LogEvent`] and pushes it onto an unbounded channel. Whoever holds
//! the receiving end (usually an appender forwarding task) decides what to do
//! with it. The layer never blocks the logging call site.

use std::fmt::Debug;

use logspool_core::{Level, LogEvent};
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::config::CaptureConfig;

/// Targets under this prefix are never captured, so the spool's own
/// diagnostics cannot feed back into the backlog
pub const SPOOL_TARGET_PREFIX: &str = "logspool_";

/// Layer that captures tracing events as [`LogEvent`]s
pub struct SpoolLayer {
    tx: mpsc::UnboundedSender<LogEvent>,
    /// Most verbose level that is captured
    max_level: tracing::Level,
    /// Target prefixes that are never captured
    ignored_targets: Vec<String>,
}

impl SpoolLayer {
    /// Create a layer sending captured events to `tx`
    pub fn new(tx: mpsc::UnboundedSender<LogEvent>) -> Self {
        Self {
            tx,
            max_level: tracing::Level::INFO,
            ignored_targets: vec![SPOOL_TARGET_PREFIX.to_string()],
        }
    }

    /// Create a layer together with the receiving end of its channel
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<LogEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Create a layer and its receiver with the level and targets in `config`
    ///
    /// An unrecognised level keeps the `INFO` default.
    pub fn configured(config: &CaptureConfig) -> (Self, mpsc::UnboundedReceiver<LogEvent>) {
        let (mut layer, rx) = Self::channel();
        if let Some(level) = config.max_level() {
            layer.max_level = level;
        }
        layer
            .ignored_targets
            .extend(config.ignored_targets.iter().cloned());
        (layer, rx)
    }

    /// Capture events up to and including `level` in verbosity
    pub fn with_max_level(mut self, level: tracing::Level) -> Self {
        self.max_level = level;
        self
    }

    /// Never capture events whose target starts with `prefix`
    pub fn ignore_target(mut self, prefix: impl Into<String>) -> Self {
        self.ignored_targets.push(prefix.into());
        self
    }

    fn captures(&self, metadata: &tracing::Metadata<'_>) -> bool {
        // More verbose levels compare greater in tracing
        if *metadata.level() > self.max_level {
            return false;
        }
        let target = metadata.target();
        !self
            .ignored_targets
            .iter()
            .any(|prefix| target.starts_with(prefix.as_str()))
    }
}

impl<S> Layer<S> for SpoolLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !self.captures(metadata) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let mut log_event = LogEvent::new(
            level_from_tracing(metadata.level()),
            metadata.target(),
            visitor.message.unwrap_or_default(),
        );
        log_event.fields.extend(visitor.fields);

        if let Some(name) = std::thread::current().name() {
            log_event = log_event.with_thread(name);
        }
        if let (Some(file), Some(line)) = (metadata.file(), metadata.line()) {
            let module = metadata.module_path().unwrap_or(metadata.target());
            log_event = log_event.with_caller(module, file, line);
        }

        // A closed receiver means nobody is spooling anymore
        let _ = self.tx.send(log_event);
    }
}

/// Map a tracing level onto the stored level
pub fn level_from_tracing(level: &tracing::Level) -> Level {
    match *level {
        tracing::Level::TRACE => Level::Trace,
        tracing::Level::DEBUG => Level::Debug,
        tracing::Level::INFO => Level::Info,
        tracing::Level::WARN => Level::Warn,
        tracing::Level::ERROR => Level::Error,
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Vec<(String, String)>,
}

impl FieldVisitor {
    fn store(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.push((field.name().to_string(), value));
        }
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.store(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        self.store(field, format!("{value:?}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    fn capture(layer: SpoolLayer, emit: impl FnOnce()) {
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, emit);
    }

    #[test]
    fn test_captures_message_and_fields() {
        let (layer, mut rx) = SpoolLayer::channel();
        capture(layer, || {
            tracing::warn!(target: "app::db", waiters = 17, pool = "main", "pool exhausted");
        });

        let event = rx.try_recv().unwrap();
        assert_eq!(event.level, Level::Warn);
        assert_eq!(event.logger, "app::db");
        assert_eq!(event.message, "pool exhausted");
        assert_eq!(event.fields.get("waiters").map(String::as_str), Some("17"));
        assert_eq!(event.fields.get("pool").map(String::as_str), Some("main"));
        assert!(event.caller.is_some());
    }

    #[test]
    fn test_respects_max_level() {
        let (layer, mut rx) = SpoolLayer::channel();
        capture(layer, || {
            tracing::debug!(target: "app", "too chatty");
            tracing::info!(target: "app", "kept");
        });

        assert_eq!(rx.try_recv().unwrap().message, "kept");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_ignores_spool_targets() {
        let (layer, mut rx) = SpoolLayer::channel();
        let layer = layer.ignore_target("noisy");
        capture(layer, || {
            tracing::warn!(target: "logspool_drain::scheduler", "own diagnostics");
            tracing::warn!(target: "noisy::module", "ignored");
            tracing::warn!(target: "app", "captured");
        });

        assert_eq!(rx.try_recv().unwrap().message, "captured");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_configured_from_capture_config() {
        let config = CaptureConfig {
            level: "warn".to_string(),
            ignored_targets: vec!["vendor".to_string()],
            ..CaptureConfig::default()
        };
        let (layer, mut rx) = SpoolLayer::configured(&config);
        capture(layer, || {
            tracing::info!(target: "app", "below level");
            tracing::error!(target: "vendor::sdk", "ignored");
            tracing::error!(target: "logspool_storage::writer", "still ignored");
            tracing::warn!(target: "app", "captured");
        });

        assert_eq!(rx.try_recv().unwrap().message, "captured");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_receiver_is_harmless() {
        let (layer, rx) = SpoolLayer::channel();
        drop(rx);
        capture(layer, || tracing::error!(target: "app", "nobody listening"));
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(level_from_tracing(&tracing::Level::TRACE), Level::Trace);
        assert_eq!(level_from_tracing(&tracing::Level::ERROR), Level::Error);
    }
}
