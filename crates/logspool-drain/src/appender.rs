//! File-buffering appender
//!
//! The appender sits between a host logging pipeline and a remote collector.
//! Every event it receives is written to the backlog immediately; a drain
//! task owned by the appender forwards the backlog whenever the transport is
//! reachable. Losing the collector therefore never blocks or fails logging.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use logspool_core::{LogEvent, Transport};
use logspool_storage::{DurableWriter, EventCodec};
use tokio::sync::{Mutex, RwLock, broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::config::BacklogConfig;
use crate::error::{DrainError, DrainResult};
use crate::scheduler::{DrainCycle, DrainOutcome, DrainTask};

/// Lifecycle of a log sink plugged into a host logging pipeline
#[async_trait]
pub trait Appender: Send + Sync {
    /// Start accepting events
    async fn start(&self) -> DrainResult<()>;

    /// Stop accepting events and release background work
    async fn stop(&self);

    /// Handle one event
    ///
    /// Never fails; sinks report their own problems through tracing.
    async fn on_event(&self, event: LogEvent);

    /// Whether the appender is currently started
    fn is_started(&self) -> bool;
}

/// Appender that persists every event and drains the backlog in the background
pub struct FileBufferingAppender {
    /// Configuration, fixed at construction
    config: BacklogConfig,
    /// Writes incoming events to the backlog
    writer: DurableWriter,
    /// Shared between the drain task and `drain_now`
    cycle: Arc<DrainCycle>,
    /// Shutdown signal sender
    shutdown_tx: broadcast::Sender<()>,
    /// Drain task handle (None while stopped)
    ///
    /// Held across the whole of `start` and `stop`, so the two never
    /// interleave.
    drain_task: Mutex<Option<JoinHandle<()>>>,
    /// Shared by in-flight writes, exclusive during the stale temp cleanup
    writes: RwLock<()>,
    /// Whether the appender has been started
    started: AtomicBool,
}

impl FileBufferingAppender {
    /// Create an appender using the codec named in `config`
    pub fn new(config: BacklogConfig, transport: Arc<dyn Transport>) -> Self {
        let codec = config.codec.build();
        Self::with_codec(config, transport, codec)
    }

    /// Create an appender with an explicit codec
    pub fn with_codec(
        config: BacklogConfig,
        transport: Arc<dyn Transport>,
        codec: Arc<dyn EventCodec>,
    ) -> Self {
        let writer = DurableWriter::new(
            config.backlog_directory(),
            config.file_suffix.clone(),
            codec.clone(),
        );
        let cycle = Arc::new(DrainCycle::new(&config, transport, codec));
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            writer,
            cycle,
            shutdown_tx,
            drain_task: Mutex::new(None),
            writes: RwLock::new(()),
            started: AtomicBool::new(false),
        }
    }

    /// The appender's configuration
    pub fn config(&self) -> &BacklogConfig {
        &self.config
    }

    /// The backlog directory
    pub fn directory(&self) -> &Path {
        self.writer.directory()
    }

    /// Persist one event, reporting failures to the caller
    ///
    /// Unlike [`Appender::on_event`] this works whether or not the appender
    /// is started. Caller data is stripped unless the configuration keeps it.
    /// A write that overlaps `start` finishes before the stale temp cleanup
    /// begins, so its temp file is never mistaken for a leftover.
    pub async fn append(&self, event: LogEvent) -> DrainResult<PathBuf> {
        let event = if self.config.include_caller_data {
            event
        } else {
            event.without_caller()
        };
        let _writing = self.writes.read().await;
        Ok(self.writer.persist(&event).await?)
    }

    /// Run one drain cycle now, on the caller's task
    ///
    /// Waits for a cycle already running on the drain task to finish first.
    pub async fn drain_now(&self) -> DrainOutcome {
        self.cycle.run().await
    }
}

#[async_trait]
impl Appender for FileBufferingAppender {
    #[instrument(skip(self), fields(directory = %self.directory().display()))]
    async fn start(&self) -> DrainResult<()> {
        let errors = self.config.validate();
        if !errors.is_empty() {
            for problem in &errors {
                error!(error = %problem, "Invalid backlog configuration");
            }
            return Err(DrainError::InvalidConfig(errors));
        }

        let mut drain_task = self.drain_task.lock().await;
        if self.is_started() {
            return Err(DrainError::AlreadyStarted);
        }

        {
            let _exclusive = self.writes.write().await;
            self.writer.remove_stale_temp_files().await;
        }

        *drain_task = Some(DrainTask::spawn(
            self.cycle.clone(),
            self.config.drain_interval(),
            self.shutdown_tx.subscribe(),
        ));
        self.started.store(true, Ordering::SeqCst);

        info!(
            batch_size = self.config.batch_size,
            quota = self.config.quota,
            "File-buffering appender started"
        );
        Ok(())
    }

    #[instrument(skip(self), fields(directory = %self.directory().display()))]
    async fn stop(&self) {
        let mut drain_task = self.drain_task.lock().await;
        if !self.started.swap(false, Ordering::SeqCst) {
            return;
        }

        // Signal shutdown
        let _ = self.shutdown_tx.send(());

        // Wait for the drain task; an in-flight cycle completes first
        if let Some(handle) = drain_task.take()
            && let Err(e) = handle.await
        {
            warn!(error = %e, "Drain task ended abnormally");
        }

        info!("File-buffering appender stopped");
    }

    async fn on_event(&self, event: LogEvent) {
        if !self.is_started() {
            trace!("Appender not started, dropping event");
            return;
        }

        if let Err(e) = self.append(event).await {
            error!(error = %e, "Could not write logging event to disk");
        }
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

/// Hand every event arriving on `events` to `appender`, in arrival order
///
/// The task ends once every sender of the channel has been dropped.
pub fn spawn_forwarder<A>(
    appender: Arc<A>,
    mut events: mpsc::UnboundedReceiver<LogEvent>,
) -> JoinHandle<()>
where
    A: Appender + ?Sized + 'static,
{
    tokio::spawn(async move {
        let mut forwarded = 0u64;
        while let Some(event) = events.recv().await {
            appender.on_event(event).await;
            forwarded += 1;
        }
        debug!(forwarded, "Event channel closed, forwarder exiting");
    })
}
