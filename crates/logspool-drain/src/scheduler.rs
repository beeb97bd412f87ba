//! Periodic backlog drain
//!
//! A [`DrainCycle`] is one pass over the backlog: enforce the quota, then
//! offer the oldest batch to the transport, deleting each file once it is
//! delivered or found to be unreadable. [`DrainTask`] runs cycles on a fixed
//! period until it is told to shut down.
//!
//! Cycles never overlap. The task awaits each cycle inline and the cycle
//! itself holds an async mutex, so a manual [`DrainCycle::run`] from another
//! task waits for the timer's cycle to finish and vice versa. A cycle that
//! takes longer than the period delays the next tick instead of queueing a
//! burst of catch-up cycles.

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use logspool_core::Transport;
use logspool_storage::{BacklogIndex, EventCodec, QuotaEvictor};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, trace, warn};

use crate::config::BacklogConfig;

/// What a single drain cycle did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainOutcome {
    /// Files deleted unsent because the backlog was over quota
    pub evicted: usize,
    /// Files delivered and deleted
    pub delivered: usize,
    /// Files that could not be read or decoded, deleted
    pub corrupt: usize,
    /// Files whose send failed, kept for a later cycle
    pub retained: usize,
    /// Candidates not attempted because the transport went away mid-cycle
    pub untouched: usize,
    /// Delivery was skipped because the transport was disconnected at start
    pub skipped: bool,
    /// The cycle stopped early on a disconnect
    pub interrupted: bool,
}

impl DrainOutcome {
    /// Number of files this cycle removed from the backlog
    pub fn removed(&self) -> usize {
        self.evicted + self.delivered + self.corrupt
    }

    /// Whether the cycle changed nothing on disk and sent nothing
    pub fn is_noop(&self) -> bool {
        self.removed() == 0 && self.retained == 0
    }
}

/// One pass of eviction plus bounded delivery over a backlog directory
pub struct DrainCycle {
    index: BacklogIndex,
    evictor: QuotaEvictor,
    batch_size: usize,
    evict_when_disconnected: bool,
    transport: Arc<dyn Transport>,
    codec: Arc<dyn EventCodec>,
    /// Held for the duration of a cycle
    running: Mutex<()>,
}

impl DrainCycle {
    /// Create a cycle over the backlog described by `config`
    pub fn new(
        config: &BacklogConfig,
        transport: Arc<dyn Transport>,
        codec: Arc<dyn EventCodec>,
    ) -> Self {
        Self {
            index: BacklogIndex::new(config.backlog_directory(), config.file_suffix.clone()),
            evictor: QuotaEvictor::new(config.quota),
            batch_size: config.batch_size,
            evict_when_disconnected: config.evict_when_disconnected,
            transport,
            codec,
            running: Mutex::new(()),
        }
    }

    /// The backlog this cycle drains
    pub fn index(&self) -> &BacklogIndex {
        &self.index
    }

    /// Run one cycle to completion
    ///
    /// Never fails: every per-file problem is logged and reflected in the
    /// returned outcome.
    #[instrument(skip(self), fields(directory = %self.index.directory().display()))]
    pub async fn run(&self) -> DrainOutcome {
        let _running = self.running.lock().await;
        let mut outcome = DrainOutcome::default();

        let connected = self.transport.is_connected();
        if !connected && !self.evict_when_disconnected {
            debug!("Transport disconnected, skipping drain cycle");
            outcome.skipped = true;
            return outcome;
        }

        let batch_size = if connected { self.batch_size } else { 0 };
        let plan = self.evictor.plan(self.index.list().await, batch_size);
        if plan.is_empty() {
            trace!("Nothing to evict or send");
            outcome.skipped = !connected;
            return outcome;
        }

        for pending in &plan.evict {
            if remove_pending(pending.path()).await {
                outcome.evicted += 1;
            }
        }
        if outcome.evicted > 0 {
            info!(
                evicted = outcome.evicted,
                quota = self.evictor.quota(),
                "Backlog over quota, evicted oldest events"
            );
        }

        if !connected {
            outcome.skipped = true;
            return outcome;
        }

        let mut candidates = plan.send.into_iter();
        while let Some(pending) = candidates.next() {
            let path = pending.path();

            let bytes = match pending.read().await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(path = %path.display(), "Pending event vanished before it was read");
                    continue;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Could not read pending event, deleting it");
                    remove_pending(path).await;
                    outcome.corrupt += 1;
                    continue;
                }
            };

            let event = match self.codec.decode(&bytes) {
                Ok(event) => event,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Deserialization failed, deleting pending event");
                    remove_pending(path).await;
                    outcome.corrupt += 1;
                    continue;
                }
            };

            if !self.transport.is_connected() {
                outcome.interrupted = true;
                outcome.untouched = 1 + candidates.len();
                break;
            }

            match self.transport.send(&event).await {
                Ok(()) => {
                    remove_pending(path).await;
                    outcome.delivered += 1;
                }
                Err(e) if e.is_disconnect() => {
                    outcome.interrupted = true;
                    outcome.untouched = 1 + candidates.len();
                    break;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Send failed, keeping event for the next cycle");
                    outcome.retained += 1;
                }
            }
        }

        if outcome.interrupted {
            debug!(
                untouched = outcome.untouched,
                "Transport disconnected mid-cycle, stopping drain"
            );
        }
        trace!(?outcome, "Drain cycle finished");
        outcome
    }
}

/// Delete one backlog file, returning whether it is gone
async fn remove_pending(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => true,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not delete pending event");
            false
        }
    }
}

/// Background task running a [`DrainCycle`] on a fixed period
pub struct DrainTask {
    cycle: Arc<DrainCycle>,
    interval: Duration,
    shutdown_rx: broadcast::Receiver<()>,
    cycle_count: u64,
}

impl DrainTask {
    /// Create a drain task
    pub fn new(
        cycle: Arc<DrainCycle>,
        interval: Duration,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            cycle,
            interval,
            shutdown_rx,
            cycle_count: 0,
        }
    }

    /// Spawn the drain task as a background task
    ///
    /// The first cycle runs one full interval after spawning. The task ends
    /// when a shutdown signal arrives or its sender is dropped; a cycle that
    /// is already running finishes first.
    pub fn spawn(
        cycle: Arc<DrainCycle>,
        interval: Duration,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let task = Self::new(cycle, interval, shutdown_rx);

        tokio::spawn(async move {
            task.run().await;
        })
    }

    /// Run the drain loop
    async fn run(mut self) {
        // tokio intervals cannot have a zero period
        let period = self.interval.max(Duration::from_millis(1));
        info!(interval_ms = period.as_millis() as u64, "Drain task started");

        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    info!(cycles = self.cycle_count, "Drain task shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.cycle_count += 1;
                    let outcome = self.cycle.run().await;
                    if !outcome.is_noop() {
                        debug!(
                            cycle = self.cycle_count,
                            delivered = outcome.delivered,
                            evicted = outcome.evicted,
                            corrupt = outcome.corrupt,
                            retained = outcome.retained,
                            "Drain cycle complete"
                        );
                    }
                }
            }
        }
    }
}
