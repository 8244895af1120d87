use super::Transport;
use crate::domain::DispatchedEntry;
use crate::reliability::DeliveryStats;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// How a worker ended when the logger was drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
    Completed,
    TimedOut,
    Panicked,
}

/// Final accounting for one transport, produced by `drain()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportReport {
    pub name: String,
    pub delivered: u64,
    pub failed: u64,
    pub filtered: u64,
    /// Mean time spent in `deliver`, retries included.
    pub average_latency: Duration,
    pub outcome: WorkerOutcome,
}

impl TransportReport {
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.outcome != WorkerOutcome::Completed
    }
}

/// Background task owning one transport.
///
/// Entries arrive over an unbounded channel so submission never waits, and
/// are delivered one at a time so the transport sees them in submission
/// order. Closing the channel is the drain signal; the task handle is the
/// completion signal.
pub struct Worker {
    name: String,
    transport: Arc<dyn Transport>,
    sender: mpsc::UnboundedSender<Arc<DispatchedEntry>>,
    handle: JoinHandle<()>,
    stats: Arc<DeliveryStats>,
}

impl Worker {
    /// Spawns the delivery task. Must be called from within a tokio runtime.
    ///
    /// When `fatal` is given it is cancelled on the first delivery failure.
    pub fn spawn(transport: Arc<dyn Transport>, fatal: Option<CancellationToken>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let stats = Arc::new(DeliveryStats::new());
        let name = transport.name().to_string();

        let handle = tokio::spawn(delivery_loop(
            transport.clone(),
            receiver,
            stats.clone(),
            fatal,
        ));

        Self {
            name,
            transport,
            sender,
            handle,
            stats,
        }
    }

    /// Queues `entry` unless it is below the transport's level.
    pub fn submit(&self, entry: &Arc<DispatchedEntry>) -> bool {
        if entry.level() < self.transport.min_level() {
            self.stats.record_filtered();
            return false;
        }
        if self.sender.send(entry.clone()).is_err() {
            warn!(transport = %self.name, "Delivery task is gone, entry dropped");
            self.stats.record_delivery(false, Duration::ZERO);
            return false;
        }
        true
    }

    /// Closes the queue and waits for the task to finish, no later than
    /// `deadline`. A task still running at the deadline is aborted.
    pub async fn finish(self, deadline: tokio::time::Instant) -> TransportReport {
        let Worker {
            name,
            sender,
            handle,
            stats,
            ..
        } = self;
        drop(sender);

        let abort = handle.abort_handle();
        let outcome = match tokio::time::timeout_at(deadline, handle).await {
            Ok(Ok(())) => WorkerOutcome::Completed,
            Ok(Err(e)) => {
                error!(transport = %name, "Delivery task failed: {e}");
                WorkerOutcome::Panicked
            }
            Err(_) => {
                warn!(transport = %name, "Drain deadline reached, abandoning queued entries");
                abort.abort();
                WorkerOutcome::TimedOut
            }
        };

        let snapshot = stats.snapshot();
        TransportReport {
            name,
            delivered: snapshot.delivered,
            failed: snapshot.failed,
            filtered: snapshot.filtered,
            average_latency: snapshot.average_latency,
            outcome,
        }
    }
}

async fn delivery_loop(
    transport: Arc<dyn Transport>,
    mut receiver: mpsc::UnboundedReceiver<Arc<DispatchedEntry>>,
    stats: Arc<DeliveryStats>,
    fatal: Option<CancellationToken>,
) {
    let name = transport.name().to_string();
    debug!(transport = %name, "Delivery task started");

    while let Some(entry) = receiver.recv().await {
        let start = Instant::now();
        let at = entry.entry.at.clone();
        match transport.deliver(entry).await {
            Ok(()) => stats.record_delivery(true, start.elapsed()),
            Err(e) => {
                stats.record_delivery(false, start.elapsed());
                error!(transport = %name, at = %at, "Failed to deliver log entry: {e}");
                if let Some(token) = &fatal {
                    token.cancel();
                }
            }
        }
    }

    if let Err(e) = transport.flush().await {
        error!(transport = %name, "Failed to flush transport: {e}");
        stats.record_delivery(false, Duration::ZERO);
        if let Some(token) = &fatal {
            token.cancel();
        }
    }

    debug!(transport = %name, "Delivery task stopped");
}
