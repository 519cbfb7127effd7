use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::queue::RecordQueue;
use crate::transport::Transport;

/// Outcome of delivering one page of records.
enum PageOutcome {
    Settled { delivered: usize, failed: usize },
    /// Cancellation fired mid-settle; outstanding sends are abandoned.
    Cancelled,
    /// A delivery task panicked; the transport broke its
    /// failures-as-values contract. The rest of the tick is skipped.
    Aborted,
}

/// Drives the periodic drain-and-deliver cycle.
///
/// One dispatcher task is the sole dequeuer of its `RecordQueue`; any number
/// of producers keep enqueueing concurrently. `run` consumes the dispatcher,
/// so a cancelled loop is stopped for good: there is no restart.
pub struct Dispatcher<T: Transport> {
    queue: RecordQueue,
    transport: Arc<T>,
    flush_interval: Duration,
    drain_cap: usize,
    page_size: usize,
    cancel: CancellationToken,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(
        queue: RecordQueue,
        transport: T,
        config: &Config,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            queue,
            transport: Arc::new(transport),
            flush_interval: config.flush_interval,
            drain_cap: config.drain_cap,
            page_size: config.page_size,
            cancel,
        }
    }

    /// Run the drain loop until the cancellation token fires.
    ///
    /// The first tick fires immediately, so a backlog built up before the
    /// dispatcher started is not held for a full interval.
    pub async fn run(self) {
        let mut timer = tokio::time::interval(self.flush_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = timer.tick() => self.tick().await,
            }
        }
        debug!(queued = self.queue.len(), "dispatcher stopped");
    }

    /// One drain-and-deliver cycle. Errors never escape a tick: failed
    /// records are logged and dropped, and an aborted tick leaves the loop
    /// intact for the next interval.
    async fn tick(&self) {
        let batch = self.drain();
        if batch.is_empty() {
            return;
        }
        debug!(drained = batch.len(), "flushing records");

        let mut delivered = 0;
        let mut failed = 0;
        for page in batch.chunks(self.page_size) {
            match self.dispatch_page(page).await {
                PageOutcome::Settled {
                    delivered: d,
                    failed: f,
                } => {
                    delivered += d;
                    failed += f;
                }
                PageOutcome::Cancelled => {
                    warn!(delivered, failed, "cancelled mid-flush, abandoning remaining records");
                    return;
                }
                PageOutcome::Aborted => return,
            }
        }
        debug!(delivered, failed, "flush complete");
    }

    /// Pull up to `drain_cap` records off the queue, one dequeue at a time,
    /// stopping early when the queue runs dry. Records enqueued after that
    /// point wait for the next tick.
    fn drain(&self) -> Vec<Bytes> {
        let mut batch = Vec::new();
        while batch.len() < self.drain_cap {
            match self.queue.dequeue() {
                Some(record) => batch.push(record),
                None => break,
            }
        }
        batch
    }

    /// Deliver one page: every record concurrently, then wait for all of
    /// them to settle. In-flight requests are therefore capped at the page
    /// size, and page N+1 never starts while page N has sends outstanding.
    async fn dispatch_page(&self, page: &[Bytes]) -> PageOutcome {
        let mut sends = JoinSet::new();
        for record in page {
            let transport = Arc::clone(&self.transport);
            let record = record.clone();
            sends.spawn(async move { transport.send(record).await });
        }

        let mut delivered = 0;
        let mut failed = 0;
        loop {
            let joined = tokio::select! {
                joined = sends.join_next() => joined,
                _ = self.cancel.cancelled() => return PageOutcome::Cancelled,
            };
            match joined {
                Some(Ok(Ok(()))) => delivered += 1,
                Some(Ok(Err(e))) => {
                    warn!(error = %e, "record delivery failed");
                    failed += 1;
                }
                Some(Err(e)) => {
                    error!(error = %e, "delivery task panicked, aborting tick");
                    return PageOutcome::Aborted;
                }
                None => return PageOutcome::Settled { delivered, failed },
            }
        }
    }
}
