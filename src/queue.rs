//! Bounded FIFO hand-off between the HTTP handlers and the dispatch worker.
//!
//! Producers hold a cloneable [`JobQueue`]; the single consumer owns the
//! [`JobReceiver`]. A full queue suspends the producer (backpressure) instead
//! of dropping the job. Closing the queue stops new enqueues while the receiver
//! keeps yielding everything that was already accepted.

use crate::domain::Job;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Default number of queue slots.
pub const DEFAULT_QUEUE_SIZE: usize = 256 * 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("job queue is closed")]
    Closed,
}

/// Lock-free enqueue/dequeue counters shared by both ends of the queue.
#[derive(Debug, Default)]
struct QueueCounters {
    queued: AtomicU64,
    dequeued: AtomicU64,
}

impl QueueCounters {
    fn snapshot(&self) -> QueueCounts {
        // Read `dequeued` first so a snapshot never shows more dequeues than enqueues.
        let dequeued = self.dequeued.load(Ordering::SeqCst);
        let queued = self.queued.load(Ordering::SeqCst);
        QueueCounts { queued, dequeued }
    }
}

/// Point-in-time view of the queue counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueCounts {
    pub queued: u64,
    pub dequeued: u64,
}

impl QueueCounts {
    /// Jobs accepted but not yet taken by the worker.
    pub fn pending(&self) -> u64 {
        self.queued.saturating_sub(self.dequeued)
    }

    pub fn is_drained(&self) -> bool {
        self.queued == self.dequeued
    }
}

/// Producer handle. Cheap to clone, one per request handler.
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<Job>,
    closed: CancellationToken,
    counters: Arc<QueueCounters>,
}

/// Consumer handle, owned by the dispatch worker.
#[derive(Debug)]
pub struct JobReceiver {
    rx: mpsc::Receiver<Job>,
    closed: CancellationToken,
    counters: Arc<QueueCounters>,
    closing: bool,
}

/// Create a bounded queue with `capacity` slots.
///
/// # Panics
///
/// Panics if `capacity` is zero; settings validation rejects that earlier.
pub fn bounded(capacity: usize) -> (JobQueue, JobReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    let closed = CancellationToken::new();
    let counters = Arc::new(QueueCounters::default());

    let queue = JobQueue {
        tx,
        closed: closed.clone(),
        counters: counters.clone(),
    };
    let receiver = JobReceiver {
        rx,
        closed,
        counters,
        closing: false,
    };
    (queue, receiver)
}

impl JobQueue {
    /// Append a job, waiting for a free slot while the queue is full.
    ///
    /// Fails only if the queue was closed before a slot was obtained.
    pub async fn enqueue(&self, job: Job) -> Result<QueueCounts, QueueError> {
        let permit = tokio::select! {
            biased;
            () = self.closed.cancelled() => return Err(QueueError::Closed),
            permit = self.tx.reserve() => permit.map_err(|_| QueueError::Closed)?,
        };

        // Count before the job becomes visible to the worker.
        self.counters.queued.fetch_add(1, Ordering::SeqCst);
        permit.send(job);
        Ok(self.counters.snapshot())
    }

    /// Stop accepting jobs. Jobs already queued are still delivered.
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    pub fn counts(&self) -> QueueCounts {
        self.counters.snapshot()
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

impl JobReceiver {
    /// Wait for the next job in FIFO order.
    ///
    /// Returns `None` once the queue is closed (or every producer is gone) and
    /// all previously accepted jobs have been handed out.
    pub async fn dequeue(&mut self) -> Option<Job> {
        loop {
            if self.closing {
                let job = self.rx.recv().await;
                return self.take(job);
            }

            tokio::select! {
                biased;
                job = self.rx.recv() => return self.take(job),
                () = self.closed.cancelled() => {
                    self.rx.close();
                    self.closing = true;
                }
            }
        }
    }

    fn take(&self, job: Option<Job>) -> Option<Job> {
        if job.is_some() {
            self.counters.dequeued.fetch_add(1, Ordering::SeqCst);
        }
        job
    }

    pub fn counts(&self) -> QueueCounts {
        self.counters.snapshot()
    }
}
