//! Startup and shutdown ordering for the ingestion pipeline.
//!
//! Shutdown always stops HTTP admission first and closes the queue second, so
//! a request that got a 200 has its job in the queue before the worker is told
//! to finish. Open connections get `shutdown_timeout` to complete and are then
//! aborted. The queue drain itself has no deadline.

use crate::connection;
use crate::error::LearnerError;
use crate::port::Trainer;
use crate::queue::{self, JobQueue, QueueCounts};
use crate::worker::DispatchWorker;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Default bound on graceful HTTP shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Running,
    Draining,
    Stopped,
}

pub struct Lifecycle {
    queue: JobQueue,
    worker: JoinHandle<()>,
    state: watch::Sender<LifecycleState>,
    shutdown_timeout: Duration,
}

impl Lifecycle {
    /// Create the queue and start the dispatch worker.
    pub fn start(queue_size: usize, trainer: Arc<dyn Trainer>, shutdown_timeout: Duration) -> Self {
        let (queue, receiver) = queue::bounded(queue_size);
        let worker = DispatchWorker::new(receiver, trainer).spawn();
        let (state, _) = watch::channel(LifecycleState::Running);

        info!(queue_size, "Submission queue created");

        Self {
            queue,
            worker,
            state,
            shutdown_timeout,
        }
    }

    /// Producer handle for the ingestion endpoint.
    pub fn queue(&self) -> JobQueue {
        self.queue.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Serve `app` on `listener` until `shutdown` is cancelled, then drain.
    ///
    /// Returns the final counters once every queued job has been dispatched,
    /// or an error if the dispatch worker died.
    pub async fn serve(
        self,
        listener: TcpListener,
        app: Router,
        shutdown: CancellationToken,
    ) -> Result<QueueCounts, LearnerError> {
        let Self {
            queue,
            worker,
            state,
            shutdown_timeout,
        } = self;

        let mut connections = JoinSet::new();
        connection::accept_until(listener, app, shutdown, &mut connections).await;

        state.send_replace(LifecycleState::Draining);
        info!(open_connections = connections.len(), "Shutting down server...");

        let graceful = connection::finish_all(&mut connections);
        if tokio::time::timeout(shutdown_timeout, graceful).await.is_ok() {
            info!("Shutdown complete");
        } else {
            warn!(
                timeout_secs = shutdown_timeout.as_secs_f64(),
                open_connections = connections.len(),
                "Graceful shutdown timed out, closing pending connections"
            );
            connections.shutdown().await;
        }

        let counts = queue.counts();
        info!(queued = counts.queued, dequeued = counts.dequeued, "Queue counters");
        if !counts.is_drained() {
            info!(pending = counts.pending(), "Draining submission queue...");
        }

        queue.close();
        let drained = worker.await;

        let counts = queue.counts();
        state.send_replace(LifecycleState::Stopped);

        if let Err(e) = drained {
            error!(error = %e, "Dispatch worker task failed");
            return Err(LearnerError::Shutdown(e.to_string()));
        }
        info!(queued = counts.queued, dequeued = counts.dequeued, "Submissions completed");
        Ok(counts)
    }
}
