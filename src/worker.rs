//! Single background task that forwards queued jobs to the trainer.

use crate::domain::Job;
use crate::port::Trainer;
use crate::queue::JobReceiver;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub struct DispatchWorker {
    receiver: JobReceiver,
    trainer: Arc<dyn Trainer>,
}

impl DispatchWorker {
    pub fn new(receiver: JobReceiver, trainer: Arc<dyn Trainer>) -> Self {
        Self { receiver, trainer }
    }

    /// Spawn the dispatch loop. The handle completes once the queue is
    /// closed and every accepted job has been submitted.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        info!("Dispatch worker started");

        while let Some(job) = self.receiver.dequeue().await {
            let counts = self.receiver.counts();
            debug!(
                user = job.identity(),
                class = %job.class(),
                queued = counts.queued,
                dequeued = counts.dequeued,
                "Dequeued sample"
            );
            dispatch(self.trainer.as_ref(), job).await;
        }

        info!("Dispatch worker stopped");
    }
}

/// Submit one job and log what the trainer reported. Never fails: trainer
/// problems are only logged and the loop carries on.
async fn dispatch(trainer: &dyn Trainer, job: Job) {
    let user = job.identity().to_string();
    let class = job.class();
    debug!(user = %user, %class, "Submitting sample");

    match trainer.train(job).await {
        Ok(outcomes) => {
            for outcome in outcomes {
                let recipient = outcome.target.as_str();
                if !outcome.succeeded() {
                    match outcome.exit_code {
                        Some(code) => warn!(
                            recipient,
                            exit_code = code,
                            "Trainer exited with non-zero status"
                        ),
                        None => warn!(recipient, "Trainer terminated by signal"),
                    }
                }
                if !outcome.stderr.is_empty() {
                    warn!(
                        recipient,
                        stderr = %outcome.stderr.trim_end(),
                        "Trainer stderr"
                    );
                }
                if !outcome.stdout.is_empty() {
                    info!(
                        recipient,
                        stdout = %outcome.stdout.trim_end(),
                        "Trainer stdout"
                    );
                }
            }
        }
        Err(e) => {
            error!(user = %user, %class, error = %e, "Trainer invocation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SampleClass;
    use crate::queue;
    use crate::test_support::MockTrainer;
    use std::time::Duration;
    use tokio::time::timeout;
    use tracing_test::traced_test;

    #[tokio::test]
    async fn dispatches_every_job_in_order_then_stops_on_close() {
        let trainer = Arc::new(MockTrainer::new());
        let (queue, receiver) = queue::bounded(16);
        let handle = DispatchWorker::new(receiver, trainer.clone()).spawn();

        for user in ["u1", "u2", "u3"] {
            queue
                .enqueue(Job::new(SampleClass::Spam, user, b"x".to_vec()))
                .await
                .unwrap();
        }
        queue.close();

        timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();

        let users: Vec<String> = trainer.trained().into_iter().map(|s| s.identity).collect();
        assert_eq!(users, vec!["u1", "u2", "u3"]);
        assert_eq!(queue.counts().queued, 3);
        assert_eq!(queue.counts().dequeued, 3);
    }

    #[tokio::test]
    async fn trainer_failures_do_not_stop_the_loop() {
        let trainer = Arc::new(MockTrainer::new());
        trainer.set_should_fail(true);
        let (queue, receiver) = queue::bounded(4);
        let handle = DispatchWorker::new(receiver, trainer.clone()).spawn();

        queue
            .enqueue(Job::new(SampleClass::Ham, "a", b"1".to_vec()))
            .await
            .unwrap();
        queue
            .enqueue(Job::new(SampleClass::Ham, "b", b"2".to_vec()))
            .await
            .unwrap();
        queue.close();

        timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
        assert_eq!(trainer.attempts(), 2);
        assert!(queue.counts().is_drained());
    }

    #[tokio::test]
    async fn dispatch_only_moves_dequeued_counter() {
        let trainer = Arc::new(MockTrainer::new());
        trainer.set_exit_code(2);
        let (queue, receiver) = queue::bounded(4);
        let handle = DispatchWorker::new(receiver, trainer.clone()).spawn();

        queue
            .enqueue(Job::new(SampleClass::Spam, "a", b"1".to_vec()))
            .await
            .unwrap();
        queue.close();
        timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();

        let counts = queue.counts();
        assert_eq!(counts.queued, 1);
        assert_eq!(counts.dequeued, 1);
    }

    #[traced_test]
    #[tokio::test]
    async fn non_zero_exit_is_logged() {
        let trainer = MockTrainer::new();
        trainer.set_exit_code(2);

        dispatch(&trainer, Job::new(SampleClass::Ham, "a", b"1".to_vec())).await;

        assert!(logs_contain("Trainer exited with non-zero status"));
    }

    #[traced_test]
    #[tokio::test]
    async fn launch_failure_is_logged() {
        let trainer = MockTrainer::new();
        trainer.set_should_fail(true);

        dispatch(&trainer, Job::new(SampleClass::Spam, "b", b"2".to_vec())).await;

        assert!(logs_contain("Trainer invocation failed"));
    }
}
