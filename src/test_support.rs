//! Shared test support utilities
//!
//! Provides a `MockTrainer` implementing `Trainer` for use in unit and
//! integration tests.

use crate::domain::{Job, SampleClass};
use crate::port::{TrainOutcome, Trainer, TrainerError};
use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::time::Duration;

/// A job as the trainer saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainedSample {
    pub class: SampleClass,
    pub identity: String,
    pub payload: Bytes,
}

/// Mock trainer that records every submitted job in dispatch order.
pub struct MockTrainer {
    trained: Mutex<Vec<TrainedSample>>,
    attempts: AtomicUsize,
    should_fail: AtomicBool,
    exit_code: AtomicI32,
    delay: Duration,
}

impl Default for MockTrainer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTrainer {
    pub fn new() -> Self {
        Self {
            trained: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            should_fail: AtomicBool::new(false),
            exit_code: AtomicI32::new(0),
            delay: Duration::ZERO,
        }
    }

    /// Sleep this long inside every invocation, to keep jobs in the queue.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_exit_code(&self, code: i32) {
        self.exit_code.store(code, Ordering::SeqCst);
    }

    pub fn trained(&self) -> Vec<TrainedSample> {
        self.trained.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Trainer for MockTrainer {
    fn train(
        &self,
        job: Job,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<TrainOutcome>, TrainerError>> + Send + '_>> {
        Box::pin(async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.should_fail.load(Ordering::SeqCst) {
                return Err(TrainerError::Launch {
                    program: "mock-trainer".to_string(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "mock launch failure",
                    ),
                });
            }

            let (class, identity, payload) = job.into_parts();
            let target = identity.clone();
            self.trained.lock().unwrap().push(TrainedSample {
                class,
                identity,
                payload,
            });

            Ok(vec![TrainOutcome {
                target,
                exit_code: Some(self.exit_code.load(Ordering::SeqCst)),
                stdout: String::new(),
                stderr: String::new(),
            }])
        })
    }
}
