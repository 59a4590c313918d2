use crate::domain::Job;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrainerError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("trainer I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of one trainer invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainOutcome {
    /// Who the invocation trained for (`alice` or `alice@example.org`).
    pub target: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl TrainOutcome {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Port for forwarding a job to the external classifier trainer.
///
/// Takes ownership of the job: the payload is consumed by the dispatch step.
/// An implementation may run several invocations for one job and reports one
/// outcome per invocation.
pub trait Trainer: Send + Sync {
    fn train(
        &self,
        job: Job,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<TrainOutcome>, TrainerError>> + Send + '_>>;
}
