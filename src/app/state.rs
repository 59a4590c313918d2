use crate::adapter::RspamcTrainer;
use crate::config::Settings;
use crate::error::LearnerError;
use crate::handler::LearnState;
use crate::lifecycle::Lifecycle;
use crate::port::Trainer;
use std::sync::Arc;

/// Everything the daemon runs: the pipeline lifecycle and the handler state
/// wired to its queue.
pub struct AppState {
    pub lifecycle: Lifecycle,
    pub learn: LearnState,
}

impl AppState {
    /// Create `AppState` from configuration settings.
    ///
    /// Starts the dispatch worker feeding the configured trainer command.
    pub fn from_settings(settings: &Settings) -> Result<Self, LearnerError> {
        let trainer: Arc<dyn Trainer> = Arc::new(
            RspamcTrainer::new(settings.trainer_command.clone())
                .with_base_args(settings.trainer_args.clone())
                .with_domains(settings.domains.clone())
                .with_verbose(settings.verbose),
        );
        Self::with_trainer(settings, trainer)
    }

    /// Same as [`AppState::from_settings`] with an explicit trainer.
    pub fn with_trainer(
        settings: &Settings,
        trainer: Arc<dyn Trainer>,
    ) -> Result<Self, LearnerError> {
        let identity = settings.identity_policy()?;
        let lifecycle =
            Lifecycle::start(settings.queue_size, trainer, settings.shutdown_timeout());
        let learn = LearnState::new(lifecycle.queue(), identity);
        Ok(Self { lifecycle, learn })
    }
}
