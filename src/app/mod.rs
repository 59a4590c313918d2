mod router;
pub mod server;
mod state;
pub mod tracing;

pub use router::learn_router;
pub use state::AppState;

use crate::config;
use crate::error::LearnerError;

/// Application entry point. Parses settings, initializes tracing, starts the
/// pipeline and serves until a shutdown signal has been fully drained.
pub async fn run() -> Result<(), LearnerError> {
    let settings = config::get_configuration()?;
    tracing::init_tracing(settings.log_format, settings.verbose);
    ::tracing::info!(
        trusted = settings.debug,
        domains = ?settings.domains,
        trainer = %settings.trainer_command,
        "Loaded settings"
    );

    let state = AppState::from_settings(&settings)?;
    let app = learn_router(state.learn, settings.max_upload_bytes);

    server::serve(app, state.lifecycle, &settings.listen_addr()).await?;
    Ok(())
}
