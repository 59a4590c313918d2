use crate::error::LearnerError;
use crate::lifecycle::Lifecycle;
use crate::queue::QueueCounts;
use axum::Router;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Bind `listen_addr` and run the pipeline until SIGTERM/SIGINT, then drain.
///
/// SIGHUP is acknowledged without touching the pipeline.
pub async fn serve(
    app: Router,
    lifecycle: Lifecycle,
    listen_addr: &str,
) -> Result<QueueCounts, LearnerError> {
    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .map_err(|e| LearnerError::Bind {
            address: listen_addr.to_string(),
            source: e,
        })?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = std::process::id(),
        "mctsd listening on {}",
        listener.local_addr()?
    );
    info!("  - POST /learn/{{ham|spam}}/{{user}}  (multipart field \"file\")");

    let shutdown_token = CancellationToken::new();

    let trigger = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.cancel();
    });
    tokio::spawn(reload_signal(shutdown_token.clone()));

    lifecycle.serve(listener, app, shutdown_token).await
}

/// Wait for SIGTERM or SIGINT (Ctrl+C) for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, initiating graceful shutdown"),
        () = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

/// Acknowledge SIGHUP until shutdown starts. Reload has nothing to reload yet.
#[cfg(unix)]
async fn reload_signal(shutdown: CancellationToken) {
    let mut hangup = match signal::unix::signal(signal::unix::SignalKind::hangup()) {
        Ok(signal) => signal,
        Err(e) => {
            tracing::warn!("Failed to install SIGHUP handler: {}", e);
            return;
        }
    };

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            received = hangup.recv() => {
                if received.is_none() {
                    break;
                }
                info!("Received reload signal");
            }
        }
    }
}

#[cfg(not(unix))]
async fn reload_signal(_shutdown: CancellationToken) {}
