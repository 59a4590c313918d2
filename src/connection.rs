//! HTTP/1 accept loop whose connections live in a caller-owned `JoinSet`.
//!
//! Owning the connection tasks lets the lifecycle wait for them with a
//! deadline and abort whatever is still open once that deadline passes.

use axum::Router;
use axum::extract::ConnectInfo;
use hyper::Request;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tracing::{debug, error, warn};

/// Pause after a failed `accept` (e.g. out of file descriptors).
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Accept connections until `shutdown` is cancelled, spawning each onto
/// `connections`.
///
/// The listener is dropped on return, so new connection attempts are refused.
/// Connections already open stop reading new requests once `shutdown` fires
/// and close after their current response.
pub async fn accept_until(
    listener: TcpListener,
    app: Router,
    shutdown: CancellationToken,
    connections: &mut JoinSet<()>,
) {
    loop {
        let accepted = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, remote)) => {
                connections.spawn(serve_connection(
                    stream,
                    remote,
                    app.clone(),
                    shutdown.clone(),
                ));
            }
            Err(e) => {
                warn!(error = %e, "Failed to accept connection");
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
            }
        }

        while let Some(finished) = connections.try_join_next() {
            log_join(finished);
        }
    }
}

/// Wait for every connection task to finish on its own.
pub async fn finish_all(connections: &mut JoinSet<()>) {
    while let Some(finished) = connections.join_next().await {
        log_join(finished);
    }
}

fn log_join(finished: Result<(), tokio::task::JoinError>) {
    if let Err(e) = finished {
        if e.is_panic() {
            error!(error = %e, "Connection task panicked");
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    remote: SocketAddr,
    app: Router,
    shutdown: CancellationToken,
) {
    let service = service_fn(move |mut request: Request<Incoming>| {
        request.extensions_mut().insert(ConnectInfo(remote));
        app.clone().oneshot(request)
    });

    let connection = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
    let mut connection = std::pin::pin!(connection);

    let result = tokio::select! {
        result = connection.as_mut() => result,
        () = shutdown.cancelled() => {
            connection.as_mut().graceful_shutdown();
            connection.await
        }
    };

    if let Err(e) = result {
        debug!(remote = %remote, error = %e, "Connection closed with error");
    }
}
