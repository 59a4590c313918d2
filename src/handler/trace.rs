use axum::extract::{ConnectInfo, Request};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use std::net::SocketAddr;
use tracing::debug;

/// Debug-log every request before routing, including the ones answered by
/// the fallback.
pub async fn trace_request(request: Request, next: Next) -> Response {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    debug!(
        remote = ?remote,
        method = %request.method(),
        uri = %request.uri(),
        content_length = ?request.headers().get(header::CONTENT_LENGTH),
        "Request"
    );

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::learn_router;
    use crate::handler::{IdentityPolicy, LearnState};
    use crate::queue;
    use axum::body::Body;
    use axum::http::{Method, StatusCode};
    use tower::ServiceExt;
    use tracing_test::traced_test;

    #[traced_test]
    #[tokio::test]
    async fn fallback_requests_are_traced_with_remote_address() {
        let (queue, _receiver) = queue::bounded(4);
        let app = learn_router(LearnState::new(queue, IdentityPolicy::Trusted), 1024);
        let remote: SocketAddr = "192.0.2.7:40000".parse().unwrap();

        let mut request = Request::builder()
            .method(Method::GET)
            .uri("/status")
            .body(Body::empty())
            .unwrap();
        request.extensions_mut().insert(ConnectInfo(remote));

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(logs_contain("192.0.2.7:40000"));
        assert!(logs_contain("/status"));
    }
}
