use crate::handler::{LearnState, fallback_handler, learn_handler, trace_request};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::post;

/// Build the ingestion router.
///
/// Only `POST /learn/{class}/{identity}` is served; other methods get 405 and
/// other paths 404. `max_upload_bytes` caps the whole request body.
pub fn learn_router(state: LearnState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/learn/{*path}", post(learn_handler).fallback(fallback_handler))
        .fallback(fallback_handler)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(middleware::from_fn(trace_request))
        .with_state(state)
}
