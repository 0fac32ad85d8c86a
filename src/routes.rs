use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::any;

use crate::handlers;
use crate::state::AppState;

/// Builds the fixed route table. Method checks live in the handlers so that a wrong method
/// produces the uniform 500 text response rather than a 405. Bodies are unbounded for the
/// same reason: a 413 would bypass that response too.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", any(handlers::hello))
        .route("/_ah/health", any(handlers::health))
        .route("/version", any(handlers::version))
        .route("/tzinfo", any(handlers::tzinfo))
        .route("/lookup_host", any(handlers::lookup_host))
        .route("/logging_custom", any(handlers::logging_custom))
        .route("/monitoring", any(handlers::monitoring))
        .route("/exception", any(handlers::exception))
        .route("/custom", any(handlers::custom))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
}
