//! API route definitions.

use std::path::Path;

use axum::http::{HeaderName, Method, header};
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use super::handlers;
use super::state::AppState;

/// Create the application router.
///
/// When `static_dir` is given its contents are served under `/dist`.
pub fn create_router(state: AppState, static_dir: Option<&Path>) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let mut router = Router::new()
        .route("/hello", post(handlers::announce_broadcaster))
        .route("/register-viewer", post(handlers::register_viewer))
        .route("/byebye", post(handlers::teardown_broadcaster))
        .route("/status", get(handlers::status));

    if let Some(dir) = static_dir {
        router = router.nest_service("/dist", ServeDir::new(dir));
    }

    router
        .layer(cors_layer())
        .layer(trace_layer)
        .with_state(state)
}

/// Extension frontends are served from the host's CDN, so any origin may call.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::OPTIONS, Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
}
