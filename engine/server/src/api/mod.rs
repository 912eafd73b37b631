//! HTTP surface (§4.8, ambient — an external collaborator per the core's
//! non-goals, specified here so the binary crate is complete).

pub mod handlers;
pub mod routes;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header::CONTENT_TYPE, Method};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::metrics::Metrics;
use crate::AppState;

/// Builds the axum application: routes, a permissive CORS layer, a body
/// size limit generous enough for document uploads, and the request
/// tracing layer.
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(false);

    routes::routes(state)
        .layer(cors)
        .layer(crate::log::create_http_trace_layer())
        .layer(DefaultBodyLimit::max(200 * 1024 * 1024))
}

/// A standalone app serving only `/metrics`, mounted on its own listener
/// when `metrics_port` is configured (§6, §4.11).
pub fn create_metrics_app(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/metrics", axum::routing::get(handlers::metrics))
        .with_state(metrics)
}
