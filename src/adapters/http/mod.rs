pub mod cors;
pub mod error;
pub mod routes;
pub mod state;

use axum::{extract::DefaultBodyLimit, routing::{get, post}, Router};
use tower_http::trace::TraceLayer;

use crate::adapters::http::cors::OriginPolicy;
use crate::adapters::http::state::HttpState;

pub fn router(state: HttpState, origins: &OriginPolicy, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/detect", post(routes::detect))
        .route("/detect-debug", post(routes::detect_debug))
        .route("/health", get(routes::health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(origins.layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
