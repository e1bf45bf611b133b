//! HTTP surface for beacon ingestion.

pub mod config;
pub mod routes;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

pub use config::{ApiConfig, StoreKind};
pub use state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/ingest",
            post(routes::ingest).fallback(routes::method_not_allowed),
        )
        .route("/health", get(routes::health))
        .layer(DefaultBodyLimit::max(routes::MAX_BODY_BYTES))
        .with_state(state)
}
