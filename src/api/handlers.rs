//! HTTP request handlers

use super::AppState;
use crate::runtime::RegistryStats;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Liveness probe
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/version", get(get_version))
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn status(State(state): State<AppState>) -> Json<RegistryStats> {
    Json(state.registry.stats())
}

async fn get_version() -> &'static str {
    concat!("communauto-bot ", env!("CARGO_PKG_VERSION"))
}
