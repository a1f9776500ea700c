//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub store: StoreHealthResponse,
}

#[derive(Debug, Serialize)]
pub struct StoreHealthResponse {
    pub status: String,
    pub connected: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let connected = state.store.ping().await.is_ok();

    Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        store: StoreHealthResponse {
            status: if connected { "up" } else { "down" }.to_string(),
            connected,
        },
    })
}
