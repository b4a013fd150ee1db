pub mod callback;
pub mod extract;
pub mod payment;

use crate::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub store: String,
}

/// Liveness: answers as long as the process is serving requests.
pub async fn root() -> Json<Value> {
    Json(json!({ "server_status": "Running" }))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let store_ok = state.lifecycle.store_healthy().await;

    let health_response = HealthStatus {
        status: if store_ok { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: if store_ok { "connected" } else { "disconnected" }.to_string(),
    };

    // Return 503 if the store is down, 200 otherwise
    let status_code = if store_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health_response))
}
