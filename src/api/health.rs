use axum::extract::State;
use axum::Json;

use crate::api::AppState;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// The engine is stateless, so readiness only echoes the request limits.
pub async fn ready(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ready",
        "maxOperations": state.config.max_operations,
        "csvDelimiter": (state.config.csv_delimiter as char).to_string(),
    }))
}
