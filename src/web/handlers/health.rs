//! Health and welcome endpoints

use crate::state::AppState;
use axum::{
    extract::State,
    response::Json,
    http::StatusCode,
};
use serde_json::json;

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "dietmate-relay",
            "version": env!("CARGO_PKG_VERSION"),
            "model": state.relay.model(),
            "metrics": state.metrics.snapshot(),
        }))
    )
}

pub async fn welcome() -> Json<serde_json::Value> {
    Json(json!({ "message": "Welcome to the DietMate chat relay" }))
}
