use crate::state::AppState;
use crate::types::{AppError, SessionResponse};
use axum::{extract::State, Json};
use chrono::SecondsFormat;
use uuid::Uuid;

/// Start a new session and hand back its token.
pub async fn create_session(
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, AppError> {
    let session_id = Uuid::new_v4().to_string();
    let issued = state
        .tokens
        .issue(&session_id)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    state.metrics.record_session();
    tracing::info!(%session_id, "🆕 session created");

    Ok(Json(SessionResponse {
        message: "New session created".to_string(),
        token: issued.token,
        expires_at: issued.expires_at.to_rfc3339_opts(SecondsFormat::Secs, true),
    }))
}
