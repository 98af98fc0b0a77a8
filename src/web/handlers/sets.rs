//! Per-session fact lists

use crate::services::SetStoreError;
use crate::state::AppState;
use crate::types::message::parse_optional_body;
use crate::types::{
    AddValueRequest, AppError, MessageResponse, SetQuery, SetValuesResponse, ValidationError,
};
use crate::web::middleware::SessionId;
use axum::{
    extract::{Extension, Query, State},
    Json,
};
use bytes::Bytes;

pub async fn list_values(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Query(query): Query<SetQuery>,
) -> Result<Json<SetValuesResponse>, AppError> {
    let set_name = query.require_set_name()?;

    let values = state
        .sets
        .list(session.as_str(), set_name)
        .await
        .map_err(|e| store_failure("Failed to fetch values from set", e))?;

    Ok(Json(SetValuesResponse {
        set_name: set_name.to_string(),
        values,
    }))
}

pub async fn add_value(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Query(query): Query<SetQuery>,
    body: Bytes,
) -> Result<Json<MessageResponse>, AppError> {
    let set_name = query.require_set_name()?;
    let request: AddValueRequest = parse_optional_body(&body)?;
    let value = request
        .value
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::MissingValue)?;

    state
        .sets
        .add(session.as_str(), set_name, &value)
        .await
        .map_err(|e| store_failure("Failed to add value to set", e))?;

    Ok(Json(MessageResponse {
        message: format!("Value '{value}' added to set '{set_name}'"),
    }))
}

fn store_failure(context: &'static str, error: SetStoreError) -> AppError {
    match error {
        SetStoreError::Validation(e) => AppError::Validation(e),
        SetStoreError::Store(e) => AppError::store(context, e),
    }
}
