//! Error taxonomy for the relay
//!
//! Domain errors stay close to the component that raises them; every
//! HTTP-facing failure is funnelled through [`AppError`], which owns the
//! mapping to status codes and bodies.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Client-facing message for every authentication failure.
pub const UNAUTHORIZED_MESSAGE: &str = "Invalid or missing session token";

/// Why a session token was rejected. Only ever logged, never sent to the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing token")]
    Missing,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token expired")]
    Expired,

    #[error("bad signature")]
    BadSignature,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("set_name query parameter is required")]
    MissingSetName,

    #[error("Value is required in the request body")]
    MissingValue,

    #[error("session id must not contain '{0}'")]
    InvalidSessionId(char),

    #[error("invalid request body: {0}")]
    InvalidBody(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Request(String),

    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("upstream stream error: {0}")]
    Protocol(String),

    #[error("prompt rendering failed: {0}")]
    Prompt(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        UpstreamError::Request(e.to_string())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store io error: {0}")]
    Io(String),

    #[error("record encoding failed: {0}")]
    Encoding(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Encoding(e.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        source: StoreError,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn store(context: &'static str, source: StoreError) -> Self {
        AppError::Store { context, source }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Unauthorized(reason) => {
                tracing::warn!(%reason, "🔒 rejected session token");
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": UNAUTHORIZED_MESSAGE })),
                )
                    .into_response()
            }
            AppError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response(),
            AppError::Upstream(e) => {
                tracing::error!(error = %e, "upstream failed before streaming started");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                    format!("***ERROR***: {e}"),
                )
                    .into_response()
            }
            e @ AppError::Store { .. } => {
                tracing::error!(error = %e, "store operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": e.to_string() })),
                )
                    .into_response()
            }
            AppError::Internal(detail) => {
                tracing::error!(%detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
