//! Bearer-token gate for session-scoped routes

use crate::state::AppState;
use crate::types::{AppError, AuthError};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

/// Session id resolved from a verified token.
///
/// Inserted into the request extensions by [`require_session`]; handlers take
/// it as `Extension<SessionId>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Verify the bearer token before the handler runs; reject with 401 otherwise.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?;
    let session_id = state.tokens.verify(token)?;
    tracing::debug!(%session_id, path = %request.uri().path(), "session verified");

    request.extensions_mut().insert(SessionId(session_id));
    Ok(next.run(request).await)
}

pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::Missing)?
        .to_str()
        .map_err(|_| AuthError::Malformed("authorization header is not ascii".into()))?
        .trim();

    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| AuthError::Malformed("expected `Bearer <token>`".into()))?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::Malformed(format!("unsupported scheme {scheme}")));
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::Missing);
    }
    Ok(token)
}
