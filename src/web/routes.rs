use crate::state::AppState;
use crate::web::handlers::{chat, health, session, sets};
use crate::web::middleware::require_session;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub fn create_routes(state: AppState) -> Router {
    // Session-scoped endpoints, behind the bearer-token gate
    let protected = Router::new()
        .route("/chat", post(chat::chat))
        .route("/sets", get(sets::list_values).post(sets::add_value))
        // Legacy paths still used by older web clients
        .route("/api/askGPT", post(chat::chat))
        .route("/api/redis/list", get(sets::list_values))
        .route("/api/redis/add", post(sets::add_value))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .route("/", get(health::welcome))
        .route("/health", get(health::health_check))
        .route("/session", get(session::create_session).post(session::create_session))
        .route("/api/session", get(session::create_session))
        .merge(protected)
        .with_state(state)
}
