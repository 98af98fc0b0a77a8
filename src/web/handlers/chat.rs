//! Streamed chat endpoint
//!
//! `Received → Authenticating → {Rejected | Streaming} → Closed → PersistAttempted`.
//! Authentication happens in the session middleware; this handler parses the
//! body, arms the persistence hook and opens the relay. From then on exactly
//! one interaction-log write happens on every exit path, including a body
//! the transport drops before its first poll.

use crate::services::{ChatTurn, CompletionHook, Transcript};
use crate::state::AppState;
use crate::types::message::parse_optional_body;
use crate::types::{AppError, ChatExchange, ChatRequest};
use crate::web::middleware::SessionId;
use crate::web::sse::event_stream_response;
use axum::{
    extract::{Extension, State},
    response::Response,
};
use bytes::Bytes;

pub async fn chat(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    body: Bytes,
) -> Result<Response, AppError> {
    let request: ChatRequest = parse_optional_body(&body)?;
    let turn = ChatTurn {
        session_id: session.0,
        message: request.message,
        file_name: request.file_name,
        file_content: request.file_content,
    };
    tracing::info!(
        session_id = %turn.session_id,
        message_chars = turn.message.len(),
        has_file = !turn.file_name.is_empty(),
        "💬 chat request"
    );

    let on_close = persistence_hook(&state, turn.clone());
    let stream = state.relay.open(&turn, on_close).await?;
    Ok(event_stream_response(stream.forward()))
}

/// Builds the record from the closed stream and writes it in the background.
/// A failed write is logged and counted, never surfaced.
fn persistence_hook(state: &AppState, turn: ChatTurn) -> CompletionHook {
    let log = state.interactions.clone();
    let metrics = state.metrics.clone();
    let model = state.relay.model().to_string();

    Box::new(move |transcript: Transcript| {
        metrics.record_close(transcript.outcome);

        let record = ChatExchange::new(
            turn.session_id,
            turn.message,
            transcript.text,
            transcript.outcome,
        )
        .with_attachment(&turn.file_name, &turn.file_content)
        .with_model(&model)
        .with_fragments(transcript.fragments);

        let write = async move {
            let session_id = record.session_id.clone();
            let outcome = record.outcome;
            match log.insert(record).await {
                Ok(()) => tracing::debug!(%session_id, %outcome, "interaction saved"),
                Err(e) => {
                    metrics.record_persist_failure();
                    tracing::error!(%session_id, error = %e, "Error saving interaction to the log");
                }
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(write);
            }
            Err(_) => tracing::error!("no async runtime to save interaction on"),
        }
    })
}
