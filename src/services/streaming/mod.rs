//! Streaming relay and per-request transcript

mod relay;
mod transcript;

pub use relay::{ChatTurn, RelayStream, StreamingRelay};
pub use transcript::{CompletionHook, Transcript, TranscriptGuard};
