pub mod interaction_log;
pub mod metrics;
pub mod prompt;
pub mod sets;
pub mod streaming;
pub mod token;
pub mod upstream;

pub use interaction_log::{InteractionLog, JsonlInteractionLog, MemoryInteractionLog};
pub use metrics::{MetricsSnapshot, RelayMetrics};
pub use prompt::PromptTemplates;
pub use sets::{KeyedSetStore, MemorySetBackend, SetBackend, SetStoreError};
pub use streaming::{ChatTurn, CompletionHook, RelayStream, StreamingRelay, Transcript};
pub use token::{IssuedToken, TokenService};
pub use upstream::{
    CompletionProvider, CompletionRequest, FragmentStream, GroqProvider, PromptMessage,
};
