pub mod errors;
pub mod events;
pub mod exchange;
pub mod message;

pub use errors::{AppError, AuthError, StoreError, UpstreamError, ValidationError};
pub use events::StreamOutcome;
pub use exchange::ChatExchange;
pub use message::{
    AddValueRequest, ChatRequest, MessageResponse, SessionResponse, SetQuery, SetValuesResponse,
};
