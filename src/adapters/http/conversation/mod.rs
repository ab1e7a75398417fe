//! HTTP adapter for the completion stream and conversation endpoints.

pub mod dto;
pub mod handlers;
pub mod routes;
pub mod streaming;

pub use handlers::{ConversationApiError, ConversationAppState};
pub use routes::{completion_routes, conversation_routes};
pub use streaming::{decode_events, encode_event, DecodeError};
