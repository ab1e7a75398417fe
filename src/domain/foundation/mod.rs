//! Foundation module - Shared domain primitives.
//!
//! Identifiers, timestamps, authentication types, and the error vocabulary
//! shared by every layer of the relay.

mod auth;
mod errors;
mod ids;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{ConversationId, MessageId, UserId};
pub use timestamp::Timestamp;
