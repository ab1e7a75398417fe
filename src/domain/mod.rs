//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, auth, errors)
//! - `conversation` - Conversations, messages, and prompt text
pub mod conversation;
pub mod foundation;
