//! Conversation domain module.
//!
//! A conversation is a titled, owner-scoped thread of user and assistant
//! messages. The relay appends to it one turn at a time.

mod conversation;
mod message;
mod prompt;

pub use conversation::{validate_title, Conversation, MAX_TITLE_LENGTH, PLACEHOLDER_TITLE};
pub use message::{validate_content, Message, Sender};
pub use prompt::{normalize_title, system_instruction, TITLE_INSTRUCTION};
