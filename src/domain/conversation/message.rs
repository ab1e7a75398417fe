//! Message entity for conversations.
//!
//! Messages are immutable once created. Ordering within a conversation is by
//! `created_at` ascending.

use crate::domain::foundation::{ConversationId, MessageId, Timestamp, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// Text typed by the account owner.
    User,
    /// Text produced by the completion provider.
    Assistant,
}

impl Sender {
    /// Storage and wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sender {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Sender::User),
            "assistant" => Ok(Sender::Assistant),
            other => Err(ValidationError::invalid_format(
                "sender",
                format!("unknown sender '{}'", other),
            )),
        }
    }
}

/// An immutable message within a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    id: MessageId,
    conversation_id: ConversationId,
    sender: Sender,
    content: String,
    created_at: Timestamp,
}

impl Message {
    /// Creates a message stamped with a fresh id and the current time.
    pub fn new(conversation_id: ConversationId, sender: Sender, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id,
            sender,
            content: content.into(),
            created_at: Timestamp::now(),
        }
    }

    /// Reconstitutes a message from persistence (no validation).
    pub fn reconstitute(
        id: MessageId,
        conversation_id: ConversationId,
        sender: Sender,
        content: String,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            conversation_id,
            sender,
            content,
            created_at,
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }
}

/// Checks user-submitted content before anything is written.
///
/// Content must contain non-whitespace text. The text itself is stored
/// untouched.
pub fn validate_content(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::empty_field("content"));
    }
    Ok(())
}
