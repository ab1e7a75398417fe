//! Client-facing representations of conversations and messages.
//!
//! Shared by the relay's event payloads and the JSON endpoints. Owner and
//! soft-delete markers never leave the server.

use serde::{Deserialize, Serialize};

use crate::domain::conversation::{Conversation, Message, Sender};
use crate::domain::foundation::{ConversationId, MessageId, Timestamp};

/// A persisted message as the client sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender: Sender,
    pub content: String,
    pub created_at: Timestamp,
}

impl From<&Message> for MessageView {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id(),
            conversation_id: message.conversation_id(),
            sender: message.sender(),
            content: message.content().to_string(),
            created_at: message.created_at(),
        }
    }
}

/// A conversation with its messages in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    pub id: ConversationId,
    pub title: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub messages: Vec<MessageView>,
}

impl From<&Conversation> for ConversationView {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id(),
            title: conversation.title().to_string(),
            created_at: conversation.created_at(),
            updated_at: conversation.updated_at(),
            messages: conversation.messages().iter().map(MessageView::from).collect(),
        }
    }
}

/// Sidebar entry for the conversation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummaryView {
    pub id: ConversationId,
    pub title: String,
    pub updated_at: Timestamp,
}

impl From<&Conversation> for ConversationSummaryView {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id(),
            title: conversation.title().to_string(),
            updated_at: conversation.updated_at(),
        }
    }
}
