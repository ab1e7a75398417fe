//! Conversation repository port.
//!
//! Defines the contract for storing conversations and their messages.
//!
//! # Design
//!
//! - **Owner-scoped**: every lookup and write takes the caller's `UserId` and
//!   only matches rows that belong to them and are not soft-deleted
//! - **Append-only messages**: messages are created, never updated
//! - **No row locks**: concurrent turns on one conversation may interleave
//!   their `updated_at` and title writes

use crate::domain::conversation::{Conversation, Message, Sender};
use crate::domain::foundation::{ConversationId, DomainError, Timestamp, UserId};
use async_trait::async_trait;

/// Fields a scoped update may change. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationUpdate {
    pub title: Option<String>,
    pub updated_at: Option<Timestamp>,
}

impl ConversationUpdate {
    /// Refreshes only the last-updated marker.
    pub fn touch(at: Timestamp) -> Self {
        Self {
            title: None,
            updated_at: Some(at),
        }
    }

    /// Sets the title (and optionally the last-updated marker).
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.updated_at.is_none()
    }
}

/// Repository port for conversations and messages.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Create a conversation for `owner` with the given title.
    ///
    /// The returned conversation has an empty message list.
    async fn create(&self, owner: &UserId, title: &str) -> Result<Conversation, DomainError>;

    /// Find a conversation visible to `owner`, including its messages in
    /// creation order.
    ///
    /// Returns `None` if it does not exist, belongs to someone else, or has
    /// been soft-deleted.
    async fn find_owned(
        &self,
        id: &ConversationId,
        owner: &UserId,
    ) -> Result<Option<Conversation>, DomainError>;

    /// Conversations visible to `owner`, most recently updated first.
    ///
    /// Messages are not loaded.
    async fn list_for_owner(&self, owner: &UserId) -> Result<Vec<Conversation>, DomainError>;

    /// Append a message to a conversation.
    ///
    /// Returns the stored message with its server-assigned id and timestamp.
    ///
    /// # Errors
    ///
    /// - `ConversationNotFound` if the conversation doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn add_message(
        &self,
        conversation_id: &ConversationId,
        sender: Sender,
        content: &str,
    ) -> Result<Message, DomainError>;

    /// Apply `update` to a conversation visible to `owner`.
    ///
    /// # Errors
    ///
    /// - `ConversationNotFound` if no visible row matched
    /// - `DatabaseError` on persistence failure
    async fn update(
        &self,
        id: &ConversationId,
        owner: &UserId,
        update: ConversationUpdate,
    ) -> Result<(), DomainError>;

    /// Soft-delete a conversation visible to `owner`.
    ///
    /// # Errors
    ///
    /// - `ConversationNotFound` if no visible row matched
    /// - `DatabaseError` on persistence failure
    async fn soft_delete(&self, id: &ConversationId, owner: &UserId) -> Result<(), DomainError>;
}
