//! GetConversationHandler - Query handler for one conversation with its messages.

use std::sync::Arc;

use crate::domain::conversation::Conversation;
use crate::domain::foundation::{ConversationId, DomainError, UserId};
use crate::ports::ConversationRepository;

/// Query to get a conversation by ID.
#[derive(Debug, Clone)]
pub struct GetConversationQuery {
    pub conversation_id: ConversationId,
    pub user_id: UserId,
}

/// Handler for retrieving a conversation.
pub struct GetConversationHandler {
    repository: Arc<dyn ConversationRepository>,
}

impl GetConversationHandler {
    pub fn new(repository: Arc<dyn ConversationRepository>) -> Self {
        Self { repository }
    }

    /// Foreign and deleted conversations are reported as not found.
    pub async fn handle(&self, query: GetConversationQuery) -> Result<Conversation, DomainError> {
        self.repository
            .find_owned(&query.conversation_id, &query.user_id)
            .await?
            .ok_or_else(DomainError::conversation_not_found)
    }
}
