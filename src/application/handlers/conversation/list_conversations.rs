//! ListConversationsHandler - Query handler for the caller's conversation list.

use std::sync::Arc;

use crate::domain::conversation::Conversation;
use crate::domain::foundation::{DomainError, UserId};
use crate::ports::ConversationRepository;

/// Query to list a user's conversations.
#[derive(Debug, Clone)]
pub struct ListConversationsQuery {
    pub user_id: UserId,
}

/// Handler for listing conversations, most recently updated first.
pub struct ListConversationsHandler {
    repository: Arc<dyn ConversationRepository>,
}

impl ListConversationsHandler {
    pub fn new(repository: Arc<dyn ConversationRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(
        &self,
        query: ListConversationsQuery,
    ) -> Result<Vec<Conversation>, DomainError> {
        self.repository.list_for_owner(&query.user_id).await
    }
}
