//! DeleteConversationHandler - Command handler for soft-deleting conversations.

use std::sync::Arc;

use crate::domain::foundation::{ConversationId, DomainError, UserId};
use crate::ports::ConversationRepository;

/// Command to delete a conversation.
#[derive(Debug, Clone)]
pub struct DeleteConversationCommand {
    pub conversation_id: ConversationId,
    pub user_id: UserId,
}

/// Handler for deleting conversations. Rows are kept with `deleted_at` set.
pub struct DeleteConversationHandler {
    repository: Arc<dyn ConversationRepository>,
}

impl DeleteConversationHandler {
    pub fn new(repository: Arc<dyn ConversationRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, cmd: DeleteConversationCommand) -> Result<(), DomainError> {
        self.repository
            .soft_delete(&cmd.conversation_id, &cmd.user_id)
            .await?;

        tracing::info!(conversation_id = %cmd.conversation_id, "Conversation deleted");
        Ok(())
    }
}
