//! RenameConversationHandler - Command handler for renaming conversations.

use std::sync::Arc;

use crate::domain::conversation::validate_title;
use crate::domain::foundation::{ConversationId, DomainError, UserId};
use crate::ports::{ConversationRepository, ConversationUpdate};

/// Command to rename a conversation.
#[derive(Debug, Clone)]
pub struct RenameConversationCommand {
    pub conversation_id: ConversationId,
    pub user_id: UserId,
    pub title: String,
}

/// Handler for renaming conversations. Leaves `updated_at` alone.
pub struct RenameConversationHandler {
    repository: Arc<dyn ConversationRepository>,
}

impl RenameConversationHandler {
    pub fn new(repository: Arc<dyn ConversationRepository>) -> Self {
        Self { repository }
    }

    /// Returns the stored title.
    pub async fn handle(&self, cmd: RenameConversationCommand) -> Result<String, DomainError> {
        let title = validate_title(&cmd.title)?;

        self.repository
            .update(
                &cmd.conversation_id,
                &cmd.user_id,
                ConversationUpdate::default().with_title(title.clone()),
            )
            .await?;

        Ok(title)
    }
}
