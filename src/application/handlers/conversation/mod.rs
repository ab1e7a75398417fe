//! Conversation command and query handlers.

mod delete_conversation;
mod get_conversation;
mod list_conversations;
mod rename_conversation;

pub use delete_conversation::{DeleteConversationCommand, DeleteConversationHandler};
pub use get_conversation::{GetConversationHandler, GetConversationQuery};
pub use list_conversations::{ListConversationsHandler, ListConversationsQuery};
pub use rename_conversation::{RenameConversationCommand, RenameConversationHandler};
