//! Command and query handlers.

pub mod conversation;
mod stream_message;

pub use conversation::{
    DeleteConversationCommand, DeleteConversationHandler, GetConversationHandler,
    GetConversationQuery, ListConversationsHandler, ListConversationsQuery,
    RenameConversationCommand, RenameConversationHandler,
};
pub use stream_message::{
    CompletedReply, CompletionOutcome, PreparedTurn, RelayEvent, StreamMessageCommand,
    StreamMessageError, StreamMessageHandler, StreamingHandlerConfig, TurnOutcome, TurnStream,
    ABORTED_MESSAGE, GENERIC_ERROR_MESSAGE,
};
