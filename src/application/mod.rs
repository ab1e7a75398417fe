//! Application layer - Commands, Queries, and Handlers.
//!
//! Orchestrates the domain through the ports. The streaming relay lives here;
//! transports only translate its events.

pub mod handlers;
pub mod views;

pub use handlers::{
    // Conversation handlers
    DeleteConversationCommand, DeleteConversationHandler, GetConversationHandler,
    GetConversationQuery, ListConversationsHandler, ListConversationsQuery,
    RenameConversationCommand, RenameConversationHandler,
    // Streaming relay
    CompletedReply, CompletionOutcome, PreparedTurn, RelayEvent, StreamMessageCommand,
    StreamMessageError, StreamMessageHandler, StreamingHandlerConfig, TurnOutcome, TurnStream,
};
pub use views::{ConversationSummaryView, ConversationView, MessageView};
