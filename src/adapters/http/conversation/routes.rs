//! Axum routes for the completion stream and conversation endpoints.

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{
    delete_conversation, get_conversation, list_conversations, rename_conversation,
    stream_completion, ConversationAppState,
};

/// Creates the streaming completion route.
///
/// Kept apart from the REST routes so request timeouts never cut a stream.
///
/// - POST /completion - Run a turn as server-sent events
pub fn completion_routes() -> Router<ConversationAppState> {
    Router::new().route("/completion", post(stream_completion))
}

/// Creates routes for conversation endpoints.
///
/// - GET /conversations - List conversations
/// - GET /conversations/:id - Conversation with messages
/// - PATCH /conversations/:id - Rename
/// - DELETE /conversations/:id - Soft delete
pub fn conversation_routes() -> Router<ConversationAppState> {
    Router::new()
        .route("/conversations", get(list_conversations))
        .route(
            "/conversations/:id",
            get(get_conversation)
                .patch(rename_conversation)
                .delete(delete_conversation),
        )
}
