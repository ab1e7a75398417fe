//! HTTP handlers for the completion stream and conversation endpoints.
//!
//! These handlers connect Axum routes to application layer operations.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Form, Json, Path, State};
use axum::http::{header, StatusCode};
use axum::response::sse::{KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;

use crate::adapters::http::middleware::RequireAuth;
use crate::application::{
    ConversationSummaryView, ConversationView, DeleteConversationCommand,
    DeleteConversationHandler, GetConversationHandler, GetConversationQuery,
    ListConversationsHandler, ListConversationsQuery, RenameConversationCommand,
    RenameConversationHandler, StreamMessageCommand, StreamMessageError, StreamMessageHandler,
};
use crate::domain::foundation::{ConversationId, DomainError, ErrorCode};
use crate::ports::ConversationRepository;

use super::dto::{CompletionForm, ErrorResponse, RenameConversationRequest, RenameConversationResponse};
use super::streaming::to_sse_event;

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state for conversation handlers.
#[derive(Clone)]
pub struct ConversationAppState {
    pub relay: StreamMessageHandler,
    pub repository: Arc<dyn ConversationRepository>,
}

impl ConversationAppState {
    pub fn new(relay: StreamMessageHandler, repository: Arc<dyn ConversationRepository>) -> Self {
        Self { relay, repository }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// POST /api/completion
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/completion - Run one turn and stream it as server-sent events.
///
/// The user message is stored before the stream opens. Closing the
/// connection cancels the provider call.
///
/// # Errors
/// - 400 Bad Request: Empty or oversized content, malformed id
/// - 401 Unauthorized: No valid session
/// - 404 Not Found: Conversation missing, deleted, or owned by someone else
/// - 500 Internal Server Error: The user message could not be stored
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn stream_completion(
    State(state): State<ConversationAppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<CompletionForm>,
) -> Result<Response, ConversationApiError> {
    let conversation_id = form
        .conversation_id()
        .map_err(ConversationApiError::BadRequest)?;

    let turn = state
        .relay
        .prepare(StreamMessageCommand::new(user.id, conversation_id, form.content))
        .await?;

    let events = state.relay.start(turn).filter_map(|event| async move {
        match to_sse_event(&event) {
            Ok(sse) => Some(Ok::<_, Infallible>(sse)),
            Err(e) => {
                tracing::error!("Failed to encode {} event: {}", event.name(), e);
                None
            }
        }
    });

    let headers = [
        (header::CACHE_CONTROL, "no-cache"),
        (header::CONNECTION, "keep-alive"),
    ];
    Ok((headers, Sse::new(events).keep_alive(KeepAlive::default())).into_response())
}

// ════════════════════════════════════════════════════════════════════════════════
// GET /api/conversations
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/conversations - List the caller's conversations, newest first.
pub async fn list_conversations(
    State(state): State<ConversationAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, ConversationApiError> {
    let conversations = ListConversationsHandler::new(state.repository.clone())
        .handle(ListConversationsQuery { user_id: user.id })
        .await?;

    let views: Vec<ConversationSummaryView> = conversations
        .iter()
        .map(ConversationSummaryView::from)
        .collect();
    Ok(Json(views))
}

// ════════════════════════════════════════════════════════════════════════════════
// GET /api/conversations/:id
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/conversations/:id - Get a conversation with its messages.
///
/// # Errors
/// - 400 Bad Request: Malformed id
/// - 401 Unauthorized: No valid session
/// - 404 Not Found: Conversation missing, deleted, or owned by someone else
pub async fn get_conversation(
    State(state): State<ConversationAppState>,
    RequireAuth(user): RequireAuth,
    Path(conversation_id): Path<String>,
) -> Result<impl IntoResponse, ConversationApiError> {
    let conversation_id = parse_conversation_id(&conversation_id)?;

    let conversation = GetConversationHandler::new(state.repository.clone())
        .handle(GetConversationQuery {
            conversation_id,
            user_id: user.id,
        })
        .await?;

    Ok(Json(ConversationView::from(&conversation)))
}

// ════════════════════════════════════════════════════════════════════════════════
// PATCH /api/conversations/:id
// ════════════════════════════════════════════════════════════════════════════════

/// PATCH /api/conversations/:id - Rename a conversation.
pub async fn rename_conversation(
    State(state): State<ConversationAppState>,
    RequireAuth(user): RequireAuth,
    Path(conversation_id): Path<String>,
    Json(request): Json<RenameConversationRequest>,
) -> Result<impl IntoResponse, ConversationApiError> {
    let conversation_id = parse_conversation_id(&conversation_id)?;

    let title = RenameConversationHandler::new(state.repository.clone())
        .handle(RenameConversationCommand {
            conversation_id,
            user_id: user.id,
            title: request.title,
        })
        .await?;

    Ok(Json(RenameConversationResponse {
        id: conversation_id,
        title,
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// DELETE /api/conversations/:id
// ════════════════════════════════════════════════════════════════════════════════

/// DELETE /api/conversations/:id - Soft-delete a conversation.
pub async fn delete_conversation(
    State(state): State<ConversationAppState>,
    RequireAuth(user): RequireAuth,
    Path(conversation_id): Path<String>,
) -> Result<impl IntoResponse, ConversationApiError> {
    let conversation_id = parse_conversation_id(&conversation_id)?;

    DeleteConversationHandler::new(state.repository.clone())
        .handle(DeleteConversationCommand {
            conversation_id,
            user_id: user.id,
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

fn parse_conversation_id(raw: &str) -> Result<ConversationId, ConversationApiError> {
    raw.parse()
        .map_err(|_| ConversationApiError::BadRequest("Invalid conversation ID format".to_string()))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type for conversation endpoints.
#[derive(Debug)]
pub enum ConversationApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<DomainError> for ConversationApiError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => ConversationApiError::BadRequest(err.message),
            ErrorCode::ConversationNotFound => ConversationApiError::NotFound(err.message),
            _ => ConversationApiError::Internal(err.to_string()),
        }
    }
}

impl From<StreamMessageError> for ConversationApiError {
    fn from(err: StreamMessageError) -> Self {
        match err {
            StreamMessageError::InvalidContent(e) => ConversationApiError::BadRequest(e.to_string()),
            StreamMessageError::ConversationNotFound => {
                ConversationApiError::NotFound(DomainError::conversation_not_found().message)
            }
            StreamMessageError::Repository(e) => ConversationApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ConversationApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ConversationApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorResponse::bad_request(msg))
            }
            ConversationApiError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, ErrorResponse::not_found(msg))
            }
            ConversationApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::internal("An internal error occurred"),
                )
            }
        };

        (status, Json(error)).into_response()
    }
}
