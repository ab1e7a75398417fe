//! Data Transfer Objects for conversation endpoints.
//!
//! Response bodies reuse the application views; this module adds request
//! shapes and the error envelope.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ConversationId;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Form body of `POST /api/completion`.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionForm {
    /// Existing conversation. Absent or empty starts a new one.
    #[serde(default)]
    pub id: Option<String>,
    pub content: String,
}

impl CompletionForm {
    /// Parses the optional conversation id. Blank means "new conversation".
    pub fn conversation_id(&self) -> Result<Option<ConversationId>, String> {
        match self.id.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| "Invalid conversation ID format".to_string()),
        }
    }
}

/// Request to rename a conversation.
#[derive(Debug, Clone, Deserialize)]
pub struct RenameConversationRequest {
    pub title: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Response after a rename.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameConversationResponse {
    pub id: ConversationId,
    pub title: String,
}

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: "BAD_REQUEST".to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            code: "NOT_FOUND".to_string(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
        }
    }
}
