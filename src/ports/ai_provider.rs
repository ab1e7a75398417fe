//! AI Provider Port - Interface for chat-completion providers.
//!
//! The relay talks to completion backends only through this trait, so the
//! OpenAI adapter and the scripted mock are interchangeable.
//!
//! # Design
//!
//! - Streaming and non-streaming completions share one request type
//! - Streaming calls take a `CancellationToken`; once it fires the stream
//!   yields `AIError::Cancelled` and ends, and the upstream request is dropped
//! - Error variants name the failure modes callers react to differently

use async_trait::async_trait;
use futures::{stream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

use crate::domain::conversation::Sender;
use crate::domain::foundation::{ConversationId, UserId};

/// Boxed stream of completion chunks.
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, AIError>> + Send>>;

/// Port for chat-completion providers.
#[async_trait]
pub trait AIProvider: Send + Sync {
    /// Generate a single completion (non-streaming).
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError>;

    /// Generate a streaming completion.
    ///
    /// Chunks arrive in provider order. The stream ends after a final chunk,
    /// an error, or cancellation of `cancel`.
    async fn stream_complete(
        &self,
        request: CompletionRequest,
        cancel: CancellationToken,
    ) -> Result<CompletionStream, AIError>;

    /// Get provider information (name, default model).
    fn provider_info(&self) -> ProviderInfo;
}

/// Request for AI completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Ordered messages, system instruction first.
    pub messages: Vec<Message>,
    /// Overrides the provider's default model for this call.
    pub model: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Temperature for response randomness (0.0 = deterministic, 1.0+ = creative).
    pub temperature: Option<f32>,
    /// Request metadata for tracing and abuse attribution.
    pub metadata: RequestMetadata,
}

impl CompletionRequest {
    /// Creates a new completion request with required metadata.
    pub fn new(metadata: RequestMetadata) -> Self {
        Self {
            messages: Vec::new(),
            model: None,
            max_tokens: None,
            temperature: None,
            metadata,
        }
    }

    /// Replaces the whole message list.
    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    /// Sets the model override.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Sets the temperature.
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }
}

/// A message in the provider request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message.
    pub role: MessageRole,
    /// Message content.
    pub content: String,
}

impl Message {
    /// Creates a new message.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Role of the message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions (guides model behavior).
    System,
    /// User input.
    User,
    /// Assistant (model) response.
    Assistant,
}

impl From<Sender> for MessageRole {
    fn from(sender: Sender) -> Self {
        match sender {
            Sender::User => MessageRole::User,
            Sender::Assistant => MessageRole::Assistant,
        }
    }
}

/// Request metadata for tracing and abuse attribution.
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    /// User making the request. Forwarded to the provider as the end-user id.
    pub user_id: UserId,
    /// Conversation the request belongs to.
    pub conversation_id: ConversationId,
    /// Trace ID for distributed tracing.
    pub trace_id: String,
}

impl RequestMetadata {
    /// Creates new request metadata.
    pub fn new(user_id: UserId, conversation_id: ConversationId, trace_id: impl Into<String>) -> Self {
        Self {
            user_id,
            conversation_id,
            trace_id: trace_id.into(),
        }
    }
}

/// Response from AI completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated content.
    pub content: String,
    /// Token usage.
    pub usage: TokenUsage,
    /// Model that generated the response.
    pub model: String,
    /// Why the model stopped generating.
    pub finish_reason: FinishReason,
}

/// Token usage reported by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub prompt_tokens: u32,
    /// Tokens in the completion.
    pub completion_tokens: u32,
    /// Total tokens (prompt + completion).
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Creates new token usage.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Reason the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop (end of response).
    Stop,
    /// Hit max_tokens limit.
    Length,
    /// Content was filtered for safety.
    ContentFilter,
    /// An error occurred.
    Error,
}

/// Streaming chunk from AI completion.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamChunk {
    /// New content in this chunk.
    pub delta: String,
    /// If present, generation is complete.
    pub finish_reason: Option<FinishReason>,
    /// Token usage (only present on final chunk).
    pub usage: Option<TokenUsage>,
}

impl StreamChunk {
    /// Creates a content chunk.
    pub fn content(delta: impl Into<String>) -> Self {
        Self {
            delta: delta.into(),
            finish_reason: None,
            usage: None,
        }
    }

    /// Creates a final chunk with usage information.
    pub fn final_chunk(finish_reason: FinishReason, usage: TokenUsage) -> Self {
        Self {
            delta: String::new(),
            finish_reason: Some(finish_reason),
            usage: Some(usage),
        }
    }

    /// Returns true if this is the final chunk.
    pub fn is_final(&self) -> bool {
        self.finish_reason.is_some()
    }
}

/// Identifies the backend behind the port, for startup logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInfo {
    /// Provider name (e.g., "openai").
    pub name: String,
    /// Default model identifier (e.g., "gpt-4o-mini").
    pub model: String,
}

impl ProviderInfo {
    /// Creates new provider info.
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
        }
    }
}

/// AI provider errors.
#[derive(Debug, thiserror::Error)]
pub enum AIError {
    /// Rate limited by provider.
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until retry is allowed.
        retry_after_secs: u32,
    },

    /// Context (prompt + history) exceeds model limit.
    #[error("context too long: {message}")]
    ContextTooLong {
        /// Provider explanation.
        message: String,
    },

    /// Content was filtered for safety.
    #[error("content filtered: {reason}")]
    ContentFiltered {
        /// Reason for filtering.
        reason: String,
    },

    /// Provider is unavailable.
    #[error("provider unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// API key or authentication failed.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Network error during request.
    #[error("network error: {0}")]
    Network(String),

    /// Failed to parse provider response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid request configuration.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Request timed out.
    #[error("request timed out after {timeout_secs}s")]
    Timeout {
        /// Configured timeout.
        timeout_secs: u32,
    },

    /// The caller cancelled the request. Not a provider fault.
    #[error("request cancelled")]
    Cancelled,
}

impl AIError {
    /// Creates a rate limited error.
    pub fn rate_limited(retry_after_secs: u32) -> Self {
        Self::RateLimited { retry_after_secs }
    }

    /// Creates a context too long error.
    pub fn context_too_long(message: impl Into<String>) -> Self {
        Self::ContextTooLong {
            message: message.into(),
        }
    }

    /// Creates a content filtered error.
    pub fn content_filtered(reason: impl Into<String>) -> Self {
        Self::ContentFiltered {
            reason: reason.into(),
        }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Returns true if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AIError::RateLimited { .. }
                | AIError::Unavailable { .. }
                | AIError::Network(_)
                | AIError::Timeout { .. }
        )
    }

    /// Returns true if the error came from cancellation rather than the provider.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AIError::Cancelled)
    }
}

/// Wraps a chunk stream so it stops as soon as `cancel` fires.
///
/// The token is checked before every read. On cancellation the inner stream
/// is dropped (closing the upstream connection), a single
/// `Err(AIError::Cancelled)` is yielded, and the stream ends.
pub fn cancellable<S>(inner: S, cancel: CancellationToken) -> CompletionStream
where
    S: Stream<Item = Result<StreamChunk, AIError>> + Send + 'static,
{
    let inner: CompletionStream = Box::pin(inner);
    Box::pin(stream::unfold(Some(inner), move |state| {
        let cancel = cancel.clone();
        async move {
            let mut inner = state?;
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                item = inner.next() => Some(item),
            };
            match next {
                None => Some((Err(AIError::Cancelled), None)),
                Some(item) => item.map(|item| (item, Some(inner))),
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_metadata() -> RequestMetadata {
        RequestMetadata::new(UserId::new("test-user").unwrap(), ConversationId::new(), "trace-123")
    }

    #[test]
    fn completion_request_builder_works() {
        let request = CompletionRequest::new(test_metadata())
            .with_messages(vec![Message::system("Be helpful"), Message::user("Hello")])
            .with_model("gpt-4o-mini")
            .with_max_tokens(100)
            .with_temperature(0.7);

        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, MessageRole::System);
        assert_eq!(request.messages[1].content, "Hello");
        assert_eq!(request.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(request.max_tokens, Some(100));
        assert_eq!(request.temperature, Some(0.7));
    }

    #[test]
    fn sender_maps_to_message_role() {
        assert_eq!(MessageRole::from(Sender::User), MessageRole::User);
        assert_eq!(MessageRole::from(Sender::Assistant), MessageRole::Assistant);
    }

    #[test]
    fn token_usage_calculates_total() {
        let usage = TokenUsage::new(100, 50);
        assert_eq!(usage.total_tokens, 150);
    }

    #[test]
    fn stream_chunk_final_has_usage() {
        let usage = TokenUsage::new(10, 5);
        let chunk = StreamChunk::final_chunk(FinishReason::Stop, usage.clone());

        assert!(chunk.is_final());
        assert_eq!(chunk.delta, "");
        assert_eq!(chunk.usage, Some(usage));
        assert!(!StreamChunk::content("Hello").is_final());
    }

    #[test]
    fn ai_error_retryable_classification() {
        assert!(AIError::rate_limited(30).is_retryable());
        assert!(AIError::unavailable("down").is_retryable());
        assert!(AIError::network("reset").is_retryable());
        assert!(AIError::Timeout { timeout_secs: 30 }.is_retryable());

        assert!(!AIError::AuthenticationFailed.is_retryable());
        assert!(!AIError::context_too_long("too big").is_retryable());
        assert!(!AIError::content_filtered("bad").is_retryable());
        assert!(!AIError::Cancelled.is_retryable());
        assert!(AIError::Cancelled.is_cancelled());
    }

    #[test]
    fn message_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&MessageRole::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&MessageRole::System).unwrap(), "\"system\"");
    }

    #[tokio::test]
    async fn cancellable_passes_items_through_when_not_cancelled() {
        let inner = stream::iter(vec![Ok(StreamChunk::content("a")), Ok(StreamChunk::content("b"))]);
        let chunks: Vec<_> = cancellable(inner, CancellationToken::new()).collect().await;

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].as_ref().unwrap().delta, "b");
    }

    #[tokio::test]
    async fn cancellable_stops_with_cancelled_error() {
        let cancel = CancellationToken::new();
        let inner = stream::iter(vec![Ok(StreamChunk::content("a"))])
            .chain(stream::pending());
        let mut wrapped = cancellable(inner, cancel.clone());

        assert_eq!(wrapped.next().await.unwrap().unwrap().delta, "a");

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        assert!(matches!(wrapped.next().await, Some(Err(AIError::Cancelled))));
        assert!(wrapped.next().await.is_none());
    }

    #[tokio::test]
    async fn cancellable_checks_token_before_reading() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let inner = stream::iter(vec![Ok(StreamChunk::content("never"))]);
        let mut wrapped = cancellable(inner, cancel);

        assert!(matches!(wrapped.next().await, Some(Err(AIError::Cancelled))));
        assert!(wrapped.next().await.is_none());
    }
}
