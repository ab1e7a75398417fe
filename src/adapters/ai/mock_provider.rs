//! Mock AI Provider for testing.
//!
//! Provides a scripted implementation of the AIProvider port so the relay can
//! be exercised without calling a real completion API.
//!
//! # Features
//!
//! - Pre-configured responses, consumed in call order across `complete` and
//!   `stream_complete`
//! - Streams that fail part way through, or stall until cancelled
//! - Simulated per-chunk delays
//! - Call and cancellation-token tracking for verification
//!
//! # Example
//!
//! ```ignore
//! let provider = MockAIProvider::new()
//!     .with_response("Hello there")       // streamed reply
//!     .with_response("Greeting");         // generated title
//! ```

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::ports::{
    cancellable, AIError, AIProvider, CompletionRequest, CompletionResponse, CompletionStream,
    FinishReason, ProviderInfo, StreamChunk, TokenUsage,
};

const MOCK_MODEL: &str = "mock-model-1";

/// Mock AI provider for testing.
#[derive(Debug, Clone)]
pub struct MockAIProvider {
    /// Pre-configured responses (consumed in order).
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    /// Simulated latency before each streamed chunk.
    chunk_delay: Duration,
    /// Call history for verification.
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
    /// Cancellation tokens handed to `stream_complete`.
    tokens: Arc<Mutex<Vec<CancellationToken>>>,
}

/// A configured mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return a successful completion, streamed word by word.
    Success {
        content: String,
        finish_reason: FinishReason,
    },
    /// Fail before any chunk is produced.
    Error(MockError),
    /// Stream `fragments`, then fail.
    FailMidStream {
        fragments: Vec<String>,
        error: MockError,
    },
    /// Stream `fragments`, then wait forever (until cancelled).
    Stall { fragments: Vec<String> },
}

/// Mock error types for testing error handling.
#[derive(Debug, Clone)]
pub enum MockError {
    /// Simulate rate limiting.
    RateLimited { retry_after_secs: u32 },
    /// Simulate context too long.
    ContextTooLong,
    /// Simulate provider unavailable.
    Unavailable { message: String },
    /// Simulate authentication failure.
    AuthenticationFailed,
    /// Simulate network error.
    Network { message: String },
}

impl From<MockError> for AIError {
    fn from(err: MockError) -> Self {
        match err {
            MockError::RateLimited { retry_after_secs } => AIError::rate_limited(retry_after_secs),
            MockError::ContextTooLong => AIError::context_too_long("mock context limit"),
            MockError::Unavailable { message } => AIError::unavailable(message),
            MockError::AuthenticationFailed => AIError::AuthenticationFailed,
            MockError::Network { message } => AIError::network(message),
        }
    }
}

impl Default for MockAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAIProvider {
    /// Creates a new mock provider with default settings.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            chunk_delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
            tokens: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Adds a successful response to the queue.
    pub fn with_response(self, content: impl Into<String>) -> Self {
        self.push(MockResponse::Success {
            content: content.into(),
            finish_reason: FinishReason::Stop,
        })
    }

    /// Adds a response that stops at the token limit.
    pub fn with_truncated_response(self, content: impl Into<String>) -> Self {
        self.push(MockResponse::Success {
            content: content.into(),
            finish_reason: FinishReason::Length,
        })
    }

    /// Adds an error response to the queue.
    pub fn with_error(self, error: MockError) -> Self {
        self.push(MockResponse::Error(error))
    }

    /// Adds a stream that emits `fragments` and then fails with `error`.
    pub fn with_failure_after<I, S>(self, fragments: I, error: MockError) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(MockResponse::FailMidStream {
            fragments: fragments.into_iter().map(Into::into).collect(),
            error,
        })
    }

    /// Adds a stream that emits `fragments` and then never finishes.
    pub fn with_stall_after<I, S>(self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(MockResponse::Stall {
            fragments: fragments.into_iter().map(Into::into).collect(),
        })
    }

    /// Sets simulated latency before each streamed chunk.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Returns the number of calls made to this provider.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Returns all recorded calls.
    pub fn get_calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// True once any token passed to `stream_complete` has been cancelled.
    pub fn was_cancelled(&self) -> bool {
        self.tokens.lock().unwrap().iter().any(|t| t.is_cancelled())
    }

    fn push(self, response: MockResponse) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    /// Gets the next response or a default.
    fn next_response(&self) -> MockResponse {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| MockResponse::Success {
                content: "Mock response".to_string(),
                finish_reason: FinishReason::Stop,
            })
    }

    fn delayed(
        &self,
        chunks: Vec<Result<StreamChunk, AIError>>,
    ) -> impl futures::Stream<Item = Result<StreamChunk, AIError>> + Send + 'static {
        let delay = self.chunk_delay;
        stream::iter(chunks).then(move |chunk| async move {
            if !delay.is_zero() {
                sleep(delay).await;
            }
            chunk
        })
    }
}

/// Splits text into word-sized fragments whose concatenation is the input.
fn word_fragments(content: &str) -> Vec<String> {
    content.split_inclusive(' ').map(str::to_string).collect()
}

#[async_trait]
impl AIProvider for MockAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        self.calls.lock().unwrap().push(request);

        match self.next_response() {
            MockResponse::Success {
                content,
                finish_reason,
            } => Ok(CompletionResponse {
                usage: TokenUsage::new(10, content.split_whitespace().count() as u32),
                content,
                model: MOCK_MODEL.to_string(),
                finish_reason,
            }),
            MockResponse::Error(err) | MockResponse::FailMidStream { error: err, .. } => {
                Err(err.into())
            }
            MockResponse::Stall { .. } => std::future::pending().await,
        }
    }

    async fn stream_complete(
        &self,
        request: CompletionRequest,
        cancel: CancellationToken,
    ) -> Result<CompletionStream, AIError> {
        self.calls.lock().unwrap().push(request);
        self.tokens.lock().unwrap().push(cancel.clone());

        let stream: CompletionStream = match self.next_response() {
            MockResponse::Success {
                content,
                finish_reason,
            } => {
                let usage = TokenUsage::new(10, content.split_whitespace().count() as u32);
                let mut chunks: Vec<_> = word_fragments(&content)
                    .into_iter()
                    .map(|f| Ok(StreamChunk::content(f)))
                    .collect();
                chunks.push(Ok(StreamChunk::final_chunk(finish_reason, usage)));
                Box::pin(self.delayed(chunks))
            }
            MockResponse::Error(err) => return Err(err.into()),
            MockResponse::FailMidStream { fragments, error } => {
                let mut chunks: Vec<_> = fragments
                    .into_iter()
                    .map(|f| Ok(StreamChunk::content(f)))
                    .collect();
                chunks.push(Err(error.into()));
                Box::pin(self.delayed(chunks))
            }
            MockResponse::Stall { fragments } => {
                let chunks = fragments
                    .into_iter()
                    .map(|f| Ok(StreamChunk::content(f)))
                    .collect();
                Box::pin(self.delayed(chunks).chain(stream::pending()))
            }
        };

        Ok(cancellable(stream, cancel))
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo::new("mock", MOCK_MODEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{ConversationId, UserId};
    use crate::ports::{Message, RequestMetadata};

    fn test_request() -> CompletionRequest {
        let metadata =
            RequestMetadata::new(UserId::new("test-user").unwrap(), ConversationId::new(), "trace-123");
        CompletionRequest::new(metadata).with_messages(vec![Message::user("Hello")])
    }

    async fn collect_text(mut stream: CompletionStream) -> (String, Option<AIError>) {
        let mut text = String::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => text.push_str(&chunk.delta),
                Err(err) => return (text, Some(err)),
            }
        }
        (text, None)
    }

    #[tokio::test]
    async fn returns_responses_in_order_then_default() {
        let provider = MockAIProvider::new().with_response("First").with_response("Second");

        assert_eq!(provider.complete(test_request()).await.unwrap().content, "First");
        assert_eq!(provider.complete(test_request()).await.unwrap().content, "Second");
        assert_eq!(provider.complete(test_request()).await.unwrap().content, "Mock response");
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn streaming_fragments_concatenate_to_content() {
        let provider = MockAIProvider::new().with_response("Hello  world\nfrom the mock");

        let stream = provider
            .stream_complete(test_request(), CancellationToken::new())
            .await
            .unwrap();
        let (text, err) = collect_text(stream).await;

        assert_eq!(text, "Hello  world\nfrom the mock");
        assert!(err.is_none());
    }

    #[tokio::test]
    async fn streaming_error_is_returned_before_any_chunk() {
        let provider = MockAIProvider::new().with_error(MockError::Unavailable {
            message: "Service down".to_string(),
        });

        let result = provider
            .stream_complete(test_request(), CancellationToken::new())
            .await;

        assert!(matches!(result, Err(AIError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn fail_mid_stream_yields_fragments_then_error() {
        let provider = MockAIProvider::new()
            .with_failure_after(["Par", "tial"], MockError::RateLimited { retry_after_secs: 5 });

        let stream = provider
            .stream_complete(test_request(), CancellationToken::new())
            .await
            .unwrap();
        let (text, err) = collect_text(stream).await;

        assert_eq!(text, "Partial");
        assert!(matches!(err, Some(AIError::RateLimited { retry_after_secs: 5 })));
    }

    #[tokio::test]
    async fn stalled_stream_ends_on_cancellation() {
        let provider = MockAIProvider::new().with_stall_after(["Thinking"]);
        let cancel = CancellationToken::new();

        let mut stream = provider
            .stream_complete(test_request(), cancel.clone())
            .await
            .unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap().delta, "Thinking");

        cancel.cancel();
        assert!(matches!(stream.next().await, Some(Err(AIError::Cancelled))));
        assert!(stream.next().await.is_none());
        assert!(provider.was_cancelled());
    }

    #[test]
    fn reports_itself_as_mock() {
        assert_eq!(MockAIProvider::new().provider_info().name, "mock");
    }
}
