//! Streaming message handler.
//!
//! Runs one conversational turn: the user's message is stored before anything
//! is streamed, provider fragments are relayed as they arrive, and the
//! assistant's reply is stored only once the provider stream has finished
//! cleanly. Client disconnects cancel the in-flight provider call.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::application::views::{ConversationView, MessageView};
use crate::domain::conversation::{
    normalize_title, system_instruction, validate_content, Conversation, Message, Sender,
    PLACEHOLDER_TITLE, TITLE_INSTRUCTION,
};
use crate::domain::foundation::{
    ConversationId, DomainError, Timestamp, UserId, ValidationError,
};
use crate::ports::{
    AIError, AIProvider, CompletionRequest, ConversationRepository, ConversationUpdate,
    FinishReason, Message as ProviderMessage, RequestMetadata, TokenUsage,
};

/// User-facing text for any provider or storage failure.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";

/// User-facing text for a cancelled turn.
pub const ABORTED_MESSAGE: &str = "Request was aborted";

/// Command to send a message and receive a streaming response.
#[derive(Debug, Clone)]
pub struct StreamMessageCommand {
    /// The authenticated user sending the message.
    pub user_id: UserId,
    /// Target conversation. `None` starts a new one.
    pub conversation_id: Option<ConversationId>,
    /// The message content.
    pub content: String,
}

impl StreamMessageCommand {
    /// Creates a new stream message command.
    pub fn new(
        user_id: UserId,
        conversation_id: Option<ConversationId>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            conversation_id,
            content: content.into(),
        }
    }
}

/// Errors raised before the event stream is opened.
#[derive(Debug, Clone, Error)]
pub enum StreamMessageError {
    #[error("Invalid message content: {0}")]
    InvalidContent(#[from] ValidationError),

    #[error("Conversation is not found")]
    ConversationNotFound,

    #[error("Repository error: {0}")]
    Repository(DomainError),
}

impl From<DomainError> for StreamMessageError {
    fn from(err: DomainError) -> Self {
        if err.is_not_found() {
            StreamMessageError::ConversationNotFound
        } else {
            StreamMessageError::Repository(err)
        }
    }
}

/// Events pushed to the client during a turn, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum RelayEvent {
    /// Only when the turn created the conversation.
    NewConversation { conversation: ConversationView },
    /// The stored user message.
    UserMsg { message: MessageView },
    /// One fragment of the assistant's reply.
    Msg { content: String },
    /// The stored assistant message. Terminal on success.
    AssistantMsg { message: MessageView },
    Error { message: String },
    Aborted { message: String },
}

impl RelayEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            RelayEvent::NewConversation { .. } => "new-conversation",
            RelayEvent::UserMsg { .. } => "user-msg",
            RelayEvent::Msg { .. } => "msg",
            RelayEvent::AssistantMsg { .. } => "assistant-msg",
            RelayEvent::Error { .. } => "error",
            RelayEvent::Aborted { .. } => "aborted",
        }
    }

    fn error() -> Self {
        RelayEvent::Error {
            message: GENERIC_ERROR_MESSAGE.to_string(),
        }
    }

    fn aborted() -> Self {
        RelayEvent::Aborted {
            message: ABORTED_MESSAGE.to_string(),
        }
    }
}

/// A provider stream that ended without error.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedReply {
    /// Full reply text, concatenated from every fragment.
    pub text: String,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<TokenUsage>,
}

/// How the provider call ended.
#[derive(Debug)]
pub enum CompletionOutcome {
    Completed(CompletedReply),
    Aborted,
    Failed(AIError),
}

impl From<AIError> for CompletionOutcome {
    fn from(err: AIError) -> Self {
        if err.is_cancelled() {
            CompletionOutcome::Aborted
        } else {
            CompletionOutcome::Failed(err)
        }
    }
}

/// How a whole turn ended.
#[derive(Debug)]
pub enum TurnOutcome {
    /// The assistant message was stored and announced.
    Completed(Message),
    Aborted,
    /// The provider stream failed. Nothing was stored for the assistant.
    CompletionFailed(AIError),
    /// The reply reached the client but could not be stored.
    PersistFailed(DomainError),
}

/// A turn whose user message is already stored.
#[derive(Debug, Clone)]
pub struct PreparedTurn {
    user_id: UserId,
    conversation: Conversation,
    created: bool,
    user_message: Message,
}

impl PreparedTurn {
    pub fn conversation_id(&self) -> ConversationId {
        self.conversation.id()
    }

    /// True when this turn created the conversation.
    pub fn is_new_conversation(&self) -> bool {
        self.created
    }

    pub fn user_message(&self) -> &Message {
        &self.user_message
    }
}

/// Client-side end of a running turn.
///
/// Dropping it cancels the turn.
pub struct TurnStream {
    events: ReceiverStream<RelayEvent>,
    _cancel_on_drop: DropGuard,
}

impl Stream for TurnStream {
    type Item = RelayEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

/// Configuration for the streaming handler.
#[derive(Debug, Clone)]
pub struct StreamingHandlerConfig {
    /// Model override for the reply. `None` uses the provider default.
    pub model: Option<String>,
    /// Model override for title generation.
    pub title_model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Events buffered between the turn task and the client.
    pub event_buffer: usize,
}

impl Default for StreamingHandlerConfig {
    fn default() -> Self {
        Self {
            model: None,
            title_model: None,
            temperature: None,
            max_tokens: None,
            event_buffer: 32,
        }
    }
}

/// Handler for streaming message interactions.
#[derive(Clone)]
pub struct StreamMessageHandler {
    repository: Arc<dyn ConversationRepository>,
    ai_provider: Arc<dyn AIProvider>,
    config: StreamingHandlerConfig,
}

impl StreamMessageHandler {
    pub fn new(
        repository: Arc<dyn ConversationRepository>,
        ai_provider: Arc<dyn AIProvider>,
    ) -> Self {
        Self::with_config(repository, ai_provider, StreamingHandlerConfig::default())
    }

    pub fn with_config(
        repository: Arc<dyn ConversationRepository>,
        ai_provider: Arc<dyn AIProvider>,
        config: StreamingHandlerConfig,
    ) -> Self {
        Self {
            repository,
            ai_provider,
            config,
        }
    }

    /// Validates the command, resolves the conversation and stores the user
    /// message. Nothing is streamed and the provider is not called if this
    /// fails.
    pub async fn prepare(
        &self,
        cmd: StreamMessageCommand,
    ) -> Result<PreparedTurn, StreamMessageError> {
        // 1. Validate input
        validate_content(&cmd.content)?;

        // 2. Resolve or create the conversation
        let (mut conversation, created) = match cmd.conversation_id {
            Some(id) => {
                let found = self.repository.find_owned(&id, &cmd.user_id).await?;
                (found.ok_or(StreamMessageError::ConversationNotFound)?, false)
            }
            None => (
                self.repository.create(&cmd.user_id, PLACEHOLDER_TITLE).await?,
                true,
            ),
        };

        // 3. Store the user message before any provider call
        let user_message = self
            .repository
            .add_message(&conversation.id(), Sender::User, &cmd.content)
            .await?;
        conversation.record_message(user_message.clone());

        tracing::debug!(
            conversation_id = %conversation.id(),
            new_conversation = created,
            "User message stored"
        );

        Ok(PreparedTurn {
            user_id: cmd.user_id,
            conversation,
            created,
            user_message,
        })
    }

    /// Spawns the turn and returns its event stream.
    pub fn start(&self, turn: PreparedTurn) -> TurnStream {
        let (tx, rx) = mpsc::channel(self.config.event_buffer.max(1));
        let cancel = CancellationToken::new();
        let guard = cancel.clone().drop_guard();

        let handler = self.clone();
        tokio::spawn(async move {
            handler.run(turn, tx, cancel).await;
        });

        TurnStream {
            events: ReceiverStream::new(rx),
            _cancel_on_drop: guard,
        }
    }

    /// Executes a prepared turn, writing events into `sink`.
    ///
    /// A closed sink counts as cancellation.
    pub async fn run(
        &self,
        turn: PreparedTurn,
        sink: mpsc::Sender<RelayEvent>,
        cancel: CancellationToken,
    ) -> TurnOutcome {
        let conversation_id = turn.conversation_id();

        // 1. Announce what is already stored
        if turn.created {
            let event = RelayEvent::NewConversation {
                conversation: ConversationView::from(&turn.conversation.summary()),
            };
            if !emit(&sink, &cancel, event).await {
                return aborted(&sink, conversation_id).await;
            }
        }
        let event = RelayEvent::UserMsg {
            message: MessageView::from(&turn.user_message),
        };
        if !emit(&sink, &cancel, event).await {
            return aborted(&sink, conversation_id).await;
        }

        // 2. Relay the provider stream
        let messages = provider_messages(&turn.conversation, Timestamp::now());
        let CompletedReply {
            text: reply,
            finish_reason,
            usage,
        } = match self
            .relay_completion(&turn, messages.clone(), &sink, &cancel)
            .await
        {
            CompletionOutcome::Completed(completed) => completed,
            CompletionOutcome::Aborted => return aborted(&sink, conversation_id).await,
            CompletionOutcome::Failed(err) => {
                tracing::error!(
                    code = "ERROR_COMPLETION_STREAM",
                    conversation_id = %conversation_id,
                    error = %err,
                    "Completion stream failed"
                );
                let _ = sink.send(RelayEvent::error()).await;
                return TurnOutcome::CompletionFailed(err);
            }
        };

        // 3. Title only for conversations created by this turn
        let mut update = ConversationUpdate::touch(Timestamp::now());
        if turn.created {
            let title = self.generate_title(&turn, messages, &reply, &cancel).await;
            update = update.with_title(title);
        }

        // 4. Final writes
        let (saved, updated) = tokio::join!(
            self.repository
                .add_message(&conversation_id, Sender::Assistant, &reply),
            self.repository
                .update(&conversation_id, &turn.user_id, update),
        );

        if let Err(err) = updated {
            tracing::warn!(
                conversation_id = %conversation_id,
                error = %err,
                "Failed to refresh conversation after turn"
            );
        }

        match saved {
            Ok(message) => {
                let _ = sink
                    .send(RelayEvent::AssistantMsg {
                        message: MessageView::from(&message),
                    })
                    .await;
                if finish_reason == Some(FinishReason::Length) {
                    tracing::warn!(
                        conversation_id = %conversation_id,
                        "Reply was cut off at the token limit"
                    );
                }
                tracing::info!(
                    conversation_id = %conversation_id,
                    reply_chars = reply.chars().count(),
                    finish_reason = ?finish_reason,
                    total_tokens = ?usage.as_ref().map(|u| u.total_tokens),
                    "Turn completed"
                );
                TurnOutcome::Completed(message)
            }
            Err(err) => {
                tracing::error!(
                    code = "ERROR_ASSISTANT_PERSIST",
                    conversation_id = %conversation_id,
                    response_len = reply.len(),
                    error = %err,
                    "Assistant reply was streamed but not stored"
                );
                let _ = sink.send(RelayEvent::error()).await;
                TurnOutcome::PersistFailed(err)
            }
        }
    }

    /// Streams the reply, forwarding each fragment as a `msg` event.
    async fn relay_completion(
        &self,
        turn: &PreparedTurn,
        messages: Vec<ProviderMessage>,
        sink: &mpsc::Sender<RelayEvent>,
        cancel: &CancellationToken,
    ) -> CompletionOutcome {
        let request = self.request(turn, messages, self.config.model.clone());

        let mut stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return CompletionOutcome::Aborted,
            started = self.ai_provider.stream_complete(request, cancel.clone()) => match started {
                Ok(stream) => stream,
                Err(err) => return err.into(),
            },
        };

        let mut reply = String::new();
        let mut finish_reason = None;
        let mut usage = None;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return CompletionOutcome::Aborted,
                next = stream.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    if chunk.is_final() {
                        finish_reason = chunk.finish_reason;
                    }
                    if chunk.usage.is_some() {
                        usage = chunk.usage;
                    }
                    if chunk.delta.is_empty() {
                        continue;
                    }
                    reply.push_str(&chunk.delta);
                    let event = RelayEvent::Msg {
                        content: chunk.delta,
                    };
                    if !emit(sink, cancel, event).await {
                        return CompletionOutcome::Aborted;
                    }
                }
                Some(Err(err)) => return err.into(),
                None => {
                    return CompletionOutcome::Completed(CompletedReply {
                        text: reply,
                        finish_reason,
                        usage,
                    })
                }
            }
        }
    }

    /// Asks the provider for a title. Falls back to the placeholder.
    async fn generate_title(
        &self,
        turn: &PreparedTurn,
        mut messages: Vec<ProviderMessage>,
        reply: &str,
        cancel: &CancellationToken,
    ) -> String {
        messages.push(ProviderMessage::assistant(reply));
        messages.push(ProviderMessage::system(TITLE_INSTRUCTION));
        let model = self
            .config
            .title_model
            .clone()
            .or_else(|| self.config.model.clone());
        let request = self.request(turn, messages, model);

        let generated = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.ai_provider.complete(request) => Some(result),
        };

        match generated {
            Some(Ok(response)) => normalize_title(&response.content).unwrap_or_else(|| {
                tracing::warn!(
                    conversation_id = %turn.conversation_id(),
                    "Title generation returned no usable text"
                );
                PLACEHOLDER_TITLE.to_string()
            }),
            Some(Err(err)) => {
                tracing::warn!(
                    conversation_id = %turn.conversation_id(),
                    error = %err,
                    "Title generation failed"
                );
                PLACEHOLDER_TITLE.to_string()
            }
            None => PLACEHOLDER_TITLE.to_string(),
        }
    }

    fn request(
        &self,
        turn: &PreparedTurn,
        messages: Vec<ProviderMessage>,
        model: Option<String>,
    ) -> CompletionRequest {
        let metadata = RequestMetadata::new(
            turn.user_id.clone(),
            turn.conversation_id(),
            format!("turn-{}", turn.user_message.id()),
        );
        let mut request = CompletionRequest::new(metadata).with_messages(messages);
        if let Some(model) = model {
            request = request.with_model(model);
        }
        if let Some(temperature) = self.config.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.config.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        request
    }
}

/// System instruction, then every stored message in order. The conversation
/// already holds the new user message as its last entry.
fn provider_messages(conversation: &Conversation, now: Timestamp) -> Vec<ProviderMessage> {
    std::iter::once(ProviderMessage::system(system_instruction(now)))
        .chain(
            conversation
                .messages()
                .iter()
                .map(|m| ProviderMessage::new(m.sender().into(), m.content())),
        )
        .collect()
}

/// Sends an event unless the turn is cancelled. A closed receiver cancels it.
async fn emit(
    sink: &mpsc::Sender<RelayEvent>,
    cancel: &CancellationToken,
    event: RelayEvent,
) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    if sink.send(event).await.is_err() {
        cancel.cancel();
        return false;
    }
    true
}

async fn aborted(sink: &mpsc::Sender<RelayEvent>, conversation_id: ConversationId) -> TurnOutcome {
    tracing::info!(conversation_id = %conversation_id, "Turn aborted by client");
    // Best effort: the receiver is usually gone already.
    let _ = sink.try_send(RelayEvent::aborted());
    TurnOutcome::Aborted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::{MockAIProvider, MockError};
    use crate::adapters::memory::{InMemoryConversationRepository, RepositoryFault};
    use crate::ports::MessageRole;
    use std::time::Duration;

    fn alice() -> UserId {
        UserId::new("alice").unwrap()
    }

    struct Fixture {
        repo: Arc<InMemoryConversationRepository>,
        ai: Arc<MockAIProvider>,
        handler: StreamMessageHandler,
    }

    fn fixture(ai: MockAIProvider) -> Fixture {
        let repo = Arc::new(InMemoryConversationRepository::new());
        let ai = Arc::new(ai);
        let handler = StreamMessageHandler::new(repo.clone(), ai.clone());
        Fixture { repo, ai, handler }
    }

    async fn run_to_end(handler: &StreamMessageHandler, turn: PreparedTurn) -> (TurnOutcome, Vec<RelayEvent>) {
        let (tx, mut rx) = mpsc::channel(64);
        let outcome = handler.run(turn, tx, CancellationToken::new()).await;
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (outcome, events)
    }

    fn names(events: &[RelayEvent]) -> Vec<&'static str> {
        events.iter().map(RelayEvent::name).collect()
    }

    #[test]
    fn relay_event_serializes_with_kebab_case_tag() {
        let json = serde_json::to_value(RelayEvent::Msg {
            content: "Hi".to_string(),
        })
        .unwrap();
        assert_eq!(json["event"], "msg");
        assert_eq!(json["data"]["content"], "Hi");

        let json = serde_json::to_value(RelayEvent::aborted()).unwrap();
        assert_eq!(json["event"], "aborted");
        assert_eq!(json["data"]["message"], ABORTED_MESSAGE);
    }

    #[tokio::test]
    async fn prepare_rejects_blank_content_without_writing() {
        let f = fixture(MockAIProvider::new());
        let err = f
            .handler
            .prepare(StreamMessageCommand::new(alice(), None, "   "))
            .await
            .unwrap_err();

        assert!(matches!(err, StreamMessageError::InvalidContent(_)));
        assert_eq!(f.repo.message_count(), 0);
        assert!(f.repo.list_for_owner(&alice()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn prepare_rejects_foreign_conversation() {
        let f = fixture(MockAIProvider::new());
        let theirs = f
            .repo
            .create(&UserId::new("bob").unwrap(), "Bob's")
            .await
            .unwrap();

        let err = f
            .handler
            .prepare(StreamMessageCommand::new(alice(), Some(theirs.id()), "Hi"))
            .await
            .unwrap_err();

        assert!(matches!(err, StreamMessageError::ConversationNotFound));
        assert_eq!(f.repo.message_count(), 0);
        assert_eq!(f.ai.call_count(), 0);
    }

    #[tokio::test]
    async fn user_message_write_failure_leaves_conversation_untouched() {
        let f = fixture(MockAIProvider::new());
        let conv = f.repo.create(&alice(), "Chat").await.unwrap();
        let before = f.repo.get(&conv.id()).unwrap().updated_at();
        f.repo.fail_next(RepositoryFault::AddMessage(Sender::User));

        let err = f
            .handler
            .prepare(StreamMessageCommand::new(alice(), Some(conv.id()), "Hi"))
            .await
            .unwrap_err();

        assert!(matches!(err, StreamMessageError::Repository(_)));
        assert_eq!(f.repo.get(&conv.id()).unwrap().updated_at(), before);
        assert_eq!(f.ai.call_count(), 0);
    }

    #[tokio::test]
    async fn new_conversation_turn_emits_full_sequence_and_titles_it() {
        let f = fixture(
            MockAIProvider::new()
                .with_response("Hello there friend")
                .with_response("\"Friendly greeting.\""),
        );
        let turn = f
            .handler
            .prepare(StreamMessageCommand::new(alice(), None, "Hello"))
            .await
            .unwrap();
        let id = turn.conversation_id();

        let (outcome, events) = run_to_end(&f.handler, turn).await;

        assert!(matches!(outcome, TurnOutcome::Completed(_)));
        assert_eq!(
            names(&events),
            vec!["new-conversation", "user-msg", "msg", "msg", "msg", "assistant-msg"]
        );
        match &events[0] {
            RelayEvent::NewConversation { conversation } => assert_eq!(conversation.id, id),
            other => panic!("unexpected {:?}", other),
        }
        let streamed: String = events
            .iter()
            .filter_map(|e| match e {
                RelayEvent::Msg { content } => Some(content.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(streamed, "Hello there friend");

        let stored = f.repo.get(&id).unwrap();
        assert_eq!(stored.title(), "Friendly greeting");
        assert_eq!(stored.messages().len(), 2);
        assert_eq!(stored.messages()[1].content(), "Hello there friend");
    }

    #[tokio::test]
    async fn request_is_system_then_history_then_new_message() {
        let f = fixture(MockAIProvider::new().with_response("Sure"));
        let conv = f.repo.create(&alice(), "Chat").await.unwrap();
        f.repo.add_message(&conv.id(), Sender::User, "first").await.unwrap();
        f.repo
            .add_message(&conv.id(), Sender::Assistant, "reply")
            .await
            .unwrap();

        let turn = f
            .handler
            .prepare(StreamMessageCommand::new(alice(), Some(conv.id()), "Continue"))
            .await
            .unwrap();
        let (_, events) = run_to_end(&f.handler, turn).await;

        assert_eq!(names(&events).first(), Some(&"user-msg"));
        let calls = f.ai.get_calls();
        assert_eq!(calls.len(), 1, "no title request for an existing conversation");
        let roles: Vec<_> = calls[0].messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                MessageRole::System,
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User
            ]
        );
        assert_eq!(calls[0].messages[3].content, "Continue");
        assert_eq!(calls[0].metadata.user_id, alice());

        let stored = f.repo.get(&conv.id()).unwrap();
        assert_eq!(stored.messages().len(), 4);
        assert_eq!(stored.title(), "Chat");
    }

    #[tokio::test]
    async fn provider_failure_emits_error_and_stores_no_reply() {
        let f = fixture(MockAIProvider::new().with_failure_after(
            ["partial "],
            MockError::Network {
                message: "connection reset".to_string(),
            },
        ));
        let conv = f.repo.create(&alice(), "Chat").await.unwrap();
        let turn = f
            .handler
            .prepare(StreamMessageCommand::new(alice(), Some(conv.id()), "Hi"))
            .await
            .unwrap();

        let (outcome, events) = run_to_end(&f.handler, turn).await;

        assert!(matches!(outcome, TurnOutcome::CompletionFailed(_)));
        assert_eq!(names(&events), vec!["user-msg", "msg", "error"]);
        assert_eq!(
            events.last(),
            Some(&RelayEvent::Error {
                message: GENERIC_ERROR_MESSAGE.to_string()
            })
        );
        let stored = f.repo.get(&conv.id()).unwrap();
        assert_eq!(stored.messages().len(), 1);
        assert_eq!(stored.messages()[0].sender(), Sender::User);
    }

    #[tokio::test]
    async fn provider_rejection_before_streaming_is_an_error_event() {
        let f = fixture(MockAIProvider::new().with_error(MockError::RateLimited {
            retry_after_secs: 5,
        }));
        let turn = f
            .handler
            .prepare(StreamMessageCommand::new(alice(), None, "Hi"))
            .await
            .unwrap();

        let (_, events) = run_to_end(&f.handler, turn).await;

        assert_eq!(names(&events), vec!["new-conversation", "user-msg", "error"]);
        assert_eq!(f.repo.message_count(), 1);
    }

    #[tokio::test]
    async fn assistant_persist_failure_is_reported_after_streaming() {
        let f = fixture(MockAIProvider::new().with_response("All good"));
        let conv = f.repo.create(&alice(), "Chat").await.unwrap();
        let turn = f
            .handler
            .prepare(StreamMessageCommand::new(alice(), Some(conv.id()), "Hi"))
            .await
            .unwrap();
        f.repo.fail_next(RepositoryFault::AddMessage(Sender::Assistant));

        let (outcome, events) = run_to_end(&f.handler, turn).await;

        assert!(matches!(outcome, TurnOutcome::PersistFailed(_)));
        assert_eq!(names(&events), vec!["user-msg", "msg", "msg", "error"]);
        assert_eq!(f.repo.message_count(), 1);
    }

    #[tokio::test]
    async fn conversation_update_failure_still_completes_turn() {
        let f = fixture(MockAIProvider::new().with_response("Fine"));
        let conv = f.repo.create(&alice(), "Chat").await.unwrap();
        let turn = f
            .handler
            .prepare(StreamMessageCommand::new(alice(), Some(conv.id()), "Hi"))
            .await
            .unwrap();
        f.repo.fail_next(RepositoryFault::Update);

        let (outcome, events) = run_to_end(&f.handler, turn).await;

        assert!(matches!(outcome, TurnOutcome::Completed(_)));
        assert_eq!(names(&events).last(), Some(&"assistant-msg"));
    }

    #[tokio::test]
    async fn failed_title_generation_keeps_placeholder() {
        let f = fixture(
            MockAIProvider::new()
                .with_response("Answer")
                .with_error(MockError::Unavailable {
                    message: "down".to_string(),
                }),
        );
        let turn = f
            .handler
            .prepare(StreamMessageCommand::new(alice(), None, "Question"))
            .await
            .unwrap();
        let id = turn.conversation_id();

        let (outcome, _) = run_to_end(&f.handler, turn).await;

        assert!(matches!(outcome, TurnOutcome::Completed(_)));
        assert_eq!(f.repo.get(&id).unwrap().title(), PLACEHOLDER_TITLE);
    }

    #[tokio::test]
    async fn empty_generated_title_keeps_placeholder() {
        let f = fixture(MockAIProvider::new().with_response("x").with_response(""));
        let turn = f
            .handler
            .prepare(StreamMessageCommand::new(alice(), None, "Question"))
            .await
            .unwrap();
        let id = turn.conversation_id();

        let (outcome, events) = run_to_end(&f.handler, turn).await;

        assert!(matches!(outcome, TurnOutcome::Completed(_)));
        assert_eq!(names(&events).last(), Some(&"assistant-msg"));
        assert_eq!(f.repo.get(&id).unwrap().title(), PLACEHOLDER_TITLE);
    }

    #[tokio::test]
    async fn completed_reply_carries_finish_reason_and_usage() {
        let f = fixture(MockAIProvider::new().with_truncated_response("Cut short"));
        let conv = f.repo.create(&alice(), "Chat").await.unwrap();
        let turn = f
            .handler
            .prepare(StreamMessageCommand::new(alice(), Some(conv.id()), "Hi"))
            .await
            .unwrap();

        let (tx, _rx) = mpsc::channel(64);
        let outcome = f
            .handler
            .relay_completion(&turn, Vec::new(), &tx, &CancellationToken::new())
            .await;

        let CompletionOutcome::Completed(reply) = outcome else {
            panic!("expected a completed reply, got {:?}", outcome);
        };
        assert_eq!(reply.text, "Cut short");
        assert_eq!(reply.finish_reason, Some(FinishReason::Length));
        assert_eq!(reply.usage, Some(TokenUsage::new(10, 2)));
    }

    #[tokio::test]
    async fn cancellation_after_reply_is_stored_changes_nothing() {
        let f = fixture(MockAIProvider::new().with_response("All done"));
        let conv = f.repo.create(&alice(), "Chat").await.unwrap();
        let turn = f
            .handler
            .prepare(StreamMessageCommand::new(alice(), Some(conv.id()), "Hi"))
            .await
            .unwrap();

        let (tx, mut rx) = mpsc::channel(64);
        let cancel = CancellationToken::new();
        let handler = f.handler.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move { handler.run(turn, tx, token).await });

        while let Some(event) = rx.recv().await {
            if matches!(event, RelayEvent::AssistantMsg { .. }) {
                break;
            }
        }
        let stored = f.repo.get(&conv.id()).unwrap();
        cancel.cancel();

        let outcome = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(outcome, TurnOutcome::Completed(_)));
        assert!(rx.recv().await.is_none());
        assert_eq!(stored.messages().len(), 2);
        assert_eq!(f.repo.get(&conv.id()).unwrap(), stored);
    }

    #[tokio::test]
    async fn cancellation_mid_stream_stops_provider_and_skips_persist() {
        let f = fixture(MockAIProvider::new().with_stall_after(["Thinking "]));
        let conv = f.repo.create(&alice(), "Chat").await.unwrap();
        let turn = f
            .handler
            .prepare(StreamMessageCommand::new(alice(), Some(conv.id()), "Hi"))
            .await
            .unwrap();

        let (tx, mut rx) = mpsc::channel(64);
        let cancel = CancellationToken::new();
        let handler = f.handler.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move { handler.run(turn, tx, token).await });

        assert_eq!(rx.recv().await.map(|e| e.name()), Some("user-msg"));
        assert_eq!(rx.recv().await.map(|e| e.name()), Some("msg"));
        cancel.cancel();

        let outcome = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(outcome, TurnOutcome::Aborted));
        assert_eq!(rx.recv().await.map(|e| e.name()), Some("aborted"));
        assert!(f.ai.was_cancelled());
        assert_eq!(f.repo.get(&conv.id()).unwrap().messages().len(), 1);
    }

    #[tokio::test]
    async fn dropping_turn_stream_cancels_the_turn() {
        let f = fixture(MockAIProvider::new().with_stall_after(["Thinking "]));
        let turn = f
            .handler
            .prepare(StreamMessageCommand::new(alice(), None, "Hi"))
            .await
            .unwrap();
        let id = turn.conversation_id();

        let mut stream = f.handler.start(turn);
        assert_eq!(stream.next().await.map(|e| e.name()), Some("new-conversation"));
        assert_eq!(stream.next().await.map(|e| e.name()), Some("user-msg"));
        assert_eq!(stream.next().await.map(|e| e.name()), Some("msg"));
        drop(stream);

        tokio::time::timeout(Duration::from_secs(5), async {
            while !f.ai.was_cancelled() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(f.repo.get(&id).unwrap().messages().len(), 1);
    }
}
