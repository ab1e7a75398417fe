//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the application and the outside world. Adapters implement these ports.
//!
//! - `AIProvider` - Streaming and one-shot chat completions
//! - `ConversationRepository` - Owner-scoped conversation and message storage
//! - `SessionValidator` - Session cookie to user resolution

mod ai_provider;
mod conversation_repository;
mod session_validator;

pub use ai_provider::{
    cancellable, AIError, AIProvider, CompletionRequest, CompletionResponse, CompletionStream,
    FinishReason, Message, MessageRole, ProviderInfo, RequestMetadata, StreamChunk, TokenUsage,
};
pub use conversation_repository::{ConversationRepository, ConversationUpdate};
pub use session_validator::SessionValidator;
