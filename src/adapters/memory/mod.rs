//! In-memory adapters for tests and single-process demos.

mod conversation_repository;

pub use conversation_repository::{InMemoryConversationRepository, RepositoryFault};
