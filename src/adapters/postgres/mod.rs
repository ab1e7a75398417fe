//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `create_pool` - Pool construction with startup retries
//! - `PostgresConversationRepository` - Conversations and messages
//! - `PostgresSessionValidator` - Session table lookups for the auth middleware

mod conversation_repository;
mod pool;
mod session_validator;

pub use conversation_repository::PostgresConversationRepository;
pub use pool::{create_pool, run_migrations};
pub use session_validator::PostgresSessionValidator;
