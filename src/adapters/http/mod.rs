//! HTTP adapters - REST and SSE endpoints.
//!
//! Each area has its own routes and state; `router` assembles them behind
//! the shared middleware stack.

pub mod conversation;
pub mod health;
pub mod middleware;
pub mod router;

pub use conversation::ConversationAppState;
pub use health::HealthState;
pub use router::{create_router, AppState};
