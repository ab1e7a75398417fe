//! Session validation port.
//!
//! Resolves the opaque id carried in the session cookie to the account it
//! belongs to. Sign-in flows that create sessions live elsewhere; this port
//! only reads them.

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};

/// Resolves session ids to authenticated users.
///
/// # Contract
///
/// Implementations must:
/// - Return `AuthError::InvalidSession` for unknown ids
/// - Return `AuthError::SessionExpired` when the session is past its expiry
/// - Return `AuthError::ServiceUnavailable` for transient backend errors
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Validate a session id taken from the session cookie.
    async fn validate(&self, session_id: &str) -> Result<AuthenticatedUser, AuthError>;
}
