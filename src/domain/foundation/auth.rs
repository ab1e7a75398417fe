//! Authentication types for the domain layer.
//!
//! An `AuthenticatedUser` is what the rest of the crate sees once a session
//! cookie has been resolved by a `SessionValidator`. Nothing here depends on
//! how sessions are stored.

use super::UserId;
use thiserror::Error;

/// The caller behind a validated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// The unique user identifier.
    pub id: UserId,

    /// Display name if the account has one.
    pub display_name: Option<String>,

    /// Email address, when the login provider shared it.
    pub email: Option<String>,
}

impl AuthenticatedUser {
    /// Creates a new authenticated user.
    pub fn new(id: UserId, display_name: Option<String>, email: Option<String>) -> Self {
        Self {
            id,
            display_name,
            email,
        }
    }
}

/// Authentication errors that can occur during session validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// No session cookie, or the id does not match a session.
    #[error("Invalid or missing session")]
    InvalidSession,

    /// The session exists but is past its expiry.
    #[error("Session expired")]
    SessionExpired,

    /// The session points at an account that no longer exists.
    #[error("User not found")]
    UserNotFound,

    /// The session store could not be reached.
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    /// Creates a service unavailable error with a message.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_unavailable_carries_cause() {
        let err = AuthError::service_unavailable("pool timed out");
        assert_eq!(err.to_string(), "Auth service unavailable: pool timed out");
    }
}
