//! Mock session validator for tests and local runs.
//!
//! # Example
//!
//! ```ignore
//! use chat_relay::adapters::auth::MockSessionValidator;
//!
//! let validator = MockSessionValidator::new().with_test_user("sess-abc", "user-123");
//! let user = validator.validate("sess-abc").await?;
//! ```

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::SessionValidator;

/// Mock session validator.
///
/// Stores a map of session ids to users. Unknown ids return `InvalidSession`.
#[derive(Debug, Default)]
pub struct MockSessionValidator {
    /// Map of valid session ids to their users
    sessions: RwLock<HashMap<String, AuthenticatedUser>>,
    /// Optional error to return for all validations (for error testing)
    force_error: RwLock<Option<AuthError>>,
}

impl MockSessionValidator {
    /// Creates a new empty mock validator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a valid session that maps to a user.
    pub fn with_user(self, session_id: impl Into<String>, user: AuthenticatedUser) -> Self {
        self.add_session(session_id, user);
        self
    }

    /// Adds a valid session for a user with the given id and generated profile.
    pub fn with_test_user(self, session_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        let user = AuthenticatedUser::new(
            UserId::new(&user_id).expect("test user id must not be empty"),
            Some(format!("Test User {}", user_id)),
            Some(format!("{}@test.example.com", user_id)),
        );
        self.with_user(session_id, user)
    }

    /// Forces all validations to return the specified error.
    pub fn with_error(self, error: AuthError) -> Self {
        *self.force_error.write().unwrap() = Some(error);
        self
    }

    /// Registers a new valid session at runtime.
    pub fn add_session(&self, session_id: impl Into<String>, user: AuthenticatedUser) {
        self.sessions.write().unwrap().insert(session_id.into(), user);
    }

    /// Removes a session, making it invalid.
    pub fn revoke(&self, session_id: &str) {
        self.sessions.write().unwrap().remove(session_id);
    }
}

#[async_trait]
impl SessionValidator for MockSessionValidator {
    async fn validate(&self, session_id: &str) -> Result<AuthenticatedUser, AuthError> {
        if let Some(error) = self.force_error.read().unwrap().clone() {
            return Err(error);
        }

        self.sessions
            .read()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or(AuthError::InvalidSession)
    }
}
