//! Authentication configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Session cookie settings
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Name of the cookie carrying the session id
    #[serde(default = "default_session_cookie_name")]
    pub session_cookie_name: String,
}

impl AuthConfig {
    /// Validate authentication configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let name = &self.session_cookie_name;
        if name.is_empty() {
            return Err(ValidationError::MissingRequired("SESSION_COOKIE_NAME"));
        }
        let is_token_char = |c: char| c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c);
        if !name.chars().all(is_token_char) {
            return Err(ValidationError::InvalidCookieName);
        }
        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_cookie_name: default_session_cookie_name(),
        }
    }
}

fn default_session_cookie_name() -> String {
    "auth_session".to_string()
}
