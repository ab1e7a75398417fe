//! HTTP middleware for axum.
//!
//! This module contains middleware layers for cross-cutting concerns:
//!
//! - `auth` - Session cookie authentication middleware and extractors

pub mod auth;

pub use auth::{auth_middleware, session_cookie, AuthRejection, AuthState, RequireAuth};
