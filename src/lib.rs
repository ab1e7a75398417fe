//! Chat Relay - streaming chat completions over persisted conversations.
//!
//! An authenticated user posts a message; the relay stores it, streams the
//! provider's reply back as server-sent events, and stores the reply once it
//! is complete.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
