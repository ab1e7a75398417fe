//! Adapters - implementations of the port interfaces.

pub mod ai;
pub mod auth;
pub mod http;
pub mod memory;
pub mod postgres;
