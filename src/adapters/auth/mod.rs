//! Authentication adapters.
//!
//! - `mock` - In-memory session table for tests and local runs
//!
//! The Postgres-backed validator lives in `adapters::postgres`.

mod mock;

pub use mock::MockSessionValidator;
