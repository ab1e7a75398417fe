//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Pool acquire timeout must be at least one second")]
    InvalidAcquireTimeout,

    #[error("Pool acquire timeout must be shorter than the request timeout")]
    AcquireTimeoutExceedsRequestTimeout,

    #[error("At least one database connection attempt is required")]
    InvalidConnectAttempts,

    #[error("Temperature must be between 0.0 and 2.0")]
    InvalidTemperature,

    #[error("The mock AI provider cannot be used in production")]
    MockProviderInProduction,

    #[error("Invalid session cookie name")]
    InvalidCookieName,
}
