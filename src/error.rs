//! Error types.
//!
//! The cache layer itself never fails; these cover configuration and the
//! MongoDB handle factory.

use thiserror::Error;

/// Problems reading configuration from the environment.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid value for {var}: '{value}' ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Failures building a backend handle.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Invalid MongoDB connection string")]
    InvalidUri(#[source] mongodb::error::Error),

    #[error("Failed to create MongoDB client for role '{role}'")]
    Client {
        role: String,
        #[source]
        source: mongodb::error::Error,
    },
}
