//! Server-level error types.

use sipahi_core::{BoxError, RegistryError};
use thiserror::Error;

/// Top-level error type for server setup and lifecycle operations.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Handler or hook registration failed.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// The configuration is incomplete or invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The transport refused a service or failed to bind or shut down.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// Setup is frozen once the server listens.
    #[error("server is already listening")]
    AlreadyListening,

    /// The server is not listening.
    #[error("server is not listening")]
    NotListening,

    /// The server was closed and cannot be reused.
    #[error("server is closed")]
    Closed,
}

/// Errors in server or logger configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `listen` was called without a port.
    #[error("a port is required to listen")]
    MissingPort,

    /// The log level name is not recognized.
    #[error("invalid log level: {0}")]
    InvalidLevel(String),
}
