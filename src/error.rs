//! Error types for Trellis.
//!
//! Defines the main error enum used throughout the application.

use thiserror::Error;

/// Main error type for Trellis operations.
#[derive(Error, Debug)]
pub enum TrellisError {
    /// Required connection fields were not supplied for the chosen backend.
    ///
    /// Lists every missing field, not just the first one found.
    #[error("Configuration error: missing required field(s) for {backend}: {}", .fields.join(", "))]
    MissingFields {
        /// Backend the parameters were resolved for.
        backend: String,
        /// Names of all missing fields, in declaration order.
        fields: Vec<&'static str>,
    },

    /// Configuration errors (invalid config file, duplicate ids, bad URLs, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection errors (host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Errors raised by a backend while running a statement or metadata query.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Connection list persistence errors (file I/O, malformed JSON).
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Field encryption or key handling errors.
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TrellisError {
    /// Creates a missing-fields configuration error.
    pub fn missing_fields(backend: impl Into<String>, fields: Vec<&'static str>) -> Self {
        Self::MissingFields {
            backend: backend.into(),
            fields,
        }
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a backend error with the given message.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Creates a persistence error with the given message.
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Creates a crypto error with the given message.
    pub fn crypto(msg: impl Into<String>) -> Self {
        Self::Crypto(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::MissingFields { .. } | Self::Config(_) => "Configuration Error",
            Self::Connection(_) => "Connection Error",
            Self::Backend(_) => "Backend Error",
            Self::Persistence(_) => "Persistence Error",
            Self::Crypto(_) => "Crypto Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns true for errors that should block a new connection from
    /// being accepted and re-prompt the user.
    pub fn blocks_new_connection(&self) -> bool {
        matches!(
            self,
            Self::MissingFields { .. } | Self::Config(_) | Self::Connection(_)
        )
    }
}

/// Result type alias using TrellisError.
pub type Result<T> = std::result::Result<T, TrellisError>;
