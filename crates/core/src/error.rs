//! Core Error Types
//!
//! The error taxonomy shared by every scanlens crate. Variants carry plain
//! strings so the type is `Clone`: a single-flight refresh hands the same
//! outcome to every waiter.

use thiserror::Error;

/// Core error type for the scanlens workspace.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Requested uuid/result is absent upstream or in a local cache
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation invoked in a mode/state where it is undefined
    #[error("Invalid state: {0}")]
    State(String),

    /// A raw result carries an unrecognized discriminant
    #[error("Unknown result type: {0}")]
    UnknownResultType(String),

    /// Transport failure during submit/fetch/stream
    #[error("Network error: {0}")]
    Network(String),

    /// Malformed response body or stream frame
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a state error
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the error stems from a caller sequencing mistake rather than
    /// from the remote side.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::State(_) | Self::UnknownResultType(_))
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Convert CoreError to a user-visible message
impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}
