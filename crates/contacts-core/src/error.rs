//! Error types for the contact directory
//!
//! Every rejection in the mutation pipeline is a local, synchronous failure
//! returned as a value. Nothing here is used for control flow across tasks.

use thiserror::Error;

/// Result type alias for contact directory operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the contact directory
#[derive(Error, Debug)]
pub enum Error {
    /// A contact field is empty
    #[error("Invalid contact: {0}")]
    Validation(String),

    /// Duplicate add, or the update target already exists
    #[error("Contact conflict: {0}")]
    Conflict(String),

    /// The contact to update does not exist
    #[error("Contact not found: {0}")]
    NotFound(String),

    /// The pipeline has begun shutting down
    #[error("Contact directory is shutting down")]
    Shutdown,

    /// Payload-level parse failure (empty input, not a top-level array)
    #[error("Invalid payload: {0}")]
    Payload(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors (payload files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a payload error
    pub fn payload(msg: impl Into<String>) -> Self {
        Self::Payload(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this is one of the store's local rejections
    ///
    /// Rejections leave the store untouched and never produce an event.
    /// Bulk loads skip them instead of aborting.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Conflict(_) | Self::NotFound(_)
        )
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
