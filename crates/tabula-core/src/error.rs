//! Error types for tabula.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias using tabula's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for tabula operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Chat not found
    #[error("Chat not found: {0}")]
    ChatNotFound(Uuid),

    /// Board item not found
    #[error("Board item not found: {0}")]
    ItemNotFound(Uuid),

    /// Transcription job not found
    #[error("Transcription job not found: {0}")]
    JobNotFound(Uuid),

    /// Chat message not found
    #[error("Message not found: {0}")]
    MessageNotFound(Uuid),

    /// Board item exists but no transcription job references it
    #[error("No transcription job for item: {0}")]
    NoJobForItem(Uuid),

    /// A connection between the same unordered node pair already exists
    #[error("Connection already exists between {from} and {to}")]
    ConnectionExists { from: Uuid, to: Uuid },

    /// Single provider inference failure
    #[error("Inference error: {0}")]
    Inference(String),

    /// Every provider in the fallback chain failed
    #[error("All {providers} providers failed, last error: {last}")]
    AllProvidersFailed { providers: usize, last: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
