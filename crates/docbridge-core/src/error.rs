//! Error types for docbridge.

use thiserror::Error;

/// Result type alias using docbridge's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for docbridge operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Resource not found (document, tag, action)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Inference service returned a non-success status
    #[error("Inference error: {0}")]
    Inference(String),

    /// Inference reply did not match the expected schema
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

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
}

impl Error {
    /// True for failures caused by an upstream service (store or inference).
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::Request(_) | Error::Inference(_) | Error::MalformedResponse(_)
        )
    }
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
