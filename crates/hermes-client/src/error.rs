//! Error types for Hermes client operations

use thiserror::Error;

/// Result type alias for Hermes client operations
pub type Result<T> = std::result::Result<T, HermesClientError>;

/// Errors that can occur during Hermes REST operations
#[derive(Error, Debug)]
pub enum HermesClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Server returned an error response
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Credentials were rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Download not found
    #[error("Download not found: {0}")]
    DownloadNotFound(String),

    /// Streaming error
    #[error("Stream error: {0}")]
    StreamError(#[from] crate::streaming::StreamError),
}

impl HermesClientError {
    /// Create a server error from status code and message
    pub fn server_error(status: u16, message: impl Into<String>) -> Self {
        Self::ServerError {
            status,
            message: message.into(),
        }
    }
}
