//! Common error types for core models

use thiserror::Error;

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while validating core models
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Scope string does not match any known channel
    #[error("Invalid scope format: {0}. Must be 'download:<id>', 'queue', or 'stats'")]
    InvalidScope(String),

    /// Download scope without a download id
    #[error("Download scope must include a download id")]
    EmptyDownloadId,
}
