//! Storage error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Reference not found: {0}")]
    NotFound(String),

    #[error("Invalid reference {path}: {message}")]
    InvalidReference { path: PathBuf, message: String },

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound(key.into())
    }

    pub fn invalid_reference(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidReference {
            path: path.into(),
            message: message.into(),
        }
    }
}
