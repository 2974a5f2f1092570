//! Store error types

use thiserror::Error;

/// Metadata store errors, annotated with the failing operation and key.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store {operation} failed for key {key}: {message}")]
    Operation {
        operation: &'static str,
        key: String,
        message: String,
    },

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("application not registered: {username}/{app_name}")]
    AppNotRegistered { username: String, app_name: String },
}

impl StoreError {
    pub fn operation(operation: &'static str, key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Operation {
            operation,
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
