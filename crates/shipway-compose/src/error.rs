//! Compose error types

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("failed to parse compose file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("compose file {path} is not a mapping or uses an unsupported schema shape")]
    UnsupportedShape { path: PathBuf },

    #[error("failed to read or write compose file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for compose operations
pub type Result<T> = std::result::Result<T, ComposeError>;
