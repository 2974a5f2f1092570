//! Route registration error types

use shipway_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("failed to write backend record for project {project}: {source}")]
    Backend {
        project: String,
        source: StoreError,
    },

    #[error("failed to write frontend record for identifier {identifier}: {source}")]
    Frontend {
        identifier: String,
        source: StoreError,
    },

    #[error("failed to write server record for project {project}: {source}")]
    Server {
        project: String,
        source: StoreError,
    },

    #[error("failed to remove routes for project {project}: {source}")]
    Deregister {
        project: String,
        source: StoreError,
    },

    #[error("failed to encode route record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result type for routing operations
pub type Result<T> = std::result::Result<T, RouterError>;
