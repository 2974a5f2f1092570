//! Pipeline error aggregation
//!
//! Stage crates carry their own error types; the orchestrator aggregates
//! them so the receiver reports one formatted failure per push.

use std::path::PathBuf;

use thiserror::Error;

use shipway_build::BuildError;
use shipway_compose::ComposeError;
use shipway_router::RouterError;
use shipway_scheduler::ScheduleError;
use shipway_store::StoreError;
use shipway_types::IdentityError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("docker-compose.yml was not found in {0}")]
    ComposeFileMissing(PathBuf),

    #[error("deployment {service} failed its health check")]
    Unhealthy { service: String },

    #[error("failed to clean workspace {path}: {source}")]
    Cleanup {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Router(#[from] RouterError),
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
