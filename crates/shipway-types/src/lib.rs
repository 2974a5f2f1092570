//! Shipway Types - identity model for the git-push-to-deploy receiver
//!
//! A push delivers a repository, revision, username, and ref name. Everything
//! the receiver does afterwards is keyed off identities derived from those
//! four values:
//!
//! - **Application**: the logical deployable unit (`{username}`'s `{app_name}`)
//! - **Deployment**: one build/release of an Application at a revision,
//!   uniquely named by `{repository}-{revision[..8]}`
//! - **Image**: a `registry/name:tag` container artifact reference
//! - **Routing identifiers**: hostname-label-safe keys for the routing layer
//!
//! ## Architectural Boundaries
//!
//! - `shipway-types` owns: identity derivation, the deploy event stream types
//! - `shipway-store` owns: persistence of application metadata and history
//! - `shipway-pipeline` owns: sequencing the deployment stages

#![deny(unsafe_code)]

pub mod application;
pub mod deployment;
pub mod events;
pub mod image;
pub mod timestamp;

pub use application::Application;
pub use deployment::Deployment;
pub use events::{DeployEvent, PipelineStage};
pub use image::{Image, ImageError};
pub use timestamp::DeployTimestamp;

use thiserror::Error;

/// Errors raised while deriving identities from push arguments.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("revision must be at least 8 hex characters: {0}")]
    ShortRevision(String),

    #[error("{count} push arguments given, 5 required (repository, revision, username, fingerprint, refname)")]
    MissingArguments { count: usize },
}
