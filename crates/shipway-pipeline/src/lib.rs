//! Shipway Pipeline - deployment orchestration
//!
//! One push runs one pipeline instance, sequenced strictly:
//!
//! ```text
//! Unpacked → SpecPrepared → Built → Pushed → Scheduled
//!          → HealthChecked → Registered → Cleaned
//! ```
//!
//! `Failed` is reachable from every stage; no stage retries. The only
//! compensating action is stopping the cluster service when a failure
//! occurs after it was created. Earlier failures leave no cluster-side
//! state behind, and partially written router records from a failed
//! registration are not cleaned up.
//!
//! Before a new deployment is admitted, the per-application history is
//! rotated: while it holds at least the configured maximum of entries,
//! the oldest deployment is stopped, deregistered, and dropped.

#![deny(unsafe_code)]

pub mod error;
pub mod pipeline;
pub mod rotation;

pub use error::{PipelineError, Result};
pub use pipeline::{DeployOutcome, DeploymentPipeline, EventSink, PipelineConfig};
pub use rotation::DeploymentRotator;
