//! Deploy event stream
//!
//! The pipeline reports progress through a structured event stream instead
//! of printing from business logic; the receiver binary renders events for
//! the pushing user's terminal.

use serde::{Deserialize, Serialize};

use crate::Image;

/// Orchestrator states. `Failed` is reachable from every stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Unpacked,
    SpecPrepared,
    Built,
    Pushed,
    Scheduled,
    HealthChecked,
    Registered,
    Cleaned,
    Failed,
}

impl PipelineStage {
    /// True once a cluster service exists, i.e. a failure from here on
    /// requires the compensating stop.
    pub fn service_created(&self) -> bool {
        matches!(
            self,
            Self::Scheduled | Self::HealthChecked | Self::Registered | Self::Cleaned
        )
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unpacked => "unpacked",
            Self::SpecPrepared => "spec-prepared",
            Self::Built => "built",
            Self::Pushed => "pushed",
            Self::Scheduled => "scheduled",
            Self::HealthChecked => "health-checked",
            Self::Registered => "registered",
            Self::Cleaned => "cleaned",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Events emitted while a push is deployed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DeployEvent {
    /// A pipeline stage began.
    StageStarted { stage: PipelineStage },

    /// One line of external builder output.
    BuildOutput { service: String, line: String },

    /// An image finished building.
    ImageBuilt { image: Image },

    /// An image was pushed to the registry.
    ImagePushed { image: Image },

    /// The task definition was registered with the scheduler.
    TaskDefinitionRegistered { arn: String },

    /// The cluster service was created.
    ServiceCreated { service_ref: String },

    /// A health-check attempt is about to run.
    HealthCheckAttempt { path: String, attempt: u32 },

    /// Routing records were written; one URL per identifier follows.
    RoutesRegistered { identifiers: Vec<String> },

    /// An old deployment was evicted to stay under the retention cap.
    DeploymentEvicted {
        project_name: String,
        timestamp: String,
    },
}
