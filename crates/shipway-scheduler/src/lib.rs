//! Shipway Scheduler - cluster scheduling stage
//!
//! Converts a prepared compose specification into a cluster task definition
//! and drives the external scheduler through the [`ClusterScheduler`]
//! capability trait: register the definition, create the service, wait for
//! stability. Failures here are fatal and not automatically rolled back;
//! an already-registered task definition or created service is left in
//! place for operator cleanup.

#![deny(unsafe_code)]

pub mod convert;
pub mod error;
pub mod task;
pub mod traits;

pub use convert::convert_to_task_definition;
pub use error::{Result, ScheduleError};
pub use task::{
    ContainerDefinition, HostEntry, KeyValuePair, LogConfiguration, MountPoint, PortMapping,
    TaskDefinition, UlimitDefinition, Volume, VolumeFrom,
};
pub use traits::ClusterScheduler;
