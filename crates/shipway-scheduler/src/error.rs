//! Scheduling stage error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("expected [[ip:]host:]container, could not parse port mapping: {0}")]
    PortMapping(String),

    #[error("expected [container:]name[:ro|rw], could not parse volumes_from entry: {0}")]
    VolumesFrom(String),

    #[error("expected [host:]container[:ro|rw], could not parse volume entry: {0}")]
    Volume(String),

    #[error("expected ro or rw, got volume access mode: {0}")]
    AccessMode(String),

    #[error("expected hostname:ip, could not parse extra_hosts entry: {0}")]
    ExtraHost(String),

    #[error("scheduler {operation} failed: {message}")]
    Scheduler {
        operation: &'static str,
        message: String,
    },
}

impl ScheduleError {
    pub fn scheduler(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Scheduler {
            operation,
            message: message.into(),
        }
    }
}

/// Result type for scheduling operations
pub type Result<T> = std::result::Result<T, ScheduleError>;
