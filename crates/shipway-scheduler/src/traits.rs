//! Cluster scheduler capability trait

use async_trait::async_trait;

use crate::error::Result;
use crate::task::TaskDefinition;

/// The external cluster scheduler the deployment runs on.
///
/// Implementations wrap the cluster control plane; the deployment pipeline
/// only depends on this trait, never on a concrete backend.
#[async_trait]
pub trait ClusterScheduler: Send + Sync {
    /// Register a task definition revision, returning its identifier (ARN).
    async fn register_task_definition(&self, definition: &TaskDefinition) -> Result<String>;

    /// Create a one-instance service running `task_definition` on `cluster`,
    /// returning a reference to the created service.
    async fn create_service(
        &self,
        service_name: &str,
        cluster: &str,
        task_definition: &str,
    ) -> Result<String>;

    /// Block until the service's running count matches its desired count.
    async fn wait_until_stable(&self, service_ref: &str) -> Result<()>;

    /// Scale a service to zero and delete it. Used both to evict rotated
    /// deployments and to compensate for a failed deployment.
    async fn stop_service(&self, service_name: &str, cluster: &str) -> Result<()>;

    /// Create the log group containers write to, if it does not exist.
    async fn create_log_group(&self, name: &str) -> Result<()>;

    /// Resolve the externally reachable `host:port` address of the
    /// service's web container.
    async fn web_container_address(&self, service_ref: &str, cluster: &str) -> Result<String>;
}
