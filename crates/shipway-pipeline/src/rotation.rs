//! Deployment rotation
//!
//! Keeps the per-application deployment history under the configured cap.
//! One eviction removes exactly one entry, always the one with the
//! smallest timestamp; the fixed-width timestamp format makes the store's
//! lexicographic key order chronological.

use std::sync::Arc;

use tracing::{info, instrument};

use shipway_router::Router;
use shipway_scheduler::ClusterScheduler;
use shipway_store::AppStore;
use shipway_types::{Application, DeployEvent, IdentityError};

use crate::error::Result;
use crate::pipeline::EventSink;

/// Evicts the oldest deployments of an application until its history is
/// below the retention cap.
#[derive(Clone)]
pub struct DeploymentRotator {
    apps: AppStore,
    scheduler: Arc<dyn ClusterScheduler>,
    router: Router,
    cluster_name: String,
    max_deployments: usize,
}

impl DeploymentRotator {
    pub fn new(
        apps: AppStore,
        scheduler: Arc<dyn ClusterScheduler>,
        router: Router,
        cluster_name: impl Into<String>,
        max_deployments: usize,
    ) -> Self {
        Self {
            apps,
            scheduler,
            router,
            cluster_name: cluster_name.into(),
            max_deployments,
        }
    }

    /// Evict until the history can admit one more entry. Any failure
    /// aborts rotation; the caller must abort the new deployment rather
    /// than exceed the cap.
    #[instrument(skip(self, events), fields(app = %app.app_name))]
    pub async fn rotate(&self, app: &Application, events: EventSink<'_>) -> Result<()> {
        loop {
            let history = self.apps.deployment_history(app).await?;
            if history.len() < self.max_deployments {
                return Ok(());
            }

            // oldest first
            let (timestamp, revision) = history[0].clone();
            self.evict(app, timestamp, &revision, events).await?;
        }
    }

    async fn evict(
        &self,
        app: &Application,
        timestamp: shipway_types::DeployTimestamp,
        revision: &str,
        events: EventSink<'_>,
    ) -> Result<()> {
        let short = revision
            .get(..8)
            .ok_or_else(|| IdentityError::ShortRevision(revision.to_string()))?;
        let project_name = format!("{}-{}", app.repository, short);
        let service_name = app.service_name(&timestamp);

        info!(%project_name, %service_name, "evicting deployment");

        self.scheduler
            .stop_service(&service_name, &self.cluster_name)
            .await?;
        self.apps.remove_deployment(app, timestamp).await?;
        self.router
            .deregister(&project_name, &project_name.to_lowercase())
            .await?;

        events(DeployEvent::DeploymentEvicted {
            project_name,
            timestamp: timestamp.to_string(),
        });

        Ok(())
    }
}
