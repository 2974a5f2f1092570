//! The deployment pipeline state machine

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use shipway_build::BuildStage;
use shipway_compose::ComposeSpec;
use shipway_health::HealthCheck;
use shipway_router::Router;
use shipway_scheduler::{convert_to_task_definition, ClusterScheduler};
use shipway_store::AppStore;
use shipway_types::{DeployEvent, Deployment, PipelineStage};

use crate::error::{PipelineError, Result};
use crate::rotation::DeploymentRotator;

/// Sink receiving progress events; the receiver binary renders them.
pub type EventSink<'a> = &'a (dyn Fn(DeployEvent) + Send + Sync);

/// Pipeline-level settings, resolved once at process start.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub cluster_name: String,
    pub log_region: String,
    pub repository_dir: PathBuf,
    pub max_deployments_per_app: usize,
}

/// What a successful push produced.
#[derive(Debug, Clone)]
pub struct DeployOutcome {
    pub service_name: String,
    pub service_ref: String,
    pub address: String,
    pub identifiers: Vec<String>,
}

/// Sequences one push through every deployment stage.
pub struct DeploymentPipeline {
    apps: AppStore,
    build: BuildStage,
    scheduler: Arc<dyn ClusterScheduler>,
    health: HealthCheck,
    router: Router,
    rotator: DeploymentRotator,
    config: PipelineConfig,
}

impl DeploymentPipeline {
    pub fn new(
        apps: AppStore,
        build: BuildStage,
        scheduler: Arc<dyn ClusterScheduler>,
        health: HealthCheck,
        router: Router,
        config: PipelineConfig,
    ) -> Self {
        let rotator = DeploymentRotator::new(
            apps.clone(),
            scheduler.clone(),
            router.clone(),
            config.cluster_name.clone(),
            config.max_deployments_per_app,
        );

        Self {
            apps,
            build,
            scheduler,
            health,
            router,
            rotator,
            config,
        }
    }

    /// Run the full pipeline for one deployment. The repository must
    /// already be unpacked under the configured repository directory.
    #[instrument(skip(self, events), fields(project = %deployment.project_name))]
    pub async fn deploy(
        &self,
        deployment: &Deployment,
        events: EventSink<'_>,
    ) -> Result<DeployOutcome> {
        match self.try_deploy(deployment, events).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                events(DeployEvent::StageStarted {
                    stage: PipelineStage::Failed,
                });
                Err(e)
            }
        }
    }

    async fn try_deploy(
        &self,
        deployment: &Deployment,
        events: EventSink<'_>,
    ) -> Result<DeployOutcome> {
        self.apps.ensure_registered(&deployment.app).await?;
        self.rotator.rotate(&deployment.app, events).await?;

        let mut spec = self.prepare_spec(deployment, events).await?;
        let (service_name, service_ref) =
            self.build_and_schedule(deployment, &mut spec, events).await?;

        // A cluster service now exists; failures from here on run the
        // compensating stop before surfacing.
        match self.publish(deployment, &service_name, &service_ref, events).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(%service_name, error = %e, "stopping partially-live service");

                if let Err(stop_err) = self
                    .scheduler
                    .stop_service(&service_name, &self.config.cluster_name)
                    .await
                {
                    warn!(%service_name, error = %stop_err, "compensating stop failed");
                }

                Err(e)
            }
        }
    }

    async fn prepare_spec(
        &self,
        deployment: &Deployment,
        events: EventSink<'_>,
    ) -> Result<ComposeSpec> {
        let repository_path = deployment.repository_path(&self.config.repository_dir);
        let compose_path = repository_path.join("docker-compose.yml");

        if !compose_path.exists() {
            return Err(PipelineError::ComposeFileMissing(repository_path));
        }

        let mut spec = ComposeSpec::load(&compose_path)?;

        let build_args = self.apps.build_args(&deployment.app).await?;
        spec.inject_build_args(&build_args);

        let envs = self.apps.environment_variables(&deployment.app).await?;
        spec.inject_environment_variables(&envs);

        spec.rewrite_port_bindings();
        spec.save_as(&deployment.compose_file_path)?;

        events(DeployEvent::StageStarted {
            stage: PipelineStage::SpecPrepared,
        });

        Ok(spec)
    }

    async fn build_and_schedule(
        &self,
        deployment: &Deployment,
        spec: &mut ComposeSpec,
        events: EventSink<'_>,
    ) -> Result<(String, String)> {
        let output = |service: &str, line: &str| {
            events(DeployEvent::BuildOutput {
                service: service.to_string(),
                line: line.to_string(),
            })
        };

        let images = self.build.build(spec, deployment, &output).await?;
        for built in &images {
            events(DeployEvent::ImageBuilt {
                image: built.image.clone(),
            });
        }
        events(DeployEvent::StageStarted {
            stage: PipelineStage::Built,
        });

        self.build.push(&images).await?;
        for built in &images {
            events(DeployEvent::ImagePushed {
                image: built.image.clone(),
            });
        }
        events(DeployEvent::StageStarted {
            stage: PipelineStage::Pushed,
        });

        self.build.replace_images(spec, &images);

        let service_name = deployment.app.service_name(&deployment.timestamp);
        let task_definition = convert_to_task_definition(
            spec,
            &deployment.app.task_definition_name(),
            &service_name,
            &self.config.log_region,
        )?;

        let arn = self.scheduler.register_task_definition(&task_definition).await?;
        events(DeployEvent::TaskDefinitionRegistered { arn: arn.clone() });

        self.scheduler.create_log_group(&service_name).await?;

        let service_ref = self
            .scheduler
            .create_service(&service_name, &self.config.cluster_name, &arn)
            .await?;
        events(DeployEvent::ServiceCreated {
            service_ref: service_ref.clone(),
        });
        events(DeployEvent::StageStarted {
            stage: PipelineStage::Scheduled,
        });

        Ok((service_name, service_ref))
    }

    async fn publish(
        &self,
        deployment: &Deployment,
        service_name: &str,
        service_ref: &str,
        events: EventSink<'_>,
    ) -> Result<DeployOutcome> {
        self.scheduler.wait_until_stable(service_ref).await?;

        let address = self
            .scheduler
            .web_container_address(service_ref, &self.config.cluster_name)
            .await?;

        let healthy = self
            .health
            .wait_until_healthy(&address, |attempt| {
                events(DeployEvent::HealthCheckAttempt {
                    path: self.health.path().to_string(),
                    attempt,
                });
            })
            .await;

        if !healthy {
            return Err(PipelineError::Unhealthy {
                service: service_name.to_string(),
            });
        }
        events(DeployEvent::StageStarted {
            stage: PipelineStage::HealthChecked,
        });

        let identifiers = deployment.routing_identifiers();
        self.router
            .register(&deployment.project_name, &identifiers, &address)
            .await?;
        events(DeployEvent::RoutesRegistered {
            identifiers: identifiers.clone(),
        });
        events(DeployEvent::StageStarted {
            stage: PipelineStage::Registered,
        });

        self.apps.record_deployment(deployment).await?;

        self.clean_workspace(deployment)?;
        events(DeployEvent::StageStarted {
            stage: PipelineStage::Cleaned,
        });

        info!(%service_name, %address, "deployment complete");

        Ok(DeployOutcome {
            service_name: service_name.to_string(),
            service_ref: service_ref.to_string(),
            address,
            identifiers,
        })
    }

    /// Remove the unpacked sources, keeping only the prepared compose file.
    fn clean_workspace(&self, deployment: &Deployment) -> Result<()> {
        let repository_path = deployment.repository_path(&self.config.repository_dir);
        let keep = deployment.compose_file_path.file_name();

        let cleanup = |source| PipelineError::Cleanup {
            path: repository_path.clone(),
            source,
        };

        for entry in fs::read_dir(&repository_path).map_err(cleanup)? {
            let entry = entry.map_err(cleanup)?;
            if Some(entry.file_name().as_os_str()) == keep {
                continue;
            }

            let path = entry.path();
            if entry.file_type().map_err(cleanup)?.is_dir() {
                fs::remove_dir_all(&path).map_err(cleanup)?;
            } else {
                fs::remove_file(&path).map_err(cleanup)?;
            }
        }

        Ok(())
    }
}
