//! Shipway receiver - the git push deployment entry point
//!
//! Invoked by the git front end as
//! `receiver <repository> <revision> <username> <fingerprint> <refname>`
//! with the pushed tree as a tar stream on stdin. Exit code 0 means the
//! revision is deployed, routed, and recorded; 1 means the push failed and
//! a formatted reason was printed.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shipway_build::BuildStage;
use shipway_health::HealthCheck;
use shipway_pipeline::{DeploymentPipeline, PipelineConfig};
use shipway_router::Router;
use shipway_store::{AppStore, KvStore};
use shipway_types::{
    Application, DeployEvent, DeployTimestamp, Deployment, IdentityError, PipelineStage,
};

mod config;
mod console;
mod docker;
mod ecs;
mod etcd;
mod unpack;

use config::ReceiverConfig;
use docker::{DockerBuilder, EcrRegistry};
use ecs::EcsScheduler;
use etcd::EtcdKvStore;

/// Receives one pushed revision and deploys it.
#[derive(Parser)]
#[command(name = "receiver", about = "Shipway git push receiver", long_about = None)]
struct Cli {
    /// repository revision username fingerprint refname
    args: Vec<String>,

    /// Configuration file path
    #[arg(long, env = "SHIPWAY_CONFIG")]
    config: Option<String>,

    /// Print version information and exit
    #[arg(short = 'v', long)]
    version: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            console::error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("receiver {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let [repository, revision, username, fingerprint, refname] = cli.args.as_slice() else {
        return Err(IdentityError::MissingArguments {
            count: cli.args.len(),
        }
        .into());
    };

    let config = ReceiverConfig::load(cli.config.as_deref())?;
    debug!(%fingerprint, "push authenticated");

    let app = Arc::new(Application::new(repository, revision, username));
    let deployment = Deployment::new(
        app.clone(),
        refname,
        DeployTimestamp::now(),
        Path::new(&config.repository_dir),
    )?;

    console::title(&format!(
        "Receiving {} ({})",
        app.repository, deployment.project_name
    ));

    let repository_path = unpack::unpack_repository(
        Path::new(&config.repository_dir),
        &app.username,
        &deployment.project_name,
        std::io::stdin().lock(),
    )?;
    debug!(path = %repository_path.display(), "repository unpacked");

    // compose build contexts are relative to the repository root
    std::env::set_current_dir(&repository_path)?;

    let render = |event: DeployEvent| console::render(&event);
    render(DeployEvent::StageStarted {
        stage: PipelineStage::Unpacked,
    });

    let kv: Arc<dyn KvStore> = Arc::new(EtcdKvStore::new(&config.etcd_endpoint));
    let pipeline = DeploymentPipeline::new(
        AppStore::new(kv.clone(), &config.namespace),
        BuildStage::new(
            Arc::new(DockerBuilder),
            Arc::new(EcrRegistry::new(&config.log_region)),
            &config.registry_domain,
        ),
        Arc::new(EcsScheduler::new(&config.log_region, &config.cluster_name)),
        HealthCheck::new(
            "/",
            Duration::from_secs(config.health_check_interval),
            config.health_check_max_try,
        ),
        Router::new(kv, &config.base_domain),
        PipelineConfig {
            cluster_name: config.cluster_name.clone(),
            log_region: config.log_region.clone(),
            repository_dir: Path::new(&config.repository_dir).to_path_buf(),
            max_deployments_per_app: config.max_app_deploy,
        },
    );

    let outcome = pipeline.deploy(&deployment, &render).await?;

    console::print_deployed_urls(
        &app.repository,
        &config.uri_scheme,
        &config.base_domain,
        &outcome.identifiers,
    );

    Ok(())
}
