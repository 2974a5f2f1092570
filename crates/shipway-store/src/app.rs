//! Per-application metadata access
//!
//! Applications are pre-registered by the control plane; the receiver only
//! reads their metadata and maintains their deployment history.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use shipway_types::{Application, DeployTimestamp, Deployment};

use crate::error::{Result, StoreError};
use crate::kv::KvStore;

/// Typed view of application metadata over the raw [`KvStore`].
#[derive(Clone)]
pub struct AppStore {
    kv: Arc<dyn KvStore>,
    namespace: String,
}

impl AppStore {
    pub fn new(kv: Arc<dyn KvStore>, namespace: &str) -> Self {
        Self {
            kv,
            namespace: namespace.trim_matches('/').to_string(),
        }
    }

    fn app_key(&self, app: &Application) -> String {
        format!(
            "/{}/users/{}/apps/{}",
            self.namespace, app.username, app.app_name
        )
    }

    /// Fail with `AppNotRegistered` unless the control plane has created
    /// the application's directory key.
    pub async fn ensure_registered(&self, app: &Application) -> Result<()> {
        if self.kv.has_key(&self.app_key(app)).await {
            return Ok(());
        }

        Err(StoreError::AppNotRegistered {
            username: app.username.clone(),
            app_name: app.app_name.clone(),
        })
    }

    /// Build-time arguments configured for the application. Empty when the
    /// directory does not exist.
    pub async fn build_args(&self, app: &Application) -> Result<BTreeMap<String, String>> {
        self.read_kv_directory(&format!("{}/build-args", self.app_key(app)))
            .await
    }

    /// Runtime environment variables configured for the application. Empty
    /// when the directory does not exist.
    pub async fn environment_variables(
        &self,
        app: &Application,
    ) -> Result<BTreeMap<String, String>> {
        self.read_kv_directory(&format!("{}/envs", self.app_key(app)))
            .await
    }

    async fn read_kv_directory(&self, dir: &str) -> Result<BTreeMap<String, String>> {
        let mut values = BTreeMap::new();

        if !self.kv.has_key(dir).await {
            return Ok(values);
        }

        for key in self.kv.list(dir, false).await? {
            let value = self.kv.get(&key).await?;
            let name = key.rsplit('/').next().unwrap_or(&key).to_string();
            values.insert(name, value);
        }

        Ok(values)
    }

    fn deployments_key(&self, app: &Application) -> String {
        format!("{}/deployments", self.app_key(app))
    }

    /// Record a successful deployment in the history.
    pub async fn record_deployment(&self, deployment: &Deployment) -> Result<()> {
        let dir = self.deployments_key(&deployment.app);
        let key = format!("{}/{}", dir, deployment.timestamp);

        if !self.kv.has_key(&dir).await {
            self.kv.mkdir(&dir).await?;
        }

        debug!(%key, revision = %deployment.revision, "recording deployment");
        self.kv.set(&key, &deployment.revision).await
    }

    /// Deployment history as `(timestamp, revision)` pairs, oldest first.
    pub async fn deployment_history(
        &self,
        app: &Application,
    ) -> Result<Vec<(DeployTimestamp, String)>> {
        let dir = self.deployments_key(app);

        if !self.kv.has_key(&dir).await {
            return Ok(Vec::new());
        }

        // Keys sort lexicographically; the fixed-width timestamp format
        // makes that chronological.
        let mut history = Vec::new();

        for key in self.kv.list(&dir, false).await? {
            let raw = key.rsplit('/').next().unwrap_or(&key);
            let timestamp = raw.parse::<DeployTimestamp>().map_err(|e| {
                StoreError::operation("list", key.clone(), format!("bad timestamp key: {e}"))
            })?;
            let revision = self.kv.get(&key).await?;
            history.push((timestamp, revision));
        }

        Ok(history)
    }

    /// Drop one history entry.
    pub async fn remove_deployment(
        &self,
        app: &Application,
        timestamp: DeployTimestamp,
    ) -> Result<()> {
        let key = format!("{}/{}", self.deployments_key(app), timestamp);
        self.kv.delete(&key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryKvStore;
    use std::path::Path;

    fn store() -> (Arc<MemoryKvStore>, AppStore) {
        let kv = Arc::new(MemoryKvStore::new());
        let apps = AppStore::new(kv.clone(), "shipway");
        (kv, apps)
    }

    fn app() -> Application {
        Application::new(
            "dtan4/rails-sample",
            "3e634e41d5a819a7586c621a6322ee4d5085232c",
            "dtan4",
        )
    }

    fn deployment(epoch: i64) -> Deployment {
        Deployment::new(
            Arc::new(app()),
            "refs/heads/master",
            DeployTimestamp::from_epoch(epoch),
            Path::new("/repos"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn unregistered_app_is_rejected() {
        let (_, apps) = store();

        assert!(matches!(
            apps.ensure_registered(&app()).await,
            Err(StoreError::AppNotRegistered { .. })
        ));
    }

    #[tokio::test]
    async fn registered_app_passes_preflight() {
        let (kv, apps) = store();
        kv.mkdir("/shipway/users/dtan4/apps/rails-sample")
            .await
            .unwrap();

        assert!(apps.ensure_registered(&app()).await.is_ok());
    }

    #[tokio::test]
    async fn missing_metadata_directories_yield_empty_maps() {
        let (_, apps) = store();

        assert!(apps.build_args(&app()).await.unwrap().is_empty());
        assert!(apps.environment_variables(&app()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reads_build_args_and_envs() {
        let (kv, apps) = store();
        let base = "/shipway/users/dtan4/apps/rails-sample";

        kv.mkdir(&format!("{base}/build-args")).await.unwrap();
        kv.set(&format!("{base}/build-args/RAILS_ENV"), "production")
            .await
            .unwrap();
        kv.mkdir(&format!("{base}/envs")).await.unwrap();
        kv.set(&format!("{base}/envs/SECRET"), "s3cret").await.unwrap();

        let args = apps.build_args(&app()).await.unwrap();
        assert_eq!(args.get("RAILS_ENV").map(String::as_str), Some("production"));

        let envs = apps.environment_variables(&app()).await.unwrap();
        assert_eq!(envs.get("SECRET").map(String::as_str), Some("s3cret"));
    }

    #[tokio::test]
    async fn history_round_trip_sorted_oldest_first() {
        let (_, apps) = store();

        apps.record_deployment(&deployment(300)).await.unwrap();
        apps.record_deployment(&deployment(100)).await.unwrap();
        apps.record_deployment(&deployment(200)).await.unwrap();

        let history = apps.deployment_history(&app()).await.unwrap();
        let stamps: Vec<i64> = history.iter().map(|(ts, _)| ts.epoch()).collect();
        assert_eq!(stamps, vec![100, 200, 300]);

        apps.remove_deployment(&app(), DeployTimestamp::from_epoch(100))
            .await
            .unwrap();
        assert_eq!(apps.deployment_history(&app()).await.unwrap().len(), 2);
    }
}
