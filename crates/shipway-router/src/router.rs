//! Route registration and removal against the metadata store

use std::sync::Arc;

use shipway_store::KvStore;
use tracing::{info, instrument};

use crate::error::{Result, RouterError};
use crate::records::{Backend, Frontend, Server};
use crate::ROUTER_KEY_BASE;

/// Writes and removes proxy records for deployments.
#[derive(Clone)]
pub struct Router {
    kv: Arc<dyn KvStore>,
    base_domain: String,
}

impl Router {
    pub fn new(kv: Arc<dyn KvStore>, base_domain: impl Into<String>) -> Self {
        Self {
            kv,
            base_domain: base_domain.into(),
        }
    }

    pub fn base_domain(&self) -> &str {
        &self.base_domain
    }

    /// Publish routes for a healthy deployment: one backend for the
    /// project, one frontend per identifier, one server pointing at the
    /// web container. Frontends for already-routed identifiers are
    /// overwritten, which is how a newer deployment takes over a stable
    /// hostname.
    #[instrument(skip(self, identifiers), fields(project = %project_name))]
    pub async fn register(
        &self,
        project_name: &str,
        identifiers: &[String],
        address: &str,
    ) -> Result<()> {
        self.set_backend(project_name).await?;

        for identifier in identifiers {
            self.set_frontend(project_name, identifier).await?;
        }

        self.set_server(project_name, address).await?;

        info!(address, ?identifiers, "registered routes");
        Ok(())
    }

    /// Remove an evicted deployment's routes: every server under its
    /// backend, the frontend bound to its revision identifier, and the
    /// backend itself. Branch and bare-app frontends are left in place;
    /// a newer deployment has already repointed them at its own backend.
    #[instrument(skip(self), fields(project = %project_name))]
    pub async fn deregister(&self, project_name: &str, revision_identifier: &str) -> Result<()> {
        let deregister = |source| RouterError::Deregister {
            project: project_name.to_string(),
            source,
        };

        // Presence is judged by the record keys themselves; directory keys
        // are not guaranteed to exist independently. Servers go first so no
        // frontend ever routes to a backend with live server records gone
        // missing mid-removal, then the frontend, then the backend itself.
        let servers_dir = format!("{ROUTER_KEY_BASE}/backends/{project_name}/servers");
        if self.kv.has_key(&servers_dir).await {
            self.kv
                .delete_recursive(&servers_dir)
                .await
                .map_err(deregister)?;
        }

        let frontend_key = frontend_key(revision_identifier);
        if self.kv.has_key(&frontend_key).await {
            self.kv
                .delete_recursive(&format!("{ROUTER_KEY_BASE}/frontends/{revision_identifier}"))
                .await
                .map_err(deregister)?;
        }

        let backend_record = format!("{ROUTER_KEY_BASE}/backends/{project_name}/backend");
        if self.kv.has_key(&backend_record).await {
            self.kv
                .delete_recursive(&format!("{ROUTER_KEY_BASE}/backends/{project_name}"))
                .await
                .map_err(deregister)?;
        }

        info!("removed routes");
        Ok(())
    }

    async fn set_backend(&self, project_name: &str) -> Result<()> {
        let key = format!("{ROUTER_KEY_BASE}/backends/{project_name}/backend");
        let json = serde_json::to_string(&Backend::http())?;

        self.kv
            .set(&key, &json)
            .await
            .map_err(|source| RouterError::Backend {
                project: project_name.to_string(),
                source,
            })
    }

    async fn set_frontend(&self, project_name: &str, identifier: &str) -> Result<()> {
        let frontend = Frontend::host_route(project_name, identifier, &self.base_domain);
        let json = serde_json::to_string(&frontend)?;

        self.kv
            .set(&frontend_key(identifier), &json)
            .await
            .map_err(|source| RouterError::Frontend {
                identifier: identifier.to_string(),
                source,
            })
    }

    async fn set_server(&self, project_name: &str, address: &str) -> Result<()> {
        let key = format!(
            "{ROUTER_KEY_BASE}/backends/{project_name}/servers/{}",
            server_key(address)
        );
        let json = serde_json::to_string(&Server::at(address))?;

        self.kv
            .set(&key, &json)
            .await
            .map_err(|source| RouterError::Server {
                project: project_name.to_string(),
                source,
            })
    }
}

fn frontend_key(identifier: &str) -> String {
    format!("{ROUTER_KEY_BASE}/frontends/{identifier}/frontend")
}

/// Server keys live in the flat `servers/` directory, so the address is
/// flattened into a path-safe form.
fn server_key(address: &str) -> String {
    address.replace([':', '.'], "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipway_store::MemoryKvStore;

    fn router() -> Router {
        Router::new(Arc::new(MemoryKvStore::new()), "pausapp.com")
    }

    async fn register_example(router: &Router) {
        let identifiers = vec![
            "user-app-abc12345".to_string(),
            "user-app-master".to_string(),
            "user-app".to_string(),
        ];
        router
            .register("user-app-abc12345", &identifiers, "10.0.1.5:32768")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn register_writes_backend_frontends_and_server() {
        let router = router();
        register_example(&router).await;
        let kv = &router.kv;

        assert_eq!(
            kv.get("/vulcand/backends/user-app-abc12345/backend")
                .await
                .unwrap(),
            r#"{"Type":"http"}"#
        );

        let frontend = kv
            .get("/vulcand/frontends/user-app/frontend")
            .await
            .unwrap();
        let parsed: Frontend = serde_json::from_str(&frontend).unwrap();
        assert_eq!(parsed.backend_id, "user-app-abc12345");
        assert_eq!(
            parsed.route,
            "Host(`user-app.pausapp.com`) && PathRegexp(`/`)"
        );
        assert!(parsed.settings.trust_forward_header);

        assert_eq!(
            kv.get("/vulcand/backends/user-app-abc12345/servers/10-0-1-5-32768")
                .await
                .unwrap(),
            r#"{"URL":"http://10.0.1.5:32768"}"#
        );
    }

    #[tokio::test]
    async fn register_writes_one_frontend_per_identifier() {
        let router = router();
        register_example(&router).await;

        let frontends = router.kv.list("/vulcand/frontends", true).await.unwrap();
        assert_eq!(frontends.len(), 3);
    }

    #[tokio::test]
    async fn reregistering_identifier_repoints_frontend() {
        let router = router();
        register_example(&router).await;

        let identifiers = vec!["user-app".to_string()];
        router
            .register("user-app-def67890", &identifiers, "10.0.1.9:32770")
            .await
            .unwrap();

        let frontend = router
            .kv
            .get("/vulcand/frontends/user-app/frontend")
            .await
            .unwrap();
        let parsed: Frontend = serde_json::from_str(&frontend).unwrap();
        assert_eq!(parsed.backend_id, "user-app-def67890");
    }

    #[tokio::test]
    async fn deregister_removes_project_records_but_keeps_shared_frontends() {
        let router = router();
        register_example(&router).await;

        router
            .deregister("user-app-abc12345", "user-app-abc12345")
            .await
            .unwrap();

        let kv = &router.kv;
        assert!(!kv.has_key("/vulcand/backends/user-app-abc12345/backend").await);
        assert!(
            !kv.has_key("/vulcand/backends/user-app-abc12345/servers/10-0-1-5-32768")
                .await
        );
        assert!(
            !kv.has_key("/vulcand/frontends/user-app-abc12345/frontend")
                .await
        );
        // stable hostnames stay routable
        assert!(kv.has_key("/vulcand/frontends/user-app/frontend").await);
        assert!(kv.has_key("/vulcand/frontends/user-app-master/frontend").await);
    }

    /// [`MemoryKvStore`] that records the order of recursive deletions.
    #[derive(Default)]
    struct RecordingKv {
        inner: MemoryKvStore,
        deletions: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl KvStore for RecordingKv {
        async fn get(&self, key: &str) -> shipway_store::Result<String> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> shipway_store::Result<()> {
            self.inner.set(key, value).await
        }

        async fn has_key(&self, key: &str) -> bool {
            self.inner.has_key(key).await
        }

        async fn list(&self, prefix: &str, recursive: bool) -> shipway_store::Result<Vec<String>> {
            self.inner.list(prefix, recursive).await
        }

        async fn mkdir(&self, key: &str) -> shipway_store::Result<()> {
            self.inner.mkdir(key).await
        }

        async fn delete(&self, key: &str) -> shipway_store::Result<()> {
            self.inner.delete(key).await
        }

        async fn delete_recursive(&self, key: &str) -> shipway_store::Result<()> {
            self.deletions.lock().unwrap().push(key.to_string());
            self.inner.delete_recursive(key).await
        }
    }

    #[tokio::test]
    async fn deregister_removes_servers_then_frontend_then_backend() {
        let kv = Arc::new(RecordingKv::default());
        let router = Router::new(kv.clone(), "pausapp.com");

        let identifiers = vec!["user-app-abc12345".to_string()];
        router
            .register("user-app-abc12345", &identifiers, "10.0.1.5:32768")
            .await
            .unwrap();
        kv.mkdir("/vulcand/backends/user-app-abc12345/servers")
            .await
            .unwrap();

        router
            .deregister("user-app-abc12345", "user-app-abc12345")
            .await
            .unwrap();

        assert_eq!(
            *kv.deletions.lock().unwrap(),
            vec![
                "/vulcand/backends/user-app-abc12345/servers".to_string(),
                "/vulcand/frontends/user-app-abc12345".to_string(),
                "/vulcand/backends/user-app-abc12345".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn deregister_is_a_noop_for_unknown_projects() {
        let router = router();
        router
            .deregister("never-deployed-00000000", "never-deployed-00000000")
            .await
            .unwrap();
    }
}
