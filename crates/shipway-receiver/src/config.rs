//! Receiver configuration
//!
//! Resolution order: built-in defaults, then an optional TOML file, then
//! `SHIPWAY_`-prefixed environment variables.

use serde::{Deserialize, Serialize};

/// Process-wide receiver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// Domain deployed applications are exposed under.
    #[serde(default = "default_base_domain")]
    pub base_domain: String,

    /// Registry images are pushed to; also the AWS region's ECR endpoint.
    #[serde(default)]
    pub registry_domain: String,

    /// ECS cluster services are created on.
    #[serde(default = "default_cluster_name")]
    pub cluster_name: String,

    /// Region the log groups live in.
    #[serde(default = "default_log_region")]
    pub log_region: String,

    /// etcd v2 endpoint holding platform metadata and proxy records.
    #[serde(default = "default_etcd_endpoint")]
    pub etcd_endpoint: String,

    /// Directory pushed repositories are unpacked into.
    #[serde(default = "default_repository_dir")]
    pub repository_dir: String,

    /// Retention cap on deployments per application.
    #[serde(default = "default_max_app_deploy")]
    pub max_app_deploy: usize,

    /// Scheme used when printing deployed URLs.
    #[serde(default = "default_uri_scheme")]
    pub uri_scheme: String,

    /// Seconds between health-check attempts.
    #[serde(default = "default_health_check_interval")]
    pub health_check_interval: u64,

    /// Health-check attempt budget.
    #[serde(default = "default_health_check_max_try")]
    pub health_check_max_try: u32,

    /// Root namespace for platform metadata in the store.
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            base_domain: default_base_domain(),
            registry_domain: String::new(),
            cluster_name: default_cluster_name(),
            log_region: default_log_region(),
            etcd_endpoint: default_etcd_endpoint(),
            repository_dir: default_repository_dir(),
            max_app_deploy: default_max_app_deploy(),
            uri_scheme: default_uri_scheme(),
            health_check_interval: default_health_check_interval(),
            health_check_max_try: default_health_check_max_try(),
            namespace: default_namespace(),
        }
    }
}

fn default_base_domain() -> String {
    "localhost".to_string()
}

fn default_cluster_name() -> String {
    "shipway".to_string()
}

fn default_log_region() -> String {
    "us-east-1".to_string()
}

fn default_etcd_endpoint() -> String {
    "http://localhost:2379".to_string()
}

fn default_repository_dir() -> String {
    "/repos".to_string()
}

fn default_max_app_deploy() -> usize {
    10
}

fn default_uri_scheme() -> String {
    "http".to_string()
}

fn default_health_check_interval() -> u64 {
    5
}

fn default_health_check_max_try() -> u32 {
    10
}

fn default_namespace() -> String {
    "shipway".to_string()
}

impl ReceiverConfig {
    /// Load configuration from an optional file plus the environment.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&ReceiverConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("SHIPWAY")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_platform_conventions() {
        let config = ReceiverConfig::default();

        assert_eq!(config.repository_dir, "/repos");
        assert_eq!(config.max_app_deploy, 10);
        assert_eq!(config.uri_scheme, "http");
        assert_eq!(config.health_check_interval, 5);
        assert_eq!(config.health_check_max_try, 10);
        assert_eq!(config.namespace, "shipway");
        assert_eq!(config.etcd_endpoint, "http://localhost:2379");
    }

    #[test]
    fn load_without_file_yields_defaults() {
        let config = ReceiverConfig::load(None).unwrap();
        assert_eq!(config.cluster_name, "shipway");
    }
}
