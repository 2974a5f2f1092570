//! Compose specification loading, mutation, and serialization

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ComposeError, Result};
use crate::service::{PortValue, ServiceConfig};
use crate::WEB_SERVICE;

/// Schema shape, resolved once at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComposeSchema {
    V2(V2Document),
    V1(BTreeMap<String, ServiceConfig>),
}

/// The v2 `{version, services, ...}` document. Sibling sections such as
/// `volumes:` and `networks:` ride along in `rest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct V2Document {
    pub version: String,
    pub services: BTreeMap<String, ServiceConfig>,

    #[serde(flatten)]
    pub rest: BTreeMap<String, serde_yaml::Value>,
}

/// A loaded compose specification.
///
/// Mutators operate in place on the loaded structure; none is safe to call
/// concurrently with another on the same instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeSpec {
    path: PathBuf,
    schema: ComposeSchema,
}

impl ComposeSpec {
    /// Load and shape-resolve a compose file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| ComposeError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let value: serde_yaml::Value =
            serde_yaml::from_str(&raw).map_err(|e| ComposeError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        if !value.is_mapping() {
            return Err(ComposeError::UnsupportedShape {
                path: path.to_path_buf(),
            });
        }

        let schema = if value.get("version").is_some() {
            let doc: V2Document =
                serde_yaml::from_value(value.clone()).map_err(|e| ComposeError::Parse {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
            ComposeSchema::V2(doc)
        } else {
            let services: BTreeMap<String, ServiceConfig> =
                serde_yaml::from_value(value.clone()).map_err(|e| ComposeError::Parse {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
            ComposeSchema::V1(services)
        };

        debug!(path = %path.display(), "loaded compose file");

        Ok(Self {
            path: path.to_path_buf(),
            schema,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema(&self) -> &ComposeSchema {
        &self.schema
    }

    pub fn services(&self) -> &BTreeMap<String, ServiceConfig> {
        match &self.schema {
            ComposeSchema::V1(services) => services,
            ComposeSchema::V2(doc) => &doc.services,
        }
    }

    pub fn services_mut(&mut self) -> &mut BTreeMap<String, ServiceConfig> {
        match &mut self.schema {
            ComposeSchema::V1(services) => services,
            ComposeSchema::V2(doc) => &mut doc.services,
        }
    }

    fn web_service_mut(&mut self) -> Option<&mut ServiceConfig> {
        self.services_mut().get_mut(WEB_SERVICE)
    }

    /// Merge build-time arguments into the web service. No-op when the map
    /// is empty, the web service is absent, or it has no build section.
    pub fn inject_build_args(&mut self, args: &BTreeMap<String, String>) {
        if args.is_empty() {
            return;
        }

        let Some(web) = self.web_service_mut() else {
            return;
        };
        let Some(build) = web.build.as_mut() else {
            return;
        };

        let mut merged = build.args_map();
        merged.extend(args.iter().map(|(k, v)| (k.clone(), v.clone())));
        build.set_args_map(merged);
    }

    /// Merge runtime environment variables into the web service,
    /// last-write-wins per key. Previously declared variables not present
    /// in `envs` are preserved.
    pub fn inject_environment_variables(&mut self, envs: &BTreeMap<String, String>) {
        if envs.is_empty() {
            return;
        }

        let Some(web) = self.web_service_mut() else {
            return;
        };

        let mut merged = web.environment_map();
        merged.extend(envs.iter().map(|(k, v)| (k.clone(), v.clone())));
        web.set_environment_map(merged);
    }

    /// Rewrite every `host:container` (or `ip:host:container`) port
    /// declaration to its container port only; the scheduler assigns the
    /// externally reachable address. Already-internal ports pass through,
    /// so applying this twice equals applying it once.
    pub fn rewrite_port_bindings(&mut self) {
        for service in self.services_mut().values_mut() {
            for port in &mut service.ports {
                *port = PortValue::Text(container_port(&port.as_text()));
            }
        }
    }

    /// Point `service` at a final, registry-qualified image reference.
    pub fn replace_image(&mut self, service: &str, image: &str) {
        if let Some(config) = self.services_mut().get_mut(service) {
            config.image = Some(image.to_string());
        }
    }

    /// Serialize back under the same schema version.
    pub fn save_as(&mut self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(&self.schema).map_err(|e| ComposeError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        fs::write(path, data).map_err(|source| ComposeError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        self.path = path.to_path_buf();
        Ok(())
    }
}

/// `"8080:8080"` → `"8080"`, `"127.0.0.1:8000:8000"` → `"8000"`, anything
/// already internal (or non-numeric, like `8080/udp`) is left alone.
fn container_port(port: &str) -> String {
    match port.rsplit_once(':') {
        Some((head, container))
            if !head.is_empty() && container.chars().all(|c| c.is_ascii_digit()) =>
        {
            container.to_string()
        }
        _ => port.to_string(),
    }
}
