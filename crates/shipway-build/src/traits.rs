//! External builder and registry capability traits

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;

use shipway_types::Image;

/// Boxed error for capability implementations; the stage annotates it with
/// the failing service or image.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Sink for streamed builder output lines: `(service, line)`.
pub type OutputFn<'a> = &'a (dyn Fn(&str, &str) + Send + Sync);

/// Short-lived registry credentials.
#[derive(Debug, Clone)]
pub struct RegistryAuth {
    pub username: String,
    pub password: String,
}

/// The external image builder.
#[async_trait]
pub trait ImageBuilder: Send + Sync {
    /// Build `image_name` from `context_dir`, streaming output lines to
    /// `output` as they are produced.
    async fn build_image(
        &self,
        context_dir: &Path,
        dockerfile: Option<&str>,
        build_args: &BTreeMap<String, String>,
        image_name: &str,
        output: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> std::result::Result<(), BoxError>;
}

/// The external image registry.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn repository_exists(&self, registry: &str, name: &str) -> bool;

    /// Create a repository. Must tolerate concurrent creation ("already
    /// exists" is success).
    async fn create_repository(&self, registry: &str, name: &str)
        -> std::result::Result<(), BoxError>;

    /// Obtain short-lived push credentials for `registry`.
    async fn auth_token(&self, registry: &str) -> std::result::Result<RegistryAuth, BoxError>;

    async fn push_image(
        &self,
        image: &Image,
        auth: &RegistryAuth,
    ) -> std::result::Result<(), BoxError>;
}
