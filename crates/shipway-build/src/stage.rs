//! Build & publish stage

use std::path::Path;
use std::sync::Arc;

use tracing::{info, instrument};

use shipway_compose::ComposeSpec;
use shipway_types::{Deployment, Image};

use crate::error::{BuildError, Result};
use crate::traits::{ImageBuilder, OutputFn, RegistryClient};

/// An image built for one compose service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltImage {
    pub service: String,
    pub image: Image,
}

/// Turns a compose specification into pushed, registry-qualified images.
pub struct BuildStage {
    builder: Arc<dyn ImageBuilder>,
    registry: Arc<dyn RegistryClient>,
    registry_domain: String,
}

impl BuildStage {
    pub fn new(
        builder: Arc<dyn ImageBuilder>,
        registry: Arc<dyn RegistryClient>,
        registry_domain: &str,
    ) -> Self {
        Self {
            builder,
            registry,
            registry_domain: registry_domain.to_string(),
        }
    }

    /// Build an image for every service with a build context. Aborts on the
    /// first failing service; there is no partial-success continuation.
    #[instrument(skip_all, fields(project = %deployment.project_name))]
    pub async fn build(
        &self,
        spec: &ComposeSpec,
        deployment: &Deployment,
        output: OutputFn<'_>,
    ) -> Result<Vec<BuiltImage>> {
        let mut images = Vec::new();

        for (name, service) in spec.services() {
            let Some(build) = &service.build else {
                continue;
            };

            let image = match &service.image {
                Some(declared) => {
                    Image::parse(declared).map_err(|source| BuildError::ImageReference {
                        service: name.clone(),
                        source,
                    })?
                }
                None => Image::new(
                    &self.registry_domain,
                    &format!(
                        "{}-{}-{}",
                        deployment.app.username, deployment.app.app_name, name
                    ),
                    &deployment.revision,
                ),
            };

            let args = build.args_map();
            let image_name = image.to_string();
            let sink = |line: &str| output(name, line);

            self.builder
                .build_image(
                    Path::new(build.context()),
                    build.dockerfile(),
                    &args,
                    &image_name,
                    &sink,
                )
                .await
                .map_err(|e| BuildError::Build {
                    service: name.clone(),
                    message: e.to_string(),
                })?;

            info!(service = %name, image = %image_name, "image built");
            images.push(BuiltImage {
                service: name.clone(),
                image,
            });
        }

        Ok(images)
    }

    /// Push the batch, creating registry repositories on demand.
    /// Credentials are obtained once per batch. Aborts on the first
    /// failure; already-pushed images are not rolled back.
    #[instrument(skip_all)]
    pub async fn push(&self, images: &[BuiltImage]) -> Result<()> {
        if images.is_empty() {
            return Ok(());
        }

        let auth = self
            .registry
            .auth_token(&self.registry_domain)
            .await
            .map_err(|e| BuildError::Registry {
                operation: "auth",
                name: self.registry_domain.clone(),
                message: e.to_string(),
            })?;

        for built in images {
            let image = &built.image;

            if !self
                .registry
                .repository_exists(&image.registry, &image.name)
                .await
            {
                self.registry
                    .create_repository(&image.registry, &image.name)
                    .await
                    .map_err(|e| BuildError::Registry {
                        operation: "create-repository",
                        name: image.name.clone(),
                        message: e.to_string(),
                    })?;
            }

            self.registry
                .push_image(image, &auth)
                .await
                .map_err(|e| BuildError::Push {
                    image: image.to_string(),
                    message: e.to_string(),
                })?;

            info!(image = %image, "image pushed");
        }

        Ok(())
    }

    /// Point each built service at its pushed reference so the scheduling
    /// stage sees final image URIs, not local build tags.
    pub fn replace_images(&self, spec: &mut ComposeSpec, images: &[BuiltImage]) {
        for built in images {
            spec.replace_image(&built.service, &built.image.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{BoxError, RegistryAuth};
    use async_trait::async_trait;
    use shipway_types::{Application, DeployTimestamp};
    use std::collections::BTreeMap;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    #[derive(Default)]
    struct FakeBuilder {
        built: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl ImageBuilder for FakeBuilder {
        async fn build_image(
            &self,
            _context_dir: &Path,
            _dockerfile: Option<&str>,
            _build_args: &BTreeMap<String, String>,
            image_name: &str,
            output: &(dyn for<'a> Fn(&'a str) + Send + Sync),
        ) -> std::result::Result<(), BoxError> {
            if let Some(fail) = &self.fail_on {
                if image_name.contains(fail.as_str()) {
                    return Err("builder exploded".into());
                }
            }
            output(&format!("building {image_name}"));
            self.built.lock().unwrap().push(image_name.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeRegistry {
        existing: Mutex<Vec<String>>,
        created: Mutex<Vec<String>>,
        pushed: Mutex<Vec<String>>,
        auth_calls: Mutex<u32>,
    }

    #[async_trait]
    impl RegistryClient for FakeRegistry {
        async fn repository_exists(&self, _registry: &str, name: &str) -> bool {
            self.existing.lock().unwrap().iter().any(|n| n == name)
        }

        async fn create_repository(
            &self,
            _registry: &str,
            name: &str,
        ) -> std::result::Result<(), BoxError> {
            self.created.lock().unwrap().push(name.to_string());
            Ok(())
        }

        async fn auth_token(&self, _registry: &str) -> std::result::Result<RegistryAuth, BoxError> {
            *self.auth_calls.lock().unwrap() += 1;
            Ok(RegistryAuth {
                username: "AWS".to_string(),
                password: "token".to_string(),
            })
        }

        async fn push_image(
            &self,
            image: &Image,
            _auth: &RegistryAuth,
        ) -> std::result::Result<(), BoxError> {
            self.pushed.lock().unwrap().push(image.to_string());
            Ok(())
        }
    }

    fn deployment() -> Deployment {
        Deployment::new(
            Arc::new(Application::new(
                "dtan4/rails-sample",
                "3e634e41d5a819a7586c621a6322ee4d5085232c",
                "dtan4",
            )),
            "refs/heads/master",
            DeployTimestamp::from_epoch(1467100000),
            Path::new("/repos"),
        )
        .unwrap()
    }

    fn spec(yaml: &str) -> ComposeSpec {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        ComposeSpec::load(file.path()).unwrap()
    }

    const TWO_SERVICES: &str = r#"
version: "2"
services:
  web:
    build: .
  worker:
    build: ./worker
    image: myorg/worker:v2
  redis:
    image: redis:3.0
"#;

    #[tokio::test]
    async fn builds_only_services_with_build_contexts() {
        let builder = Arc::new(FakeBuilder::default());
        let registry = Arc::new(FakeRegistry::default());
        let stage = BuildStage::new(builder.clone(), registry, "registry.example.amazonaws.com");

        let images = stage
            .build(&spec(TWO_SERVICES), &deployment(), &|_, _| {})
            .await
            .unwrap();

        let names: Vec<&str> = images.iter().map(|b| b.service.as_str()).collect();
        assert_eq!(names, vec!["web", "worker"]);

        // derived identity for web, declared identity for worker
        assert_eq!(
            images[0].image,
            Image::new(
                "registry.example.amazonaws.com",
                "dtan4-rails-sample-web",
                "3e634e41d5a819a7586c621a6322ee4d5085232c"
            )
        );
        assert_eq!(images[1].image, Image::new("", "myorg/worker", "v2"));
    }

    #[tokio::test]
    async fn build_failure_names_the_service_and_aborts() {
        let builder = Arc::new(FakeBuilder {
            fail_on: Some("dtan4-rails-sample-web".to_string()),
            ..Default::default()
        });
        let registry = Arc::new(FakeRegistry::default());
        let stage = BuildStage::new(builder.clone(), registry, "registry.example.amazonaws.com");

        let err = stage
            .build(&spec(TWO_SERVICES), &deployment(), &|_, _| {})
            .await
            .unwrap_err();

        assert!(matches!(err, BuildError::Build { ref service, .. } if service == "web"));
        // the worker build never ran
        assert!(builder.built.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn push_creates_missing_repositories_and_authenticates_once() {
        let builder = Arc::new(FakeBuilder::default());
        let registry = Arc::new(FakeRegistry::default());
        registry
            .existing
            .lock()
            .unwrap()
            .push("myorg/worker".to_string());
        let stage = BuildStage::new(builder, registry.clone(), "registry.example.amazonaws.com");

        let images = stage
            .build(&spec(TWO_SERVICES), &deployment(), &|_, _| {})
            .await
            .unwrap();
        stage.push(&images).await.unwrap();

        assert_eq!(
            *registry.created.lock().unwrap(),
            vec!["dtan4-rails-sample-web".to_string()]
        );
        assert_eq!(registry.pushed.lock().unwrap().len(), 2);
        assert_eq!(*registry.auth_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn replace_images_rewrites_the_spec_in_place() {
        let builder = Arc::new(FakeBuilder::default());
        let registry = Arc::new(FakeRegistry::default());
        let stage = BuildStage::new(builder, registry, "registry.example.amazonaws.com");

        let mut compose = spec(TWO_SERVICES);
        let images = stage
            .build(&compose, &deployment(), &|_, _| {})
            .await
            .unwrap();
        stage.replace_images(&mut compose, &images);

        assert_eq!(
            compose.services()["web"].image.as_deref(),
            Some(
                "registry.example.amazonaws.com/dtan4-rails-sample-web:3e634e41d5a819a7586c621a6322ee4d5085232c"
            )
        );
    }
}
