//! External image builder and registry, driven through CLI tools
//!
//! Building and pushing delegate to the `docker` binary on the host the
//! receiver runs on, and registry-side repository management goes through
//! the `aws` CLI against ECR. Build output is streamed line by line into
//! the caller's sink.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use shipway_build::{BoxError, ImageBuilder, RegistryAuth, RegistryClient};
use shipway_types::Image;

/// [`ImageBuilder`] shelling out to `docker build`.
pub struct DockerBuilder;

#[async_trait]
impl ImageBuilder for DockerBuilder {
    async fn build_image(
        &self,
        context_dir: &Path,
        dockerfile: Option<&str>,
        build_args: &BTreeMap<String, String>,
        image_name: &str,
        output: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> Result<(), BoxError> {
        let mut command = Command::new("docker");
        command.arg("build").arg("-t").arg(image_name);

        if let Some(dockerfile) = dockerfile {
            command.arg("-f").arg(dockerfile);
        }

        for (key, value) in build_args {
            command.arg("--build-arg").arg(format!("{key}={value}"));
        }

        command.arg(context_dir);
        stream_command(command, output).await
    }
}

/// [`RegistryClient`] for ECR: repository management through the `aws`
/// CLI, pushes through `docker push` after a `docker login` with the
/// short-lived token.
pub struct EcrRegistry {
    region: String,
}

impl EcrRegistry {
    pub fn new(region: &str) -> Self {
        Self {
            region: region.to_string(),
        }
    }

    fn aws(&self) -> Command {
        let mut command = Command::new("aws");
        command.arg("--region").arg(&self.region);
        command
    }
}

#[async_trait]
impl RegistryClient for EcrRegistry {
    async fn repository_exists(&self, _registry: &str, name: &str) -> bool {
        let mut command = self.aws();
        command
            .args(["ecr", "describe-repositories", "--repository-names"])
            .arg(name);

        matches!(run_quiet(command).await, Ok(true))
    }

    async fn create_repository(&self, _registry: &str, name: &str) -> Result<(), BoxError> {
        let mut command = self.aws();
        command
            .args(["ecr", "create-repository", "--repository-name"])
            .arg(name);

        let output = capture(command).await?;

        // racing creators both tolerate "already exists"
        if !output.status.success()
            && !String::from_utf8_lossy(&output.stderr)
                .contains("RepositoryAlreadyExistsException")
        {
            return Err(command_error("aws ecr create-repository", &output));
        }

        Ok(())
    }

    async fn auth_token(&self, _registry: &str) -> Result<RegistryAuth, BoxError> {
        let mut command = self.aws();
        command.args(["ecr", "get-login-password"]);

        let output = capture(command).await?;
        if !output.status.success() {
            return Err(command_error("aws ecr get-login-password", &output));
        }

        Ok(RegistryAuth {
            username: "AWS".to_string(),
            password: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        })
    }

    async fn push_image(&self, image: &Image, auth: &RegistryAuth) -> Result<(), BoxError> {
        let mut login = Command::new("docker");
        login
            .args(["login", "--username", &auth.username, "--password-stdin"])
            .arg(&image.registry)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let mut child = login.spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            use tokio::io::AsyncWriteExt;
            stdin.write_all(auth.password.as_bytes()).await?;
        }
        let status = child.wait().await?;
        if !status.success() {
            return Err(format!("docker login {} failed: {status}", image.registry).into());
        }

        let mut push = Command::new("docker");
        push.arg("push").arg(image.to_string());
        stream_command(push, &|line| debug!(target: "push", "{line}")).await
    }
}

/// Run a command, forwarding each stdout line to `output`.
async fn stream_command(
    mut command: Command,
    output: &(dyn for<'a> Fn(&'a str) + Send + Sync),
) -> Result<(), BoxError> {
    command.stdout(Stdio::piped()).stderr(Stdio::null());

    let mut child = command.spawn()?;
    if let Some(stdout) = child.stdout.take() {
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            output(&line);
        }
    }

    let status = child.wait().await?;
    if !status.success() {
        return Err(format!("command exited with {status}").into());
    }

    Ok(())
}

async fn capture(mut command: Command) -> Result<std::process::Output, BoxError> {
    Ok(command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?)
}

async fn run_quiet(mut command: Command) -> Result<bool, BoxError> {
    let status = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;

    Ok(status.success())
}

fn command_error(what: &str, output: &std::process::Output) -> BoxError {
    format!(
        "{what} failed: {}",
        String::from_utf8_lossy(&output.stderr).trim()
    )
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stream_command_forwards_stdout_lines() {
        let mut command = Command::new("sh");
        command.args(["-c", "echo one; echo two"]);

        let lines = std::sync::Mutex::new(Vec::new());
        stream_command(command, &|line| lines.lock().unwrap().push(line.to_string()))
            .await
            .unwrap();

        assert_eq!(*lines.lock().unwrap(), vec!["one", "two"]);
    }

    #[tokio::test]
    async fn stream_command_surfaces_nonzero_exit() {
        let mut command = Command::new("sh");
        command.args(["-c", "exit 3"]);

        assert!(stream_command(command, &|_| {}).await.is_err());
    }
}
