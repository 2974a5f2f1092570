//! ECS cluster scheduler, driven through the `aws` CLI
//!
//! The receiver host carries AWS credentials for the platform account; the
//! scheduler calls are thin wrappers over `aws ecs` / `aws logs` /
//! `aws ec2` invocations, parsing their JSON output.

use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, info};

use shipway_scheduler::{ClusterScheduler, ScheduleError, TaskDefinition};

const WEB_CONTAINER: &str = "web";

pub struct EcsScheduler {
    region: String,
    cluster: String,
}

impl EcsScheduler {
    pub fn new(region: &str, cluster: &str) -> Self {
        Self {
            region: region.to_string(),
            cluster: cluster.to_string(),
        }
    }

    async fn run_json(
        &self,
        operation: &'static str,
        args: &[&str],
    ) -> Result<Value, ScheduleError> {
        let output = Command::new("aws")
            .arg("--region")
            .arg(&self.region)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ScheduleError::scheduler(operation, e.to_string()))?;

        if !output.status.success() {
            return Err(ScheduleError::scheduler(
                operation,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        if output.stdout.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| ScheduleError::scheduler(operation, e.to_string()))
    }

    async fn run_json_tolerating(
        &self,
        operation: &'static str,
        args: &[&str],
        tolerated: &str,
    ) -> Result<(), ScheduleError> {
        match self.run_json(operation, args).await {
            Ok(_) => Ok(()),
            Err(ScheduleError::Scheduler { message, .. }) if message.contains(tolerated) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn string_at(value: &Value, pointer: &str, operation: &'static str) -> Result<String, ScheduleError> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            ScheduleError::scheduler(operation, format!("missing {pointer} in response"))
        })
}

#[async_trait]
impl ClusterScheduler for EcsScheduler {
    async fn register_task_definition(
        &self,
        definition: &TaskDefinition,
    ) -> Result<String, ScheduleError> {
        let input = serde_json::to_string(definition)
            .map_err(|e| ScheduleError::scheduler("register-task-definition", e.to_string()))?;

        let response = self
            .run_json(
                "register-task-definition",
                &["ecs", "register-task-definition", "--cli-input-json", &input],
            )
            .await?;

        let arn = string_at(
            &response,
            "/taskDefinition/taskDefinitionArn",
            "register-task-definition",
        )?;
        debug!(%arn, "task definition registered");
        Ok(arn)
    }

    async fn create_service(
        &self,
        service_name: &str,
        cluster: &str,
        task_definition: &str,
    ) -> Result<String, ScheduleError> {
        let response = self
            .run_json(
                "create-service",
                &[
                    "ecs",
                    "create-service",
                    "--cluster",
                    cluster,
                    "--service-name",
                    service_name,
                    "--task-definition",
                    task_definition,
                    "--desired-count",
                    "1",
                ],
            )
            .await?;

        string_at(&response, "/service/serviceArn", "create-service")
    }

    async fn wait_until_stable(&self, service_ref: &str) -> Result<(), ScheduleError> {
        self.run_json(
            "wait-services-stable",
            &[
                "ecs",
                "wait",
                "services-stable",
                "--cluster",
                &self.cluster,
                "--services",
                service_ref,
            ],
        )
        .await?;

        Ok(())
    }

    async fn stop_service(&self, service_name: &str, cluster: &str) -> Result<(), ScheduleError> {
        self.run_json(
            "update-service",
            &[
                "ecs",
                "update-service",
                "--cluster",
                cluster,
                "--service",
                service_name,
                "--desired-count",
                "0",
            ],
        )
        .await?;

        self.run_json(
            "delete-service",
            &[
                "ecs",
                "delete-service",
                "--cluster",
                cluster,
                "--service",
                service_name,
            ],
        )
        .await?;

        info!(%service_name, "service stopped");
        Ok(())
    }

    async fn create_log_group(&self, name: &str) -> Result<(), ScheduleError> {
        self.run_json_tolerating(
            "create-log-group",
            &["logs", "create-log-group", "--log-group-name", name],
            "ResourceAlreadyExistsException",
        )
        .await
    }

    async fn web_container_address(
        &self,
        service_ref: &str,
        cluster: &str,
    ) -> Result<String, ScheduleError> {
        let tasks = self
            .run_json(
                "list-tasks",
                &[
                    "ecs",
                    "list-tasks",
                    "--cluster",
                    cluster,
                    "--service-name",
                    service_ref,
                ],
            )
            .await?;
        let task_arn = string_at(&tasks, "/taskArns/0", "list-tasks")?;

        let described = self
            .run_json(
                "describe-tasks",
                &["ecs", "describe-tasks", "--cluster", cluster, "--tasks", &task_arn],
            )
            .await?;

        let task = described
            .pointer("/tasks/0")
            .ok_or_else(|| ScheduleError::scheduler("describe-tasks", "no tasks in response"))?;

        let web = task
            .pointer("/containers")
            .and_then(Value::as_array)
            .and_then(|containers| {
                containers.iter().find(|c| {
                    c.pointer("/name").and_then(Value::as_str) == Some(WEB_CONTAINER)
                })
            })
            .ok_or_else(|| {
                ScheduleError::scheduler("describe-tasks", "no web container in task")
            })?;

        let host_port = web
            .pointer("/networkBindings/0/hostPort")
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                ScheduleError::scheduler("describe-tasks", "web container has no host port")
            })?;

        let container_instance = string_at(task, "/containerInstanceArn", "describe-tasks")?;
        let instances = self
            .run_json(
                "describe-container-instances",
                &[
                    "ecs",
                    "describe-container-instances",
                    "--cluster",
                    cluster,
                    "--container-instances",
                    &container_instance,
                ],
            )
            .await?;
        let instance_id = string_at(
            &instances,
            "/containerInstances/0/ec2InstanceId",
            "describe-container-instances",
        )?;

        let reservations = self
            .run_json(
                "describe-instances",
                &["ec2", "describe-instances", "--instance-ids", &instance_id],
            )
            .await?;
        let public_ip = string_at(
            &reservations,
            "/Reservations/0/Instances/0/PublicIpAddress",
            "describe-instances",
        )?;

        Ok(format!("{public_ip}:{host_port}"))
    }
}
