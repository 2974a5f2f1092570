//! Cluster task definition model
//!
//! A task definition is the scheduler-side description of one deployment:
//! one container definition per compose service plus the shared volume
//! table. Serialized as JSON when handed to the external scheduler.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    pub family: String,
    pub container_definitions: Vec<ContainerDefinition>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub volumes: Vec<Volume>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDefinition {
    pub name: String,
    pub image: String,
    pub cpu: i64,

    /// Memory limit in MiB.
    pub memory: i64,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub environment: Vec<KeyValuePair>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub port_mappings: Vec<PortMapping>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub volumes_from: Vec<VolumeFrom>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub mount_points: Vec<MountPoint>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub extra_hosts: Vec<HostEntry>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub links: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub ulimits: Vec<UlimitDefinition>,

    pub log_configuration: LogConfiguration,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub hostname: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub working_directory: Option<String>,

    pub privileged: bool,
    pub readonly_root_filesystem: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValuePair {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    pub container_port: i64,

    /// Zero requests a scheduler-assigned host port.
    pub host_port: i64,

    pub protocol: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeFrom {
    pub source_container: String,
    pub read_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountPoint {
    pub source_volume: String,
    pub container_path: String,
    pub read_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostEntry {
    pub hostname: String,
    pub ip_address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UlimitDefinition {
    pub name: String,
    pub soft_limit: i64,
    pub hard_limit: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConfiguration {
    pub log_driver: String,
    pub options: std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub name: String,
    pub source_path: String,
}
