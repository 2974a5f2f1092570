//! Typed service configuration
//!
//! Only the fields the pipeline reads or mutates are modeled; everything
//! else a user declares is carried through `extra` untouched so saving the
//! file never drops configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One service entry in the compose file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildConfig>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<PortValue>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_shares: Option<i64>,

    /// Memory limit in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mem_limit: Option<i64>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes_from: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_hosts: Vec<String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub ulimits: BTreeMap<String, Ulimit>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub privileged: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,

    /// Unmodeled keys, preserved verbatim across load/save.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl ServiceConfig {
    /// Runtime environment as a key/value map. List entries without `=`
    /// resolve to an empty value.
    pub fn environment_map(&self) -> BTreeMap<String, String> {
        match &self.environment {
            None => BTreeMap::new(),
            Some(Environment::Map(map)) => map.clone(),
            Some(Environment::List(entries)) => entries
                .iter()
                .map(|entry| match entry.split_once('=') {
                    Some((k, v)) => (k.to_string(), v.to_string()),
                    None => (entry.clone(), String::new()),
                })
                .collect(),
        }
    }

    /// Overwrite the environment with `KEY=VALUE` list entries, sorted by
    /// key for deterministic output.
    pub fn set_environment_map(&mut self, map: BTreeMap<String, String>) {
        let entries = map
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        self.environment = Some(Environment::List(entries));
    }
}

/// `build:` accepts a bare context string or a detailed section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BuildConfig {
    Context(String),
    Detailed(BuildSection),
}

impl BuildConfig {
    pub fn context(&self) -> &str {
        match self {
            Self::Context(context) => context,
            Self::Detailed(section) => &section.context,
        }
    }

    pub fn dockerfile(&self) -> Option<&str> {
        match self {
            Self::Context(_) => None,
            Self::Detailed(section) => section.dockerfile.as_deref(),
        }
    }

    /// Build args as a map; the list form parses as `KEY=VALUE`.
    pub fn args_map(&self) -> BTreeMap<String, String> {
        let args = match self {
            Self::Context(_) => return BTreeMap::new(),
            Self::Detailed(section) => &section.args,
        };

        match args {
            None => BTreeMap::new(),
            Some(BuildArgs::Map(map)) => map.clone(),
            Some(BuildArgs::List(entries)) => entries
                .iter()
                .map(|entry| match entry.split_once('=') {
                    Some((k, v)) => (k.to_string(), v.to_string()),
                    None => (entry.clone(), String::new()),
                })
                .collect(),
        }
    }

    /// Normalize to the detailed section and replace the args map.
    pub fn set_args_map(&mut self, args: BTreeMap<String, String>) {
        let mut section = match self {
            Self::Context(context) => BuildSection {
                context: context.clone(),
                dockerfile: None,
                args: None,
            },
            Self::Detailed(section) => section.clone(),
        };

        section.args = Some(BuildArgs::Map(args));
        *self = Self::Detailed(section);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildSection {
    pub context: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<BuildArgs>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BuildArgs {
    List(Vec<String>),
    Map(BTreeMap<String, String>),
}

/// `environment:` accepts a `KEY=VALUE` list or a map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Environment {
    List(Vec<String>),
    Map(BTreeMap<String, String>),
}

/// Port declarations appear as bare integers or strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortValue {
    Number(i64),
    Text(String),
}

impl PortValue {
    pub fn as_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

/// `ulimits:` entries are a single limit or explicit soft/hard pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ulimit {
    Single(i64),
    SoftHard { soft: i64, hard: i64 },
}

impl Ulimit {
    pub fn soft(&self) -> i64 {
        match self {
            Self::Single(n) => *n,
            Self::SoftHard { soft, .. } => *soft,
        }
    }

    pub fn hard(&self) -> i64 {
        match self {
            Self::Single(n) => *n,
            Self::SoftHard { hard, .. } => *hard,
        }
    }
}
