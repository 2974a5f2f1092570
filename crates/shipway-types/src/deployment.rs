//! Deployment identity
//!
//! A Deployment is one build/release instance of an Application at a
//! specific revision. Its project name is a deterministic function of
//! repository + revision; two revisions sharing the first 8 hex characters
//! collide, which is accepted rather than deduplicated.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{Application, DeployTimestamp, IdentityError};

/// Branch receiving the bare `{user}-{app}` routing identifier.
pub const DEFAULT_BRANCH: &str = "master";

const REFS_HEADS_PREFIX: &str = "refs/heads/";

/// One build/release instance of an Application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    /// Owning application (shared with the rest of the pipeline).
    pub app: Arc<Application>,

    /// Branch name, refname with the `refs/heads/` prefix stripped.
    pub branch: String,

    /// Full commit hash.
    pub revision: String,

    /// `{repository}-{revision[..8]}`, the per-deployment unique name.
    pub project_name: String,

    /// Creation time; history key and uniqueness tiebreak.
    pub timestamp: DeployTimestamp,

    /// Where the prepared compose file is written for this deployment.
    pub compose_file_path: PathBuf,
}

impl Deployment {
    pub fn new(
        app: Arc<Application>,
        refname: &str,
        timestamp: DeployTimestamp,
        repository_dir: &Path,
    ) -> Result<Self, IdentityError> {
        let short = app
            .revision
            .get(..8)
            .ok_or_else(|| IdentityError::ShortRevision(app.revision.clone()))?;
        let project_name = format!("{}-{}", app.repository, short);

        let branch = refname
            .strip_prefix(REFS_HEADS_PREFIX)
            .unwrap_or(refname)
            .to_string();

        let compose_file_path = repository_dir
            .join(&app.username)
            .join(&project_name)
            .join(format!("docker-compose-{timestamp}.yml"));

        Ok(Self {
            branch,
            revision: app.revision.clone(),
            project_name,
            timestamp,
            compose_file_path,
            app,
        })
    }

    /// Directory the pushed repository is unpacked into.
    pub fn repository_path(&self, repository_dir: &Path) -> PathBuf {
        repository_dir.join(&self.app.username).join(&self.project_name)
    }

    /// Revision-qualified routing identifier, unique to this deployment.
    pub fn revision_identifier(&self) -> String {
        self.project_name.to_lowercase()
    }

    /// Branch-qualified routing identifier, shared by deployments of the
    /// same branch.
    pub fn branch_identifier(&self) -> String {
        sanitize_label(&format!(
            "{}-{}-{}",
            self.app.username, self.app.app_name, self.branch
        ))
    }

    /// All routing identifiers for this deployment, in registration order.
    /// The bare `{user}-{app}` identifier is only present for the default
    /// branch.
    pub fn routing_identifiers(&self) -> Vec<String> {
        let mut identifiers = vec![self.revision_identifier(), self.branch_identifier()];

        if self.branch == DEFAULT_BRANCH {
            identifiers.push(sanitize_label(&format!(
                "{}-{}",
                self.app.username, self.app.app_name
            )));
        }

        identifiers
    }
}

/// Make a string safe as a hostname label: anything outside `[a-zA-Z0-9.-]`
/// becomes `-`, the result is truncated to 63 characters, trailing `.` and
/// `-` are stripped, and the whole label is lowercased.
pub fn sanitize_label(raw: &str) -> String {
    let mut label: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();

    label.truncate(63);

    let trimmed = label.trim_end_matches(['.', '-']);
    trimmed.to_lowercase()
}
