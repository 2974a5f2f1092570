//! Application identity
//!
//! An Application is the logical deployable unit: a user's repository as the
//! control plane registered it. It is constructed once per push invocation
//! and immutable afterwards.

use serde::{Deserialize, Serialize};

/// A logical deployable unit, derived from push arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    /// Repository identifier, `owner/repo` with `/` flattened to `-`.
    pub repository: String,

    /// Full commit hash of the pushed revision.
    pub revision: String,

    /// Pushing user.
    pub username: String,

    /// Repository with one leading `{username}-` occurrence stripped.
    pub app_name: String,
}

impl Application {
    /// Derive an Application from the raw `repository`, `revision`, and
    /// `username` push arguments.
    ///
    /// The `{username}-` prefix is removed exactly once, so an app the user
    /// named with their own prefix (`alice-alice-blog` pushed by `alice`)
    /// keeps one occurrence.
    pub fn new(repository: &str, revision: &str, username: &str) -> Self {
        let repository = repository.replace('/', "-");
        let app_name = repository.replacen(&format!("{username}-"), "", 1);

        Self {
            repository,
            revision: revision.to_string(),
            username: username.to_string(),
            app_name,
        }
    }

    /// Task-definition family name for this application.
    pub fn task_definition_name(&self) -> String {
        format!("{}-{}", self.username, self.app_name)
    }

    /// Cluster service name, unique per deploy invocation.
    pub fn service_name(&self, timestamp: &crate::DeployTimestamp) -> String {
        format!("{}-{}-{}", self.username, self.app_name, timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DeployTimestamp;

    #[test]
    fn app_name_strips_username_prefix_once() {
        let app = Application::new("dtan4/rails-sample", "3e634e41d5a8", "dtan4");

        assert_eq!(app.repository, "dtan4-rails-sample");
        assert_eq!(app.app_name, "rails-sample");
    }

    #[test]
    fn app_name_keeps_second_prefix_occurrence() {
        let app = Application::new("alice/alice-blog", "deadbeefcafe", "alice");

        assert_eq!(app.repository, "alice-alice-blog");
        assert_eq!(app.app_name, "alice-blog");
    }

    #[test]
    fn extraction_is_idempotent_once_prefix_is_gone() {
        let app = Application::new("dtan4/rails-sample", "3e634e41d5a8", "dtan4");
        let again = Application::new(&format!("dtan4/{}", app.app_name), "3e634e41d5a8", "dtan4");

        assert_eq!(again.app_name, app.app_name);
    }

    #[test]
    fn derived_names() {
        let app = Application::new("dtan4/rails-sample", "3e634e41d5a8", "dtan4");
        let ts = DeployTimestamp::from_epoch(1467_100_000);

        assert_eq!(app.task_definition_name(), "dtan4-rails-sample");
        assert_eq!(app.service_name(&ts), "dtan4-rails-sample-1467100000");
    }
}
