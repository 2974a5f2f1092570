//! Terminal presentation of the deploy event stream
//!
//! Everything goes to stderr; the git front end relays it verbatim to the
//! pushing user's terminal. Stage banners are bold, failures red.

use colored::Colorize;

use shipway_types::{DeployEvent, PipelineStage};

pub fn title(message: &str) {
    eprintln!("{}", format!("=====> {message}").bold());
}

pub fn line(message: &str) {
    eprintln!("       {message}");
}

pub fn error(message: &str) {
    eprintln!("{}", format!("=====> {message}").red().bold());
}

pub fn render(event: &DeployEvent) {
    match event {
        DeployEvent::StageStarted { stage } => match stage {
            PipelineStage::Unpacked => title("Repository unpacked"),
            PipelineStage::SpecPrepared => title("Compose file prepared"),
            PipelineStage::Built => title("Images built"),
            PipelineStage::Pushed => title("Images pushed"),
            PipelineStage::Scheduled => title("Service scheduled"),
            PipelineStage::HealthChecked => title("Application container is up"),
            PipelineStage::Registered => title("Routes registered"),
            PipelineStage::Cleaned => title("Workspace cleaned"),
            PipelineStage::Failed => error("Deploy failed"),
        },
        DeployEvent::BuildOutput { service, line: text } => line(&format!("[{service}] {text}")),
        DeployEvent::ImageBuilt { image } => line(&format!("Build completed: {image}")),
        DeployEvent::ImagePushed { image } => line(&format!("Push completed: {image}")),
        DeployEvent::TaskDefinitionRegistered { arn } => line(&format!("TaskDefinition: {arn}")),
        DeployEvent::ServiceCreated { service_ref } => line(&format!("Service: {service_ref}")),
        DeployEvent::HealthCheckAttempt { path, attempt } => {
            line(&format!("Health check {path} (attempt {attempt}) ..."));
        }
        DeployEvent::RoutesRegistered { identifiers } => {
            line(&format!("{} route(s) registered", identifiers.len()));
        }
        DeployEvent::DeploymentEvicted { project_name, .. } => {
            line(&format!("Evicted old deployment: {project_name}"));
        }
    }
}

/// One URL per routing identifier, lowercased.
pub fn deployed_urls(uri_scheme: &str, base_domain: &str, identifiers: &[String]) -> Vec<String> {
    identifiers
        .iter()
        .map(|identifier| format!("{uri_scheme}://{identifier}.{base_domain}").to_lowercase())
        .collect()
}

pub fn print_deployed_urls(repository: &str, uri_scheme: &str, base_domain: &str, identifiers: &[String]) {
    title(&format!("{repository} was successfully deployed!"));

    for url in deployed_urls(uri_scheme, base_domain, identifiers) {
        line(&url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_lowercased_per_identifier() {
        let urls = deployed_urls(
            "http",
            "Pausapp.COM",
            &["dtan4-rails-sample".to_string(), "dtan4-RAILS-sample-master".to_string()],
        );

        assert_eq!(
            urls,
            vec![
                "http://dtan4-rails-sample.pausapp.com".to_string(),
                "http://dtan4-rails-sample-master.pausapp.com".to_string(),
            ]
        );
    }
}
