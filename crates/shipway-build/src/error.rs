//! Build stage error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to build image for service {service}: {message}")]
    Build { service: String, message: String },

    #[error("failed to push image {image}: {message}")]
    Push { image: String, message: String },

    #[error("service {service} declares an invalid image reference")]
    ImageReference {
        service: String,
        #[source]
        source: shipway_types::ImageError,
    },

    #[error("registry operation {operation} failed for {name}: {message}")]
    Registry {
        operation: &'static str,
        name: String,
        message: String,
    },
}

/// Result type for build stage operations
pub type Result<T> = std::result::Result<T, BuildError>;
