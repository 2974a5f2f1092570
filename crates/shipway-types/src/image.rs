//! Container image references
//!
//! An image reference is `registry/name:tag`. Parsing is the inverse of
//! formatting for any reference with non-empty fields, including
//! registry-less `name[:tag]` and multi-segment `group/name` forms.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Registry domain suffixes recognized in the ambiguous one-slash case.
/// `registry.example.amazonaws.com/app` is a registry+name; `org/app` is a
/// two-segment name.
const REGISTRY_DOMAIN_SUFFIXES: &[&str] = &["amazonaws.com"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("invalid image string: {0}")]
    Format(String),
}

/// A reference to a built container artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// `host[:port]`, empty for the default registry.
    pub registry: String,

    /// Image name, possibly containing a path segment (`group/name`).
    pub name: String,

    pub tag: String,
}

impl Image {
    pub fn new(registry: &str, name: &str, tag: &str) -> Self {
        Self {
            registry: registry.to_string(),
            name: name.to_string(),
            tag: tag.to_string(),
        }
    }

    /// Parse an image string.
    ///
    /// The tag is split on the last `:`; more than one tag-like segment is
    /// rejected. The remainder splits on `/`: zero slashes is a bare name,
    /// two or more make the first segment the registry, and the ambiguous
    /// one-slash case is a registry only when the first segment carries a
    /// recognized registry domain suffix.
    pub fn parse(s: &str) -> Result<Self, ImageError> {
        let segments: Vec<&str> = s.split(':').collect();

        if segments.len() >= 3 {
            return Err(ImageError::Format(s.to_string()));
        }

        let tag = if segments.len() == 2 { segments[1] } else { "" };
        let repo = segments[0];

        let (registry, name) = match repo.split_once('/') {
            None => ("", repo),
            Some((first, rest)) => {
                if rest.contains('/') || is_registry_domain(first) {
                    (first, rest)
                } else {
                    ("", repo)
                }
            }
        };

        Ok(Self::new(registry, name, tag))
    }
}

fn is_registry_domain(segment: &str) -> bool {
    REGISTRY_DOMAIN_SUFFIXES
        .iter()
        .any(|suffix| segment.ends_with(suffix))
}

impl fmt::Display for Image {
    /// Always `registry/name:tag`, even when registry or tag is empty;
    /// callers must tolerate the degenerate leading `/` or trailing `:`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.registry, self.name, self.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_name() {
        assert_eq!(Image::parse("nginx").unwrap(), Image::new("", "nginx", ""));
        assert_eq!(
            Image::parse("nginx:1.9").unwrap(),
            Image::new("", "nginx", "1.9")
        );
    }

    #[test]
    fn one_slash_without_registry_suffix_is_a_two_segment_name() {
        assert_eq!(
            Image::parse("quay/redis:latest").unwrap(),
            Image::new("", "quay/redis", "latest")
        );
    }

    #[test]
    fn one_slash_with_registry_suffix_is_registry_and_name() {
        assert_eq!(
            Image::parse("123456.dkr.ecr.us-east-1.amazonaws.com/app:v1").unwrap(),
            Image::new("123456.dkr.ecr.us-east-1.amazonaws.com", "app", "v1")
        );
    }

    #[test]
    fn two_slashes_always_split_registry_first() {
        assert_eq!(
            Image::parse("registry.example.com/group/app:v2").unwrap(),
            Image::new("registry.example.com", "group/app", "v2")
        );
    }

    #[test]
    fn rejects_multiple_tag_segments() {
        assert!(matches!(
            Image::parse("registry:5000/app:v1"),
            Err(ImageError::Format(_))
        ));
    }

    #[test]
    fn format_keeps_degenerate_separators() {
        assert_eq!(Image::new("", "app", "").to_string(), "/app:");
    }

    #[test]
    fn parse_inverts_format_for_full_references() {
        let images = [
            Image::new("123.dkr.ecr.ap-northeast-1.amazonaws.com", "dtan4-rails-sample-web", "3e634e41"),
            Image::new("registry.example.com", "group/app", "latest"),
        ];

        for img in images {
            assert_eq!(Image::parse(&img.to_string()).unwrap(), img);
        }
    }
}
