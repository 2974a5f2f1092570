//! Proxy record shapes
//!
//! Field names follow the proxy's configuration schema exactly; these
//! structs exist to pin the JSON the proxy expects.

use serde::{Deserialize, Serialize};

/// `{"Type":"http"}` at `/vulcand/backends/{project}/backend`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backend {
    #[serde(rename = "Type")]
    pub kind: String,
}

impl Backend {
    pub fn http() -> Self {
        Self {
            kind: "http".to_string(),
        }
    }
}

/// Frontend record at `/vulcand/frontends/{identifier}/frontend`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frontend {
    #[serde(rename = "Type")]
    pub kind: String,

    #[serde(rename = "BackendId")]
    pub backend_id: String,

    #[serde(rename = "Route")]
    pub route: String,

    #[serde(rename = "Settings")]
    pub settings: FrontendSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontendSettings {
    #[serde(rename = "TrustForwardHeader")]
    pub trust_forward_header: bool,
}

impl Frontend {
    /// Route all requests for `{identifier}.{base_domain}` to `backend_id`.
    /// Host and domain are lowercased; proxy route matching is literal.
    pub fn host_route(backend_id: &str, identifier: &str, base_domain: &str) -> Self {
        Self {
            kind: "http".to_string(),
            backend_id: backend_id.to_string(),
            route: format!(
                "Host(`{}.{}`) && PathRegexp(`/`)",
                identifier.to_lowercase(),
                base_domain.to_lowercase()
            ),
            settings: FrontendSettings {
                trust_forward_header: true,
            },
        }
    }
}

/// `{"URL":"http://host:port"}` at
/// `/vulcand/backends/{project}/servers/{key}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    #[serde(rename = "URL")]
    pub url: String,
}

impl Server {
    pub fn at(address: &str) -> Self {
        Self {
            url: format!("http://{address}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_json_matches_proxy_schema() {
        let json = serde_json::to_string(&Backend::http()).unwrap();
        assert_eq!(json, r#"{"Type":"http"}"#);
    }

    #[test]
    fn frontend_json_matches_proxy_schema() {
        let frontend = Frontend::host_route("user-app-abc12345", "User-App", "Pausapp.COM");
        let json = serde_json::to_string(&frontend).unwrap();

        assert_eq!(
            json,
            r#"{"Type":"http","BackendId":"user-app-abc12345","Route":"Host(`user-app.pausapp.com`) && PathRegexp(`/`)","Settings":{"TrustForwardHeader":true}}"#
        );
    }

    #[test]
    fn server_json_matches_proxy_schema() {
        let json = serde_json::to_string(&Server::at("10.0.1.5:32768")).unwrap();
        assert_eq!(json, r#"{"URL":"http://10.0.1.5:32768"}"#);
    }
}
