//! Module registry API implementation (service discovery + versions listing)

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::config::{RegistryConfig, USER_AGENT};
use crate::source::RegistrySource;
use crate::version::error::FetchError;
use crate::version::semver::VersionSet;

/// Scheme used for service discovery and relative base paths
const DEFAULT_DISCOVERY_SCHEME: &str = "https";

/// Service discovery document path
const DISCOVERY_PATH: &str = ".well-known/terraform.json";

/// Response from `/.well-known/terraform.json`
#[derive(Debug, Deserialize)]
struct DiscoveryResponse {
    #[serde(rename = "modules.v1")]
    modules_v1: Option<String>,
}

/// Response from `{base}{namespace}/{name}/{target}/versions`
#[derive(Debug, Deserialize)]
struct VersionsResponse {
    modules: Vec<ModuleVersions>,
}

#[derive(Debug, Deserialize)]
struct ModuleVersions {
    versions: Vec<VersionEntry>,
}

#[derive(Debug, Deserialize)]
struct VersionEntry {
    version: String,
}

/// Client for the module registry protocol
pub struct RegistryClient {
    client: reqwest::Client,
    discovery_scheme: String,
}

impl RegistryClient {
    /// Creates a client sending the configured headers with every request
    pub fn new(config: &RegistryConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let invalid = || FetchError::InvalidHeader { name: name.clone() };
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
            headers.append(header_name, header_value);
        }

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            discovery_scheme: DEFAULT_DISCOVERY_SCHEME.to_string(),
        })
    }

    /// Overrides the scheme used to reach registry hosts (plain `http` for local registries)
    pub fn with_discovery_scheme(mut self, scheme: &str) -> Self {
        self.discovery_scheme = scheme.to_string();
        self
    }

    /// Resolves the modules API base URL of `host`
    pub async fn discover(&self, host: &str) -> Result<Url, FetchError> {
        let url = format!("{}://{}/{}", self.discovery_scheme, host, DISCOVERY_PATH);
        let discovery: DiscoveryResponse = self.get_json(&url).await?;

        let base = discovery
            .modules_v1
            .filter(|base| !base.is_empty())
            .ok_or_else(|| FetchError::NoModuleRegistryHost {
                host: host.to_string(),
            })?;

        // A relative base inherits scheme and host from the registry host
        let base_url = Url::parse(&format!("{}://{}/", self.discovery_scheme, host))
            .and_then(|host_url| host_url.join(&base))
            .map_err(|source| FetchError::BaseUrl {
                host: host.to_string(),
                base: base.clone(),
                source,
            })?;

        debug!("Module registry for {} is at {}", host, base_url);
        Ok(base_url)
    }

    /// Lists every version published for a registry module
    pub async fn list_versions(&self, source: &RegistrySource) -> Result<VersionSet, FetchError> {
        let base = self.discover(&source.hostname).await?;
        let url = format!(
            "{}{}/{}/{}/versions",
            base, source.namespace, source.name, source.target
        );

        let response: VersionsResponse = self.get_json(&url).await?;
        let versions = response
            .modules
            .into_iter()
            .flat_map(|module| module.versions)
            .map(|entry| entry.version);

        Ok(VersionSet::from_texts(versions))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Module registry returned status {}: {}", status, url);
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        response.json().await.map_err(|source| {
            warn!("Failed to parse module registry response from {}: {}", url, source);
            FetchError::Decode {
                url: url.to_string(),
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use std::collections::HashMap;

    fn client() -> RegistryClient {
        RegistryClient::new(&RegistryConfig::default())
            .unwrap()
            .with_discovery_scheme("http")
    }

    fn source(server: &Server, address: &str) -> RegistrySource {
        RegistrySource::parse(&format!("{}/{}", server.host_with_port(), address)).unwrap()
    }

    async fn mock_discovery(server: &mut Server, body: &str) -> mockito::Mock {
        server
            .mock("GET", "/.well-known/terraform.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn discover_resolves_relative_base_against_host() {
        let mut server = Server::new_async().await;
        let mock = mock_discovery(&mut server, r#"{"modules.v1": "/v1/modules/"}"#).await;

        let result = client().discover(&server.host_with_port()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(result.as_str(), format!("{}/v1/modules/", server.url()));
    }

    #[tokio::test]
    async fn discover_keeps_absolute_base() {
        let mut server = Server::new_async().await;
        let mock = mock_discovery(
            &mut server,
            r#"{"modules.v1": "https://modules.example.com/api/v1/"}"#,
        )
        .await;

        let result = client().discover(&server.host_with_port()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(result.as_str(), "https://modules.example.com/api/v1/");
    }

    #[tokio::test]
    async fn discover_returns_no_module_registry_host_without_modules_v1() {
        let mut server = Server::new_async().await;
        let mock = mock_discovery(&mut server, r#"{"providers.v1": "/v1/providers/"}"#).await;

        let host = server.host_with_port();
        let result = client().discover(&host).await;

        mock.assert_async().await;
        assert!(matches!(
            result,
            Err(FetchError::NoModuleRegistryHost { host: h }) if h == host
        ));
    }

    #[tokio::test]
    async fn list_versions_flattens_all_module_entries() {
        let mut server = Server::new_async().await;
        let discovery = mock_discovery(&mut server, r#"{"modules.v1": "/v1/modules/"}"#).await;
        let versions = server
            .mock("GET", "/v1/modules/acme/network/aws/versions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "modules": [
                        {"versions": [{"version": "1.1.0"}, {"version": "1.0.0"}]},
                        {"versions": [{"version": "2.0.0-beta"}, {"version": "garbage"}]}
                    ]
                }"#,
            )
            .create_async()
            .await;

        let result = client()
            .list_versions(&source(&server, "acme/network/aws"))
            .await
            .unwrap();

        discovery.assert_async().await;
        versions.assert_async().await;
        let texts: Vec<_> = result.candidates().iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["1.0.0", "1.1.0", "2.0.0-beta"]);
        assert_eq!(result.unparsable(), &["garbage".to_string()]);
    }

    #[tokio::test]
    async fn list_versions_returns_status_error_for_unknown_module() {
        let mut server = Server::new_async().await;
        let _discovery = mock_discovery(&mut server, r#"{"modules.v1": "/v1/modules/"}"#).await;
        let versions = server
            .mock("GET", "/v1/modules/acme/missing/aws/versions")
            .with_status(404)
            .create_async()
            .await;

        let result = client()
            .list_versions(&source(&server, "acme/missing/aws"))
            .await;

        versions.assert_async().await;
        assert!(matches!(
            result,
            Err(FetchError::Status { status, .. }) if status == reqwest::StatusCode::NOT_FOUND
        ));
    }

    #[tokio::test]
    async fn list_versions_returns_decode_error_for_malformed_json() {
        let mut server = Server::new_async().await;
        let _discovery = mock_discovery(&mut server, r#"{"modules.v1": "/v1/modules/"}"#).await;
        let _versions = server
            .mock("GET", "/v1/modules/acme/network/aws/versions")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let result = client()
            .list_versions(&source(&server, "acme/network/aws"))
            .await;

        assert!(matches!(result, Err(FetchError::Decode { .. })));
    }

    #[tokio::test]
    async fn configured_headers_are_sent_with_every_request() {
        let mut server = Server::new_async().await;
        let discovery = server
            .mock("GET", "/.well-known/terraform.json")
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_body(r#"{"modules.v1": "/v1/modules/"}"#)
            .create_async()
            .await;
        let versions = server
            .mock("GET", "/v1/modules/acme/network/aws/versions")
            .match_header("authorization", "Bearer secret")
            .match_header("user-agent", Matcher::Exact(USER_AGENT.to_string()))
            .with_status(200)
            .with_body(r#"{"modules": []}"#)
            .create_async()
            .await;

        let config = RegistryConfig {
            headers: HashMap::from([("Authorization".to_string(), "Bearer secret".to_string())]),
            ..RegistryConfig::default()
        };
        let client = RegistryClient::new(&config)
            .unwrap()
            .with_discovery_scheme("http");

        let result = client
            .list_versions(&source(&server, "acme/network/aws"))
            .await
            .unwrap();

        discovery.assert_async().await;
        versions.assert_async().await;
        assert!(result.is_empty());
    }

    #[test]
    fn new_rejects_invalid_header_name() {
        let config = RegistryConfig {
            headers: HashMap::from([("Bad Header".to_string(), "x".to_string())]),
            ..RegistryConfig::default()
        };

        let result = RegistryClient::new(&config);

        assert!(matches!(result, Err(FetchError::InvalidHeader { name }) if name == "Bad Header"));
    }
}
