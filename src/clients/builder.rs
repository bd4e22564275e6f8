//! Client construction.
//!
//! Building a client is synchronous and never touches the network: the
//! endpoint is derived from the service template (or the configured
//! override) and key material is either captured or deferred to the
//! ambient chain.

use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;

use super::client::{KeySource, ServiceClient};
use super::service::ServiceKind;
use crate::credentials::{AmbientChain, Credential};
use crate::errors::{AckError, Result};

/// Seam between the client cache and SDK-level client construction
pub trait ClientBuilder: Send + Sync {
    fn build(&self, credential: &Credential, region: &str, service: ServiceKind)
        -> Result<ServiceClient>;
}

/// HTTP settings shared by every client a builder produces
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Per-request timeout; provisioning inherits it
    pub timeout: Duration,
    /// Base URL replacing every service endpoint (private gateways, tests)
    pub endpoint_override: Option<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(30), endpoint_override: None }
    }
}

/// Builds [`ServiceClient`]s over one shared connection pool
#[derive(Debug, Clone)]
pub struct HttpClientBuilder {
    http: reqwest::Client,
    settings: ClientSettings,
    ambient: Arc<AmbientChain>,
}

impl HttpClientBuilder {
    pub fn new(settings: ClientSettings) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(settings.timeout).build().map_err(|e| {
            AckError::ClientBuild {
                service: "http".to_string(),
                region: String::new(),
                message: "Failed to create HTTP client".to_string(),
                source: Some(Box::new(e)),
            }
        })?;
        let ambient = Arc::new(AmbientChain::new(http.clone()));
        Ok(Self { http, settings, ambient })
    }

    /// Use a specific ambient chain (e.g. one pointed at a fake metadata service)
    pub fn with_ambient(mut self, ambient: Arc<AmbientChain>) -> Self {
        self.ambient = ambient;
        self
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.http
    }

    fn base_url(&self, region: &str, service: ServiceKind) -> Result<(String, String)> {
        let raw = match &self.settings.endpoint_override {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://{}", service.endpoint(region)),
        };
        let url = Url::parse(&raw).map_err(|e| {
            AckError::client_build(service.as_str(), region, format!("Malformed endpoint '{}': {}", raw, e))
        })?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(AckError::client_build(
                    service.as_str(),
                    region,
                    format!("Endpoint '{}' has no host", raw),
                ))
            }
        };
        Ok((raw.trim_end_matches('/').to_string(), host))
    }
}

impl ClientBuilder for HttpClientBuilder {
    fn build(
        &self,
        credential: &Credential,
        region: &str,
        service: ServiceKind,
    ) -> Result<ServiceClient> {
        let region = region.trim();
        if region.is_empty() && !service.is_central() {
            return Err(AckError::client_build(service.as_str(), region, "region is required"));
        }
        if !region.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(AckError::client_build(service.as_str(), region, "malformed region id"));
        }

        let (base_url, host) = self.base_url(region, service)?;
        let keys = KeySource::for_credential(credential, &self.ambient);
        Ok(ServiceClient::new(
            self.http.clone(),
            base_url,
            host,
            region.to_string(),
            service,
            credential,
            keys,
        ))
    }
}
