//! Ambient (default chain) identity discovery.
//!
//! Used when a request carries no explicit credential. Nothing here runs while
//! a client is being built; the chain is consulted on the first signed request
//! and the result is cached until shortly before it expires.
//!
//! Lookup order:
//! 1. `ALIBABA_CLOUD_ACCESS_KEY_ID` / `ALIBABA_CLOUD_ACCESS_KEY_SECRET`
//!    (+ optional `ALIBABA_CLOUD_SECURITY_TOKEN`)
//! 2. ECS RAM role named by `ALIBABA_CLOUD_ECS_METADATA`, fetched from the
//!    instance metadata service

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::secret::SecretString;
use crate::errors::{AckError, Result};

/// Environment variable holding the default-chain AccessKey id
pub const ENV_ACCESS_KEY_ID: &str = "ALIBABA_CLOUD_ACCESS_KEY_ID";
/// Environment variable holding the default-chain AccessKey secret
pub const ENV_ACCESS_KEY_SECRET: &str = "ALIBABA_CLOUD_ACCESS_KEY_SECRET";
/// Environment variable holding an optional default-chain STS token
pub const ENV_SECURITY_TOKEN: &str = "ALIBABA_CLOUD_SECURITY_TOKEN";
/// Environment variable naming the ECS RAM role
pub const ENV_ECS_ROLE: &str = "ALIBABA_CLOUD_ECS_METADATA";

const DEFAULT_METADATA_ENDPOINT: &str = "http://100.100.100.200";

/// Role credentials are refreshed this long before they expire.
const REFRESH_MARGIN_MINUTES: i64 = 5;

/// Concrete key material used to sign one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningKey {
    pub access_key_id: String,
    pub access_key_secret: SecretString,
    pub security_token: Option<SecretString>,
}

#[derive(Debug, Clone)]
struct CachedRoleKey {
    key: SigningKey,
    refresh_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RoleCredentialsResponse {
    code: Option<String>,
    access_key_id: String,
    access_key_secret: SecretString,
    security_token: SecretString,
    expiration: DateTime<Utc>,
}

/// Default identity chain shared by every ambient client in the process.
#[derive(Debug)]
pub struct AmbientChain {
    http: reqwest::Client,
    metadata_endpoint: String,
    role_key: Mutex<Option<CachedRoleKey>>,
}

impl AmbientChain {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_metadata_endpoint(http, DEFAULT_METADATA_ENDPOINT)
    }

    /// Point the ECS metadata lookup somewhere else (tests, proxies)
    pub fn with_metadata_endpoint(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            metadata_endpoint: endpoint.into().trim_end_matches('/').to_string(),
            role_key: Mutex::new(None),
        }
    }

    /// Resolve the current signing key.
    pub async fn signing_key(&self) -> Result<SigningKey> {
        if let Some(key) = key_from_env() {
            debug!("Using default chain credentials from environment");
            return Ok(key);
        }

        let role = std::env::var(ENV_ECS_ROLE).ok().filter(|r| !r.trim().is_empty());
        match role {
            Some(role) => self.role_key(role.trim()).await,
            None => Err(AckError::invalid_credential(format!(
                "no ambient credentials available: set {} / {} or {}",
                ENV_ACCESS_KEY_ID, ENV_ACCESS_KEY_SECRET, ENV_ECS_ROLE
            ))),
        }
    }

    async fn role_key(&self, role: &str) -> Result<SigningKey> {
        let mut cached = self.role_key.lock().await;
        if let Some(entry) = cached.as_ref() {
            if Utc::now() < entry.refresh_at {
                return Ok(entry.key.clone());
            }
        }

        let url = format!(
            "{}/latest/meta-data/ram/security-credentials/{}",
            self.metadata_endpoint,
            urlencoding::encode(role)
        );
        let response = self.http.get(&url).send().await.map_err(|e| {
            AckError::invalid_credential(format!("ECS metadata request failed: {}", e))
        })?;
        if !response.status().is_success() {
            return Err(AckError::invalid_credential(format!(
                "ECS metadata returned status {} for role '{}'",
                response.status(),
                role
            )));
        }
        let body: RoleCredentialsResponse = response.json().await.map_err(|e| {
            AckError::invalid_credential(format!("malformed ECS role credentials: {}", e))
        })?;
        if body.code.as_deref().is_some_and(|c| c != "Success") {
            return Err(AckError::invalid_credential(format!(
                "ECS metadata refused credentials for role '{}'",
                role
            )));
        }

        let key = SigningKey {
            access_key_id: body.access_key_id,
            access_key_secret: body.access_key_secret,
            security_token: Some(body.security_token),
        };
        let refresh_at = body.expiration - ChronoDuration::minutes(REFRESH_MARGIN_MINUTES);
        info!(role = %role, expires_at = %body.expiration, "Refreshed ECS RAM role credentials");

        *cached = Some(CachedRoleKey { key: key.clone(), refresh_at });
        Ok(key)
    }
}

fn key_from_env() -> Option<SigningKey> {
    let id = std::env::var(ENV_ACCESS_KEY_ID).ok().filter(|v| !v.trim().is_empty())?;
    let secret = std::env::var(ENV_ACCESS_KEY_SECRET).ok().filter(|v| !v.trim().is_empty())?;
    let token = std::env::var(ENV_SECURITY_TOKEN).ok().filter(|v| !v.trim().is_empty());

    Some(SigningKey {
        access_key_id: id.trim().to_string(),
        access_key_secret: SecretString::new(secret.trim()),
        security_token: token.map(SecretString::new),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_response_parses() {
        let json = r#"{
            "AccessKeyId": "STS.abc",
            "AccessKeySecret": "secret",
            "SecurityToken": "token",
            "Expiration": "2030-01-01T00:00:00Z",
            "Code": "Success"
        }"#;
        let parsed: RoleCredentialsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.access_key_id, "STS.abc");
        assert_eq!(parsed.security_token.expose_secret(), "token");
        assert_eq!(parsed.code.as_deref(), Some("Success"));
    }
}
