//! Authenticated OpenAPI client for one (identity, region, service) triple.

use chrono::Utc;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace, Instrument};

use super::service::ServiceKind;
use super::signer::{self, RequestToSign};
use crate::credentials::{redact_key_id, AmbientChain, Credential, SigningKey};
use crate::errors::{AckError, Result};

/// Where a client gets its signing key from
#[derive(Debug, Clone)]
pub enum KeySource {
    /// Key material fixed at build time (AccessKey or STS session)
    Static(SigningKey),
    /// Default identity chain, consulted per request
    Ambient(Arc<AmbientChain>),
}

impl KeySource {
    /// Key source for a resolved credential
    pub fn for_credential(credential: &Credential, ambient: &Arc<AmbientChain>) -> Self {
        match credential {
            Credential::AccessKey { id, secret } => Self::Static(SigningKey {
                access_key_id: id.clone(),
                access_key_secret: secret.clone(),
                security_token: None,
            }),
            Credential::Session { id, secret, token } => Self::Static(SigningKey {
                access_key_id: id.clone(),
                access_key_secret: secret.clone(),
                security_token: Some(token.clone()),
            }),
            Credential::Ambient => Self::Ambient(Arc::clone(ambient)),
        }
    }

    async fn signing_key(&self) -> Result<SigningKey> {
        match self {
            Self::Static(key) => Ok(key.clone()),
            Self::Ambient(chain) => chain.signing_key().await,
        }
    }
}

/// One OpenAPI call in ROA style (method + resource path + query)
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub action: String,
    pub method: Method,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(action: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            method: Method::GET,
            path: path.into(),
            query: BTreeMap::new(),
            body: None,
        }
    }

    pub fn post(action: impl Into<String>, path: impl Into<String>, body: Value) -> Self {
        Self { body: Some(body), method: Method::POST, ..Self::get(action, path) }
    }

    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.insert(name.into(), value.to_string());
        self
    }
}

/// Error body returned by the control plane.
///
/// Field casing differs between products, so both spellings are accepted.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(alias = "Code")]
    code: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
    #[serde(alias = "RequestId", alias = "request_id")]
    #[serde(rename = "requestId")]
    request_id: Option<String>,
}

/// Ready-to-use client. Cheap to share behind an `Arc`.
#[derive(Debug)]
pub struct ServiceClient {
    http: reqwest::Client,
    base_url: String,
    host: String,
    region: String,
    service: ServiceKind,
    credential_kind: &'static str,
    redacted_id: String,
    keys: KeySource,
}

impl ServiceClient {
    pub(crate) fn new(
        http: reqwest::Client,
        base_url: String,
        host: String,
        region: String,
        service: ServiceKind,
        credential: &Credential,
        keys: KeySource,
    ) -> Self {
        Self {
            http,
            base_url,
            host,
            region,
            service,
            credential_kind: credential.kind(),
            redacted_id: credential.redacted_id(),
            keys,
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn service(&self) -> ServiceKind {
        self.service
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Strategy name of the credential this client signs with
    pub fn credential_kind(&self) -> &'static str {
        self.credential_kind
    }

    /// Key id (last four characters only) of a static credential
    pub fn redacted_key_id(&self) -> &str {
        &self.redacted_id
    }

    /// Sign and send `request`, returning the decoded JSON body.
    pub async fn call(&self, request: ApiRequest) -> Result<Value> {
        let span = crate::api_span!(request.action, self.region);
        self.send(request).instrument(span).await
    }

    async fn send(&self, request: ApiRequest) -> Result<Value> {
        let key = self.keys.signing_key().await?;
        let body = match &request.body {
            Some(value) => serde_json::to_vec(value).map_err(|e| {
                AckError::client_build(self.service.as_str(), &self.region, e.to_string())
            })?,
            None => Vec::new(),
        };
        let content_type = request.body.as_ref().map(|_| "application/json");

        let to_sign = RequestToSign {
            method: request.method.as_str(),
            host: &self.host,
            path: &request.path,
            query: &request.query,
            body: &body,
            content_type,
            action: &request.action,
            version: self.service.api_version(),
        };
        let nonce = uuid::Uuid::new_v4().to_string();
        let headers = signer::sign(&to_sign, &key, Utc::now(), &nonce)?;

        let mut url = format!("{}{}", self.base_url, request.path);
        if !request.query.is_empty() {
            url.push('?');
            url.push_str(&signer::canonical_query(&request.query));
        }
        debug!(
            action = %request.action,
            service = %self.service,
            region = %self.region,
            access_key_id = %redact_key_id(&key.access_key_id),
            "{} {}", request.method, url
        );

        let mut builder = self.http.request(request.method.clone(), &url);
        // reqwest sets Host from the URL.
        for (name, value) in headers.iter().filter(|(name, _)| name.as_str() != "host") {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !body.is_empty() {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| AckError::http(&request.action, e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| AckError::http(&request.action, e))?;
        trace!(action = %request.action, status = %status, "Response body:\n{}", text);

        if !status.is_success() {
            let parsed: ApiErrorBody = serde_json::from_str(&text).unwrap_or_default();
            return Err(AckError::Api {
                action: request.action,
                status: status.as_u16(),
                code: parsed.code.unwrap_or_else(|| status.to_string()),
                message: parsed.message.unwrap_or(text),
                request_id: parsed.request_id,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| AckError::Api {
            action: request.action,
            status: status.as_u16(),
            code: "InvalidResponse".to_string(),
            message: format!("Response is not valid JSON: {}", e),
            request_id: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::SecretString;

    #[test]
    fn test_key_source_follows_credential() {
        let ambient = Arc::new(AmbientChain::new(reqwest::Client::new()));

        let session = Credential::Session {
            id: "STS.1".into(),
            secret: SecretString::new("s"),
            token: SecretString::new("t"),
        };
        match KeySource::for_credential(&session, &ambient) {
            KeySource::Static(key) => {
                assert_eq!(key.security_token.as_ref().map(|t| t.expose_secret()), Some("t"))
            }
            KeySource::Ambient(_) => panic!("session must sign with its own key"),
        }

        assert!(matches!(
            KeySource::for_credential(&Credential::Ambient, &ambient),
            KeySource::Ambient(_)
        ));
    }

    #[test]
    fn test_error_body_accepts_both_casings() {
        let lower: ApiErrorBody =
            serde_json::from_str(r#"{"code":"ErrorClusterNotFound","message":"gone","requestId":"r-1"}"#)
                .unwrap();
        assert_eq!(lower.code.as_deref(), Some("ErrorClusterNotFound"));
        assert_eq!(lower.request_id.as_deref(), Some("r-1"));

        let upper: ApiErrorBody =
            serde_json::from_str(r#"{"Code":"Forbidden.RAM","Message":"denied","RequestId":"r-2"}"#)
                .unwrap();
        assert_eq!(upper.code.as_deref(), Some("Forbidden.RAM"));
        assert_eq!(upper.message.as_deref(), Some("denied"));
        assert_eq!(upper.request_id.as_deref(), Some("r-2"));
    }

    #[test]
    fn test_request_builder_helpers() {
        let request = ApiRequest::get("DescribeClusterUserKubeconfig", "/k8s/c-1/user_config")
            .query("PrivateIpAddress", true)
            .query("TemporaryDurationMinutes", 60);
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.query["PrivateIpAddress"], "true");
        assert_eq!(request.query["TemporaryDurationMinutes"], "60");
    }
}
