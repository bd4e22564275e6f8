//! Alibaba Cloud OpenAPI signature V3 (`ACS3-HMAC-SHA256`).
//!
//! The signer is pure: it takes the request shape plus key material and
//! returns the headers to attach. Timestamp and nonce are inputs so the
//! output is reproducible in tests.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::credentials::SigningKey;
use crate::errors::{AckError, Result};

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "ACS3-HMAC-SHA256";

/// Everything about a request that goes into its signature
#[derive(Debug, Clone)]
pub struct RequestToSign<'a> {
    pub method: &'a str,
    pub host: &'a str,
    pub path: &'a str,
    pub query: &'a BTreeMap<String, String>,
    pub body: &'a [u8],
    pub content_type: Option<&'a str>,
    pub action: &'a str,
    pub version: &'a str,
}

/// Compute the signed header set for `request`.
///
/// The returned map contains `host`, every `x-acs-*` header and
/// `Authorization`; callers add them verbatim.
pub fn sign(
    request: &RequestToSign<'_>,
    key: &SigningKey,
    now: DateTime<Utc>,
    nonce: &str,
) -> Result<BTreeMap<String, String>> {
    let mut headers = BTreeMap::new();
    headers.insert("host".to_string(), request.host.to_string());
    headers.insert("x-acs-action".to_string(), request.action.to_string());
    headers.insert("x-acs-version".to_string(), request.version.to_string());
    headers.insert("x-acs-date".to_string(), now.format("%Y-%m-%dT%H:%M:%SZ").to_string());
    headers.insert("x-acs-signature-nonce".to_string(), nonce.to_string());
    headers.insert("x-acs-content-sha256".to_string(), sha256_hex(request.body));
    if let Some(token) = &key.security_token {
        headers.insert("x-acs-security-token".to_string(), token.expose_secret().to_string());
    }
    if let Some(content_type) = request.content_type {
        headers.insert("content-type".to_string(), content_type.to_string());
    }

    let signed_headers = headers.keys().cloned().collect::<Vec<_>>().join(";");
    let canonical = canonical_request(request, &headers, &signed_headers);
    let string_to_sign = format!("{}\n{}", ALGORITHM, sha256_hex(canonical.as_bytes()));

    let mut mac = HmacSha256::new_from_slice(key.access_key_secret.expose_secret().as_bytes())
        .map_err(|e| AckError::invalid_credential(format!("Unusable access key secret: {}", e)))?;
    mac.update(string_to_sign.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    headers.insert(
        "authorization".to_string(),
        format!(
            "{} Credential={},SignedHeaders={},Signature={}",
            ALGORITHM, key.access_key_id, signed_headers, signature
        ),
    );
    Ok(headers)
}

/// Build the canonical request string from already-lowercased headers.
pub fn canonical_request(
    request: &RequestToSign<'_>,
    headers: &BTreeMap<String, String>,
    signed_headers: &str,
) -> String {
    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value.trim()))
        .collect();

    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        request.method.to_ascii_uppercase(),
        canonical_uri(request.path),
        canonical_query(request.query),
        canonical_headers,
        signed_headers,
        sha256_hex(request.body)
    )
}

/// Percent-encode each path segment, keeping the separators.
pub fn canonical_uri(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    path.split('/').map(|segment| urlencoding::encode(segment).into_owned()).collect::<Vec<_>>().join("/")
}

/// RFC 3986 encoded, key-sorted query string
pub fn canonical_query(query: &BTreeMap<String, String>) -> String {
    query
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
