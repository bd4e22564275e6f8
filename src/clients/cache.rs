//! Credential-scoped client cache.
//!
//! One live client per (key id, region, service). STS session credentials
//! are short-lived, so they always get a freshly built client and never enter
//! the map. The map is unbounded: its size is the number of distinct
//! identities times regions times services a process ever sees.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::builder::ClientBuilder;
use super::client::ServiceClient;
use super::service::ServiceKind;
use crate::credentials::{redact_key_id, resolve, Credential, CredentialFields};
use crate::errors::Result;

/// Cache key for a reusable client
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct ClientKey {
    /// Access key id, or empty for the ambient identity
    pub fingerprint: String,
    pub region: String,
    pub service: ServiceKind,
}

impl ClientKey {
    /// Key for `credential`, or `None` when it must not be cached
    pub fn for_credential(credential: &Credential, region: &str, service: ServiceKind) -> Option<Self> {
        credential.fingerprint().map(|fingerprint| Self {
            fingerprint: fingerprint.to_string(),
            region: region.to_string(),
            service,
        })
    }
}

pub struct ServiceClientCache {
    inner: Arc<RwLock<HashMap<ClientKey, Arc<ServiceClient>>>>,
    builder: Arc<dyn ClientBuilder>,
    defaults: CredentialFields,
    default_region: String,
}

impl std::fmt::Debug for ServiceClientCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceClientCache")
            .field("default_region", &self.default_region)
            .finish_non_exhaustive()
    }
}

impl ServiceClientCache {
    /// Create a cache with no process-level credential and the given default region
    pub fn new(builder: Arc<dyn ClientBuilder>, default_region: impl Into<String>) -> Self {
        Self::with_defaults(builder, CredentialFields::default(), default_region)
    }

    /// Create a cache whose requests fall back to `defaults` for absent fields
    pub fn with_defaults(
        builder: Arc<dyn ClientBuilder>,
        defaults: CredentialFields,
        default_region: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            builder,
            defaults,
            default_region: default_region.into(),
        }
    }

    pub fn default_region(&self) -> &str {
        &self.default_region
    }

    /// Region a request actually targets: explicit, then per-request, then default
    pub fn effective_region<'a>(&'a self, fields: &'a CredentialFields, region: &'a str) -> &'a str {
        let region = region.trim();
        if !region.is_empty() {
            return region;
        }
        fields.region().or_else(|| self.defaults.region()).unwrap_or(&self.default_region)
    }

    /// Get a client for the identity in `fields`, building one on a miss.
    pub async fn get_client(
        &self,
        fields: &CredentialFields,
        region: &str,
        service: ServiceKind,
    ) -> Result<Arc<ServiceClient>> {
        let fields = fields.clone().or(&self.defaults);
        let credential = resolve(&fields)?;
        let region = self.effective_region(&fields, region).to_string();

        let Some(key) = ClientKey::for_credential(&credential, &region, service) else {
            debug!(
                access_key_id = %credential.redacted_id(),
                region = %region,
                service = %service,
                "Building uncached client for STS credential"
            );
            return Ok(Arc::new(self.builder.build(&credential, &region, service)?));
        };

        if let Some(client) = self.inner.read().await.get(&key) {
            debug!(
                access_key_id = %redact_key_id(&key.fingerprint),
                region = %region,
                service = %service,
                "Client cache hit"
            );
            return Ok(Arc::clone(client));
        }

        let mut cache = self.inner.write().await;
        // Another caller may have built it between the read and write locks.
        if let Some(client) = cache.get(&key) {
            debug!(
                access_key_id = %redact_key_id(&key.fingerprint),
                region = %region,
                service = %service,
                "Client cache hit"
            );
            return Ok(Arc::clone(client));
        }

        debug!(
            access_key_id = %credential.redacted_id(),
            credential = credential.kind(),
            region = %region,
            service = %service,
            "Client cache miss, building client"
        );
        let client = Arc::new(self.builder.build(&credential, &region, service)?);
        cache.insert(key, Arc::clone(&client));
        Ok(client)
    }

    /// Drop the cached client for this identity, region and service
    pub async fn invalidate(
        &self,
        fields: &CredentialFields,
        region: &str,
        service: ServiceKind,
    ) -> Result<bool> {
        let fields = fields.clone().or(&self.defaults);
        let credential = resolve(&fields)?;
        let region = self.effective_region(&fields, region).to_string();

        let Some(key) = ClientKey::for_credential(&credential, &region, service) else {
            return Ok(false);
        };
        let removed = self.inner.write().await.remove(&key).is_some();
        if removed {
            debug!(access_key_id = %credential.redacted_id(), region = %region, service = %service, "Invalidated cached client");
        }
        Ok(removed)
    }

    /// Drop every cached client
    pub async fn clear(&self) {
        let mut cache = self.inner.write().await;
        debug!(entries = cache.len(), "Clearing client cache");
        cache.clear();
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
