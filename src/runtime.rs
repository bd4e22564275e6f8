//! Process-wide handle passed to every tool handler.
//!
//! Built once at startup and cloned into handlers; all clones share the same
//! client and kubeconfig caches.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Instrument};

use crate::clients::{ClusterApiProvider, HttpClientBuilder, ServiceClient, ServiceClientCache, ServiceKind};
use crate::config::AppConfig;
use crate::credentials::CredentialFields;
use crate::errors::Result;
use crate::kubeconfig::{KubeconfigCache, KubeconfigMode, KubeconfigProvisioner, ProvisionRequest};

#[derive(Debug, Clone)]
pub struct AckRuntime {
    config: Arc<AppConfig>,
    clients: Arc<ServiceClientCache>,
    kubeconfigs: Arc<KubeconfigCache>,
}

impl AckRuntime {
    /// Wire the production stack from configuration
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let builder = HttpClientBuilder::new(config.api.client_settings())?;
        let clients = Arc::new(ServiceClientCache::with_defaults(
            Arc::new(builder),
            config.credentials.clone(),
            config.region_id.clone(),
        ));
        let provider: Arc<dyn ClusterApiProvider> = clients.clone();
        let provisioner = KubeconfigProvisioner::new(
            provider,
            config.kubeconfig.cache_dir.clone(),
            config.kubeconfig.ttl_minutes,
        );
        let kubeconfigs = Arc::new(KubeconfigCache::new(
            Arc::new(provisioner),
            config.kubeconfig.cache_max_size,
        ));

        Ok(Self::new(config, clients, kubeconfigs))
    }

    /// Assemble a runtime from pre-built parts
    pub fn new(config: AppConfig, clients: Arc<ServiceClientCache>, kubeconfigs: Arc<KubeconfigCache>) -> Self {
        Self { config: Arc::new(config), clients, kubeconfigs }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn clients(&self) -> &ServiceClientCache {
        &self.clients
    }

    pub fn kubeconfigs(&self) -> &KubeconfigCache {
        &self.kubeconfigs
    }

    /// Authenticated client for `service` in `region` under the caller's identity
    pub async fn get_client(
        &self,
        fields: &CredentialFields,
        region: &str,
        service: ServiceKind,
    ) -> Result<Arc<ServiceClient>> {
        self.clients.get_client(fields, region, service).await
    }

    /// Path of a kubeconfig for `cluster_id`.
    ///
    /// `mode` and `local_path` default to the configured values.
    pub async fn get_config_path(
        &self,
        cluster_id: &str,
        region: &str,
        mode: Option<KubeconfigMode>,
        local_path: Option<&Path>,
        fields: &CredentialFields,
    ) -> Result<PathBuf> {
        let mode = mode.unwrap_or(self.config.kubeconfig.mode);
        let region = self.clients.effective_region(fields, region).to_string();

        let mut request = ProvisionRequest::new(cluster_id, region, mode).with_credentials(fields.clone());
        if let Some(path) = local_path.map(Path::to_path_buf).or_else(|| self.config.kubeconfig.path.clone()) {
            request = request.with_local_path(path);
        }

        let span = crate::kubeconfig_span!(cluster_id, mode, region = %request.region);
        let result = self.kubeconfigs.get_path(&request).instrument(span).await;
        match &result {
            Err(e) if e.is_mode_mismatch() => {
                info!(cluster_id = %cluster_id, mode = %mode, error = %e, "Kubeconfig mode not applicable to cluster")
            }
            Err(e) => warn!(cluster_id = %cluster_id, mode = %mode, error = %e, "Kubeconfig acquisition failed"),
            Ok(_) => {}
        }
        result
    }

    /// Drop every cached kubeconfig and delete the files this process created
    pub fn cleanup(&self) -> usize {
        self.kubeconfigs.cleanup()
    }
}
