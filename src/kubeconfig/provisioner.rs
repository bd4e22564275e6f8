//! Kubeconfig acquisition, one strategy per [`KubeconfigMode`].
//!
//! Provisioning is stateless and only runs on a cache miss. It never retries:
//! a failed fetch surfaces to the caller, who decides what to do next.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::artifact::Artifact;
use super::incluster::{self, InClusterEnv, INCLUSTER_FILE_NAME};
use super::mode::KubeconfigMode;
use crate::clients::ClusterApiProvider;
use crate::credentials::CredentialFields;
use crate::errors::{AckError, Result};

/// File name prefix of every fetched kubeconfig
pub const FETCHED_FILE_PREFIX: &str = "mcp-kubeconfig-";

/// Everything needed to acquire one cluster's kubeconfig
#[derive(Debug, Clone, Default)]
pub struct ProvisionRequest {
    pub cluster_id: String,
    pub region: String,
    pub mode: KubeconfigMode,
    /// Only consulted in [`KubeconfigMode::Local`]
    pub local_path: Option<PathBuf>,
    /// Identity used for control-plane calls in the fetched modes
    pub credentials: CredentialFields,
}

impl ProvisionRequest {
    pub fn new(cluster_id: impl Into<String>, region: impl Into<String>, mode: KubeconfigMode) -> Self {
        Self { cluster_id: cluster_id.into(), region: region.into(), mode, ..Default::default() }
    }

    pub fn with_local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    pub fn with_credentials(mut self, credentials: CredentialFields) -> Self {
        self.credentials = credentials;
        self
    }

    /// Local path with `~` expanded; `None` when unset or blank
    pub fn resolved_local_path(&self) -> Option<PathBuf> {
        let raw = self.local_path.as_ref()?.to_string_lossy().trim().to_string();
        if raw.is_empty() {
            return None;
        }
        match raw.strip_prefix("~/") {
            Some(rest) => dirs::home_dir().map(|home| home.join(rest)).or(Some(PathBuf::from(&raw))),
            None => Some(PathBuf::from(raw)),
        }
    }
}

/// Seam between the artifact cache and kubeconfig acquisition
#[async_trait]
pub trait ArtifactProvisioner: Send + Sync {
    async fn provision(&self, request: &ProvisionRequest) -> Result<Artifact>;

    /// Fixed path the request's artifact will be written to, when several
    /// cache entries can share one file.
    fn shared_path(&self, _request: &ProvisionRequest) -> Option<PathBuf> {
        None
    }
}

pub struct KubeconfigProvisioner {
    clusters: Arc<dyn ClusterApiProvider>,
    artifact_dir: PathBuf,
    ttl_minutes: u32,
    incluster_env: Option<InClusterEnv>,
}

impl std::fmt::Debug for KubeconfigProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeconfigProvisioner")
            .field("artifact_dir", &self.artifact_dir)
            .field("ttl_minutes", &self.ttl_minutes)
            .finish_non_exhaustive()
    }
}

impl KubeconfigProvisioner {
    pub fn new(clusters: Arc<dyn ClusterApiProvider>, artifact_dir: impl Into<PathBuf>, ttl_minutes: u32) -> Self {
        Self { clusters, artifact_dir: artifact_dir.into(), ttl_minutes, incluster_env: None }
    }

    /// Use a fixed in-cluster environment instead of reading the process environment
    pub fn with_incluster_env(mut self, env: InClusterEnv) -> Self {
        self.incluster_env = Some(env);
        self
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    /// Fixed path of the synthesized in-cluster kubeconfig
    pub fn incluster_path(&self) -> PathBuf {
        self.artifact_dir.join(INCLUSTER_FILE_NAME)
    }

    fn provision_local(&self, request: &ProvisionRequest) -> Result<Artifact> {
        let path = request.resolved_local_path().ok_or_else(|| AckError::LocalPathNotConfigured {
            cluster_id: request.cluster_id.clone(),
        })?;
        if !path.exists() {
            return Err(AckError::LocalArtifactMissing { cluster_id: request.cluster_id.clone(), path });
        }
        debug!(cluster_id = %request.cluster_id, path = %path.display(), "Using local kubeconfig");
        Ok(Artifact::borrowed(path))
    }

    async fn provision_fetched(&self, request: &ProvisionRequest) -> Result<Artifact> {
        let cluster_id = request.cluster_id.as_str();
        let mode = request.mode;
        let private = mode == KubeconfigMode::AckPrivate;
        let wrap = |e: AckError| match e {
            AckError::Api { .. } | AckError::Http { .. } | AckError::ClientBuild { .. } => {
                AckError::provision_with_source(cluster_id, mode.as_str(), Box::new(e))
            }
            other => other,
        };

        let api = self.clusters.cluster_api(&request.credentials, &request.region).await.map_err(wrap)?;
        let detail = api.describe_cluster_detail(cluster_id).await.map_err(wrap)?;

        // The private mode needs the intranet endpoint even when a public one exists.
        if private && detail.endpoints.private.is_none() {
            return Err(AckError::NoPrivateEndpoint { cluster_id: cluster_id.to_string() });
        }
        if !private && detail.endpoints.public.is_none() {
            return Err(AckError::NoPublicEndpoint { cluster_id: cluster_id.to_string() });
        }

        let content = api
            .describe_cluster_user_kubeconfig(cluster_id, private, Some(self.ttl_minutes))
            .await
            .map_err(wrap)?;
        if content.trim().is_empty() {
            return Err(AckError::provision(cluster_id, mode.as_str(), "control plane returned an empty kubeconfig"));
        }

        let issued_at = Utc::now();
        let path = write_fetched(self.artifact_dir.clone(), cluster_id.to_string(), content)
            .await
            .map_err(|e| AckError::provision_with_source(cluster_id, mode.as_str(), Box::new(e)))?;

        info!(cluster_id = %cluster_id, mode = %mode, path = %path.display(), "Fetched kubeconfig");
        Ok(Artifact::owned(path, mode)
            .expiring_at(issued_at + ChronoDuration::minutes(i64::from(self.ttl_minutes))))
    }

    async fn provision_incluster(&self, request: &ProvisionRequest) -> Result<Artifact> {
        let mode = KubeconfigMode::InCluster;
        let env = self.incluster_env.clone().or_else(InClusterEnv::from_env).ok_or_else(|| {
            AckError::provision(
                &request.cluster_id,
                mode.as_str(),
                format!(
                    "not running inside a cluster: {} / {} are not set",
                    incluster::ENV_SERVICE_HOST,
                    incluster::ENV_SERVICE_PORT
                ),
            )
        })?;
        let content = incluster::render(&env)
            .map_err(|e| AckError::provision_with_source(&request.cluster_id, mode.as_str(), Box::new(e)))?;

        let path = self.incluster_path();
        write_replace(self.artifact_dir.clone(), path.clone(), content)
            .await
            .map_err(|e| AckError::provision_with_source(&request.cluster_id, mode.as_str(), Box::new(e)))?;

        info!(cluster_id = %request.cluster_id, path = %path.display(), "Wrote in-cluster kubeconfig");
        Ok(Artifact::owned(path, mode))
    }
}

#[async_trait]
impl ArtifactProvisioner for KubeconfigProvisioner {
    async fn provision(&self, request: &ProvisionRequest) -> Result<Artifact> {
        match request.mode {
            KubeconfigMode::Local => self.provision_local(request),
            KubeconfigMode::AckPublic | KubeconfigMode::AckPrivate => self.provision_fetched(request).await,
            KubeconfigMode::InCluster => self.provision_incluster(request).await,
        }
    }

    fn shared_path(&self, request: &ProvisionRequest) -> Option<PathBuf> {
        (request.mode == KubeconfigMode::InCluster).then(|| self.incluster_path())
    }
}

/// Write `content` to a fresh `mcp-kubeconfig-{cluster}-{random}.yaml` (0600).
async fn write_fetched(dir: PathBuf, cluster_id: String, content: String) -> std::io::Result<PathBuf> {
    tokio::task::spawn_blocking(move || {
        std::fs::create_dir_all(&dir)?;
        let mut file = tempfile::Builder::new()
            .prefix(&format!("{}{}-", FETCHED_FILE_PREFIX, file_safe(&cluster_id)))
            .suffix(".yaml")
            .tempfile_in(&dir)?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        let (_, path) = file.keep().map_err(|e| e.error)?;
        Ok(path)
    })
    .await
    .map_err(std::io::Error::other)?
}

/// Atomically replace `path` with `content` via a temp file in the same directory.
async fn write_replace(dir: PathBuf, path: PathBuf, content: String) -> std::io::Result<()> {
    tokio::task::spawn_blocking(move || {
        std::fs::create_dir_all(&dir)?;
        let mut file = tempfile::Builder::new().prefix(".incluster-").tempfile_in(&dir)?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        file.persist(&path).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(std::io::Error::other)?
}

fn file_safe(cluster_id: &str) -> String {
    cluster_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{ClusterApi, ClusterDetail, ClusterEndpoints};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const KUBECONFIG: &str = "apiVersion: v1\nkind: Config\n";

    #[derive(Default)]
    struct FakeCluster {
        public: Option<String>,
        private: Option<String>,
        config: String,
        fetches: AtomicUsize,
        last_private_ip: Mutex<Option<bool>>,
    }

    #[async_trait]
    impl ClusterApi for FakeCluster {
        async fn describe_cluster_detail(&self, cluster_id: &str) -> Result<ClusterDetail> {
            Ok(ClusterDetail {
                cluster_id: cluster_id.to_string(),
                name: "test".to_string(),
                region_id: "cn-hangzhou".to_string(),
                state: "running".to_string(),
                cluster_type: "ManagedKubernetes".to_string(),
                master_url: String::new(),
                endpoints: ClusterEndpoints { public: self.public.clone(), private: self.private.clone() },
            })
        }

        async fn describe_cluster_user_kubeconfig(
            &self,
            _cluster_id: &str,
            private_ip: bool,
            _temporary_minutes: Option<u32>,
        ) -> Result<String> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            *self.last_private_ip.lock().unwrap() = Some(private_ip);
            Ok(self.config.clone())
        }
    }

    struct FakeProvider(Arc<FakeCluster>);

    #[async_trait]
    impl ClusterApiProvider for FakeProvider {
        async fn cluster_api(&self, _fields: &CredentialFields, _region: &str) -> Result<Arc<dyn ClusterApi>> {
            Ok(self.0.clone())
        }
    }

    fn provisioner(cluster: Arc<FakeCluster>, dir: &Path) -> KubeconfigProvisioner {
        KubeconfigProvisioner::new(Arc::new(FakeProvider(cluster)), dir, 60)
    }

    fn both_endpoints() -> FakeCluster {
        FakeCluster {
            public: Some("https://47.0.0.1:6443".into()),
            private: Some("https://192.168.0.1:6443".into()),
            config: KUBECONFIG.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_public_fetch_writes_owned_file() {
        let dir = tempfile::tempdir().unwrap();
        let cluster = Arc::new(both_endpoints());
        let provisioner = provisioner(cluster.clone(), dir.path());

        let artifact = provisioner
            .provision(&ProvisionRequest::new("c-123", "cn-hangzhou", KubeconfigMode::AckPublic))
            .await
            .unwrap();

        assert!(artifact.is_owned());
        assert!(artifact.expires_at.is_some());
        let name = artifact.path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("mcp-kubeconfig-c-123-"));
        assert!(name.ends_with(".yaml"));
        assert_eq!(std::fs::read_to_string(&artifact.path).unwrap(), KUBECONFIG);
        assert_eq!(*cluster.last_private_ip.lock().unwrap(), Some(false));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&artifact.path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn test_each_fetch_gets_a_unique_file() {
        let dir = tempfile::tempdir().unwrap();
        let provisioner = provisioner(Arc::new(both_endpoints()), dir.path());
        let request = ProvisionRequest::new("c-1", "cn-hangzhou", KubeconfigMode::AckPublic);

        let first = provisioner.provision(&request).await.unwrap();
        let second = provisioner.provision(&request).await.unwrap();
        assert_ne!(first.path, second.path);
    }

    #[tokio::test]
    async fn test_private_mode_requires_intranet_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let cluster = Arc::new(FakeCluster {
            public: Some("https://47.0.0.1:6443".into()),
            config: KUBECONFIG.into(),
            ..Default::default()
        });
        let provisioner = provisioner(cluster.clone(), dir.path());

        let err = provisioner
            .provision(&ProvisionRequest::new("c-1", "cn-hangzhou", KubeconfigMode::AckPrivate))
            .await
            .unwrap_err();
        assert!(matches!(err, AckError::NoPrivateEndpoint { .. }));
        assert_eq!(cluster.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_private_mode_requests_intranet_config() {
        let dir = tempfile::tempdir().unwrap();
        let cluster = Arc::new(both_endpoints());
        let provisioner = provisioner(cluster.clone(), dir.path());

        let artifact = provisioner
            .provision(&ProvisionRequest::new("c-1", "cn-hangzhou", KubeconfigMode::AckPrivate))
            .await
            .unwrap();
        assert_eq!(artifact.mode, KubeconfigMode::AckPrivate);
        assert_eq!(*cluster.last_private_ip.lock().unwrap(), Some(true));
    }

    #[tokio::test]
    async fn test_public_mode_requires_public_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let cluster = Arc::new(FakeCluster {
            private: Some("https://192.168.0.1:6443".into()),
            config: KUBECONFIG.into(),
            ..Default::default()
        });
        let err = provisioner(cluster, dir.path())
            .provision(&ProvisionRequest::new("c-1", "cn-hangzhou", KubeconfigMode::AckPublic))
            .await
            .unwrap_err();
        assert!(matches!(err, AckError::NoPublicEndpoint { .. }));
    }

    #[tokio::test]
    async fn test_empty_kubeconfig_is_a_provision_error() {
        let dir = tempfile::tempdir().unwrap();
        let cluster = Arc::new(FakeCluster { config: "  ".into(), ..both_endpoints() });
        let err = provisioner(cluster, dir.path())
            .provision(&ProvisionRequest::new("c-1", "cn-hangzhou", KubeconfigMode::AckPublic))
            .await
            .unwrap_err();
        assert!(matches!(err, AckError::Provision { .. }));
        assert!(err.to_string().contains("Failed to get kubeconfig for cluster 'c-1'"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_local_mode() {
        let dir = tempfile::tempdir().unwrap();
        let provisioner = provisioner(Arc::new(both_endpoints()), dir.path());

        let err = provisioner
            .provision(&ProvisionRequest::new("c-1", "", KubeconfigMode::Local))
            .await
            .unwrap_err();
        assert!(matches!(err, AckError::LocalPathNotConfigured { .. }));

        let missing = dir.path().join("missing");
        let err = provisioner
            .provision(&ProvisionRequest::new("c-1", "", KubeconfigMode::Local).with_local_path(&missing))
            .await
            .unwrap_err();
        assert!(matches!(err, AckError::LocalArtifactMissing { .. }));

        let existing = dir.path().join("config");
        std::fs::write(&existing, KUBECONFIG).unwrap();
        let artifact = provisioner
            .provision(&ProvisionRequest::new("c-1", "", KubeconfigMode::Local).with_local_path(&existing))
            .await
            .unwrap();
        assert!(!artifact.is_owned());
        assert_eq!(artifact.path, existing);
    }

    #[tokio::test]
    async fn test_incluster_writes_fixed_path() {
        let dir = tempfile::tempdir().unwrap();
        let provisioner = provisioner(Arc::new(FakeCluster::default()), dir.path()).with_incluster_env(InClusterEnv {
            host: "10.0.0.1".into(),
            port: "443".into(),
            service_account_dir: PathBuf::from(incluster::SERVICE_ACCOUNT_DIR),
        });
        let request = ProvisionRequest::new("c-1", "cn-hangzhou", KubeconfigMode::InCluster);

        let first = provisioner.provision(&request).await.unwrap();
        let second = provisioner.provision(&request).await.unwrap();

        assert_eq!(first.path, dir.path().join("config.incluster"));
        assert_eq!(first.path, second.path);
        assert!(first.is_owned());
        assert!(std::fs::read_to_string(&first.path).unwrap().contains("https://10.0.0.1:443"));
        assert_eq!(provisioner.shared_path(&request), Some(first.path));
        assert_eq!(
            provisioner.shared_path(&ProvisionRequest::new("c-1", "cn-hangzhou", KubeconfigMode::AckPublic)),
            None
        );
    }

    #[test]
    fn test_file_safe_cluster_ids() {
        assert_eq!(file_safe("c-abc_123"), "c-abc_123");
        assert_eq!(file_safe("../etc"), "___etc");
    }
}
