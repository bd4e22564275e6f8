//! Kubeconfig synthesis for processes running inside the target cluster.

use serde::Serialize;
use std::path::{Path, PathBuf};

pub const ENV_SERVICE_HOST: &str = "KUBERNETES_SERVICE_HOST";
pub const ENV_SERVICE_PORT: &str = "KUBERNETES_SERVICE_PORT";

/// Mounted service-account directory
pub const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// File name of the synthesized kubeconfig inside the artifact directory
pub const INCLUSTER_FILE_NAME: &str = "config.incluster";

/// Where the in-cluster API server lives and how to authenticate against it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InClusterEnv {
    pub host: String,
    pub port: String,
    pub service_account_dir: PathBuf,
}

impl InClusterEnv {
    /// Read the service host/port injected by the kubelet; `None` outside a pod.
    pub fn from_env() -> Option<Self> {
        let host = std::env::var(ENV_SERVICE_HOST).ok().filter(|v| !v.trim().is_empty())?;
        let port = std::env::var(ENV_SERVICE_PORT).ok().filter(|v| !v.trim().is_empty())?;
        Some(Self {
            host: host.trim().to_string(),
            port: port.trim().to_string(),
            service_account_dir: PathBuf::from(SERVICE_ACCOUNT_DIR),
        })
    }

    pub fn server_url(&self) -> String {
        // IPv6 service hosts need brackets in a URL.
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("https://[{}]:{}", self.host, self.port)
        } else {
            format!("https://{}:{}", self.host, self.port)
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct Kubeconfig<'a> {
    #[serde(rename = "apiVersion")]
    api_version: &'a str,
    kind: &'a str,
    clusters: Vec<Named<ClusterEntry>>,
    users: Vec<Named<UserEntry>>,
    contexts: Vec<Named<ContextEntry<'a>>>,
    current_context: &'a str,
}

#[derive(Serialize)]
struct Named<T> {
    name: String,
    #[serde(flatten)]
    inner: T,
}

#[derive(Serialize)]
struct ClusterEntry {
    cluster: ClusterBody,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct ClusterBody {
    server: String,
    certificate_authority: String,
}

#[derive(Serialize)]
struct UserEntry {
    user: UserBody,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserBody {
    token_file: String,
}

#[derive(Serialize)]
struct ContextEntry<'a> {
    context: ContextBody<'a>,
}

#[derive(Serialize)]
struct ContextBody<'a> {
    cluster: &'a str,
    user: &'a str,
}

/// Render a kubeconfig that points at the in-cluster API server and reads the
/// service-account token from disk on every request.
pub fn render(env: &InClusterEnv) -> Result<String, serde_yaml::Error> {
    let sa_file = |name: &str| path_string(&env.service_account_dir.join(name));

    let config = Kubeconfig {
        api_version: "v1",
        kind: "Config",
        clusters: vec![Named {
            name: "in-cluster".to_string(),
            inner: ClusterEntry {
                cluster: ClusterBody {
                    server: env.server_url(),
                    certificate_authority: sa_file("ca.crt"),
                },
            },
        }],
        users: vec![Named {
            name: "in-cluster".to_string(),
            inner: UserEntry { user: UserBody { token_file: sa_file("token") } },
        }],
        contexts: vec![Named {
            name: "in-cluster".to_string(),
            inner: ContextEntry { context: ContextBody { cluster: "in-cluster", user: "in-cluster" } },
        }],
        current_context: "in-cluster",
    };
    serde_yaml::to_string(&config)
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
