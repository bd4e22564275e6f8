use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::AckError;

/// How a cluster's kubeconfig is acquired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KubeconfigMode {
    /// Caller-provided file on disk, never deleted by the cache
    Local,
    /// Fetched from the control plane, public API server endpoint
    AckPublic,
    /// Fetched from the control plane, intranet API server endpoint
    AckPrivate,
    /// Synthesized from the pod's service account
    #[serde(rename = "INCLUSTER")]
    InCluster,
}

impl KubeconfigMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "LOCAL",
            Self::AckPublic => "ACK_PUBLIC",
            Self::AckPrivate => "ACK_PRIVATE",
            Self::InCluster => "INCLUSTER",
        }
    }

    /// Whether the artifact is fetched from the control plane
    pub fn is_fetched(&self) -> bool {
        matches!(self, Self::AckPublic | Self::AckPrivate)
    }
}

impl Default for KubeconfigMode {
    fn default() -> Self {
        Self::AckPublic
    }
}

impl fmt::Display for KubeconfigMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KubeconfigMode {
    type Err = AckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "LOCAL" => Ok(Self::Local),
            "ACK_PUBLIC" => Ok(Self::AckPublic),
            "ACK_PRIVATE" => Ok(Self::AckPrivate),
            "INCLUSTER" | "IN_CLUSTER" => Ok(Self::InCluster),
            other => Err(AckError::config(format!(
                "Invalid kubeconfig mode '{}': expected LOCAL, ACK_PUBLIC, ACK_PRIVATE or INCLUSTER",
                other
            ))),
        }
    }
}
