//! Container service control-plane operations the kubeconfig core relies on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::cache::ServiceClientCache;
use super::client::{ApiRequest, ServiceClient};
use super::service::ServiceKind;
use crate::credentials::CredentialFields;
use crate::errors::{AckError, Result};

/// API server endpoints advertised by a cluster
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterEndpoints {
    pub public: Option<String>,
    pub private: Option<String>,
}

impl ClusterEndpoints {
    /// Parse the `master_url` field, itself a JSON document in a string.
    ///
    /// Blank or unparseable input yields no endpoints.
    pub fn from_master_url(master_url: &str) -> Self {
        #[derive(Deserialize)]
        struct MasterUrl {
            #[serde(default)]
            api_server_endpoint: Option<String>,
            #[serde(default)]
            intranet_api_server_endpoint: Option<String>,
        }

        let parsed: Option<MasterUrl> = serde_json::from_str(master_url).ok();
        let non_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        match parsed {
            Some(urls) => Self {
                public: non_blank(urls.api_server_endpoint),
                private: non_blank(urls.intranet_api_server_endpoint),
            },
            None => Self::default(),
        }
    }
}

/// Subset of DescribeClusterDetail the core and CLI use
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterDetail {
    pub cluster_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub region_id: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub cluster_type: String,
    #[serde(default)]
    pub master_url: String,
    #[serde(skip_deserializing)]
    pub endpoints: ClusterEndpoints,
}

#[derive(Debug, Deserialize)]
struct UserKubeconfigResponse {
    #[serde(default)]
    config: String,
}

#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// `GET /clusters/{cluster_id}`
    async fn describe_cluster_detail(&self, cluster_id: &str) -> Result<ClusterDetail>;

    /// `GET /k8s/{cluster_id}/user_config`; returns the kubeconfig document
    async fn describe_cluster_user_kubeconfig(
        &self,
        cluster_id: &str,
        private_ip: bool,
        temporary_minutes: Option<u32>,
    ) -> Result<String>;
}

#[async_trait]
impl ClusterApi for ServiceClient {
    async fn describe_cluster_detail(&self, cluster_id: &str) -> Result<ClusterDetail> {
        let action = "DescribeClusterDetail";
        let path = format!("/clusters/{}", urlencoding::encode(cluster_id));
        let value = self.call(ApiRequest::get(action, path)).await?;

        let mut detail: ClusterDetail = serde_json::from_value(value).map_err(|e| AckError::Api {
            action: action.to_string(),
            status: 200,
            code: "InvalidResponse".to_string(),
            message: format!("Unexpected cluster detail shape: {}", e),
            request_id: None,
        })?;
        detail.endpoints = ClusterEndpoints::from_master_url(&detail.master_url);
        Ok(detail)
    }

    async fn describe_cluster_user_kubeconfig(
        &self,
        cluster_id: &str,
        private_ip: bool,
        temporary_minutes: Option<u32>,
    ) -> Result<String> {
        let action = "DescribeClusterUserKubeconfig";
        let path = format!("/k8s/{}/user_config", urlencoding::encode(cluster_id));
        let mut request = ApiRequest::get(action, path).query("PrivateIpAddress", private_ip);
        if let Some(minutes) = temporary_minutes {
            request = request.query("TemporaryDurationMinutes", minutes);
        }

        let value = self.call(request).await?;
        let response: UserKubeconfigResponse =
            serde_json::from_value(value).map_err(|e| AckError::Api {
                action: action.to_string(),
                status: 200,
                code: "InvalidResponse".to_string(),
                message: format!("Unexpected kubeconfig response shape: {}", e),
                request_id: None,
            })?;
        Ok(response.config)
    }
}

/// Hands out a [`ClusterApi`] for an identity and region
#[async_trait]
pub trait ClusterApiProvider: Send + Sync {
    async fn cluster_api(
        &self,
        fields: &CredentialFields,
        region: &str,
    ) -> Result<Arc<dyn ClusterApi>>;
}

#[async_trait]
impl ClusterApiProvider for ServiceClientCache {
    async fn cluster_api(
        &self,
        fields: &CredentialFields,
        region: &str,
    ) -> Result<Arc<dyn ClusterApi>> {
        let client = self.get_client(fields, region, ServiceKind::ContainerService).await?;
        Ok(client)
    }
}
