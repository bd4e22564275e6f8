//! Shared fixtures: a wiremock container-service control plane and runtimes
//! wired against it.

#![allow(dead_code)]

use std::path::Path;

use ackplane::{AckRuntime, AppConfig, CredentialFields};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const REGION: &str = "cn-hangzhou";

/// Mock of the container service OpenAPI
pub struct ControlPlane {
    pub server: MockServer,
}

impl ControlPlane {
    pub async fn start() -> Self {
        Self { server: MockServer::start().await }
    }

    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Register a cluster with the given API server endpoints
    pub async fn cluster(&self, cluster_id: &str, public: Option<&str>, private: Option<&str>) {
        let master_url = json!({
            "api_server_endpoint": public.unwrap_or(""),
            "intranet_api_server_endpoint": private.unwrap_or(""),
        })
        .to_string();

        Mock::given(method("GET"))
            .and(path(format!("/clusters/{}", cluster_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "cluster_id": cluster_id,
                "name": format!("{}-name", cluster_id),
                "region_id": REGION,
                "state": "running",
                "cluster_type": "ManagedKubernetes",
                "master_url": master_url,
            })))
            .mount(&self.server)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("/k8s/{}/user_config", cluster_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "config": kubeconfig_for(cluster_id),
                "expiration": "2030-01-01T00:00:00Z",
            })))
            .mount(&self.server)
            .await;
    }

    /// Requests received for `request_path`
    pub async fn hits(&self, request_path: &str) -> Vec<wiremock::Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == request_path)
            .collect()
    }

    pub async fn kubeconfig_fetches(&self, cluster_id: &str) -> usize {
        self.hits(&format!("/k8s/{}/user_config", cluster_id)).await.len()
    }
}

pub fn kubeconfig_for(cluster_id: &str) -> String {
    format!(
        "apiVersion: v1\nkind: Config\nclusters:\n- name: {id}\n  cluster:\n    server: https://47.0.0.1:6443\ncurrent-context: {id}\n",
        id = cluster_id
    )
}

/// Runtime whose every service endpoint is the mock control plane
pub fn runtime(control_plane: &ControlPlane, dir: &Path, max_entries: usize) -> AckRuntime {
    let mut config = AppConfig::default();
    config.region_id = REGION.to_string();
    config.api.endpoint_override = Some(control_plane.url());
    config.kubeconfig.cache_dir = dir.to_path_buf();
    config.kubeconfig.cache_max_size = max_entries;
    AckRuntime::from_config(config).expect("runtime")
}

pub fn access_key() -> CredentialFields {
    CredentialFields::access_key("LTAI5tIntegration", "integration-secret")
}
