//! Default identity chain: environment keys and ECS RAM role credentials.

mod common;

use std::sync::{Arc, Mutex};

use ackplane::clients::{ApiRequest, ClientSettings, HttpClientBuilder, ServiceClientCache, ServiceKind};
use ackplane::credentials::ambient::{ENV_ACCESS_KEY_ID, ENV_ACCESS_KEY_SECRET, ENV_ECS_ROLE, ENV_SECURITY_TOKEN};
use ackplane::credentials::AmbientChain;
use ackplane::{AckError, CredentialFields};
use common::{ControlPlane, REGION};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

static ENV_MUTEX: Mutex<()> = Mutex::new(());

const ROLE: &str = "ack-mcp-role";

fn clear_env() {
    for var in [ENV_ACCESS_KEY_ID, ENV_ACCESS_KEY_SECRET, ENV_SECURITY_TOKEN, ENV_ECS_ROLE] {
        std::env::remove_var(var);
    }
}

async fn metadata_service() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/latest/meta-data/ram/security-credentials/{}", ROLE)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Code": "Success",
            "AccessKeyId": "STS.RoleKey",
            "AccessKeySecret": "role-secret",
            "SecurityToken": "role-token",
            "Expiration": "2099-01-01T00:00:00Z",
            "LastUpdated": "2026-01-01T00:00:00Z",
        })))
        .expect(1)
        .mount(&server)
        .await;
    server
}

fn ambient_cache(control_plane: &ControlPlane, metadata: &MockServer) -> ServiceClientCache {
    let settings = ClientSettings { endpoint_override: Some(control_plane.url()), ..Default::default() };
    let builder = HttpClientBuilder::new(settings).unwrap();
    let chain = AmbientChain::with_metadata_endpoint(builder.http_client().clone(), metadata.uri());
    ServiceClientCache::new(Arc::new(builder.with_ambient(Arc::new(chain))), REGION)
}

#[tokio::test]
async fn test_ecs_role_credentials_are_fetched_once() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();
    std::env::set_var(ENV_ECS_ROLE, ROLE);

    let metadata = metadata_service().await;
    let control_plane = ControlPlane::start().await;
    Mock::given(method("GET"))
        .and(path("/clusters/c-1"))
        .and(header("x-acs-security-token", "role-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"cluster_id": "c-1"})))
        .expect(3)
        .mount(&control_plane.server)
        .await;
    let cache = ambient_cache(&control_plane, &metadata);

    let fields = CredentialFields::default();
    for service in [ServiceKind::ContainerService, ServiceKind::Log] {
        let client = cache.get_client(&fields, REGION, service).await.unwrap();
        assert_eq!(client.credential_kind(), "default_chain");
    }
    let client = cache.get_client(&fields, REGION, ServiceKind::ContainerService).await.unwrap();
    for _ in 0..3 {
        client.call(ApiRequest::get("DescribeClusterDetail", "/clusters/c-1")).await.unwrap();
    }

    let requests = control_plane.hits("/clusters/c-1").await;
    let authorization = requests[0].headers.get("authorization").unwrap().to_str().unwrap();
    assert!(authorization.contains("Credential=STS.RoleKey,"));
    clear_env();
}

#[tokio::test]
async fn test_environment_keys_take_precedence_over_role() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();
    std::env::set_var(ENV_ACCESS_KEY_ID, "LTAI5tFromEnv");
    std::env::set_var(ENV_ACCESS_KEY_SECRET, "env-secret");
    std::env::set_var(ENV_ECS_ROLE, ROLE);

    let metadata = MockServer::start().await;
    let chain = AmbientChain::with_metadata_endpoint(reqwest::Client::new(), metadata.uri());
    let key = chain.signing_key().await.unwrap();

    assert_eq!(key.access_key_id, "LTAI5tFromEnv");
    assert_eq!(key.access_key_secret.expose_secret(), "env-secret");
    assert!(key.security_token.is_none());
    assert!(metadata.received_requests().await.unwrap_or_default().is_empty());
    clear_env();
}

#[tokio::test]
async fn test_missing_ambient_identity_fails_at_call_time() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();

    let metadata = MockServer::start().await;
    let control_plane = ControlPlane::start().await;
    let cache = ambient_cache(&control_plane, &metadata);

    let client = cache.get_client(&CredentialFields::default(), REGION, ServiceKind::ContainerService).await.unwrap();
    let err = client.call(ApiRequest::get("DescribeClusterDetail", "/clusters/c-1")).await.unwrap_err();

    assert!(matches!(err, AckError::InvalidCredential { .. }));
    assert!(control_plane.server.received_requests().await.unwrap_or_default().is_empty());
}
