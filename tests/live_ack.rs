//! Against a real ACK account. Needs the usual environment (`REGION_ID`,
//! `ACCESS_KEY_ID`/`ACCESS_KEY_SECRET` or the default chain) plus
//! `ACK_LIVE_CLUSTER_ID`.
//!
//! ```bash
//! ACK_LIVE_CLUSTER_ID=c-xxxx cargo test --features integration-tests --test live_ack
//! ```

#![cfg(feature = "integration-tests")]

use ackplane::{AckRuntime, AppConfig, CredentialFields, KubeconfigMode};

fn live_cluster() -> Option<String> {
    std::env::var("ACK_LIVE_CLUSTER_ID").ok().filter(|v| !v.is_empty())
}

#[tokio::test]
async fn test_live_public_kubeconfig_round_trip() {
    let Some(cluster_id) = live_cluster() else {
        eprintln!("ACK_LIVE_CLUSTER_ID not set; skipping");
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::from_env().unwrap();
    config.kubeconfig.cache_dir = dir.path().to_path_buf();
    let runtime = AckRuntime::from_config(config).unwrap();

    let fields = CredentialFields::default();
    let first = runtime
        .get_config_path(&cluster_id, "", Some(KubeconfigMode::AckPublic), None, &fields)
        .await
        .unwrap();
    let second = runtime
        .get_config_path(&cluster_id, "", Some(KubeconfigMode::AckPublic), None, &fields)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert!(std::fs::read_to_string(&first).unwrap().contains("apiVersion"));

    runtime.cleanup();
    assert!(!first.exists());
}
