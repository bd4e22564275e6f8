//! # Structured Logging
//!
//! Subscriber setup and span helpers built on the tracing ecosystem.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{AppConfig, LoggingConfig};
use crate::errors::{AckError, Result};

/// Create a tracing span for one kubeconfig acquisition.
///
/// ```rust,ignore
/// let span = kubeconfig_span!("c-123", KubeconfigMode::AckPublic);
/// ```
#[macro_export]
macro_rules! kubeconfig_span {
    ($cluster_id:expr, $mode:expr) => {
        tracing::info_span!(
            "kubeconfig",
            cluster_id = %$cluster_id,
            mode = %$mode,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
    ($cluster_id:expr, $mode:expr, $($field:tt)*) => {
        tracing::info_span!(
            "kubeconfig",
            cluster_id = %$cluster_id,
            mode = %$mode,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Create a tracing span for one control-plane call
#[macro_export]
macro_rules! api_span {
    ($action:expr, $region:expr) => {
        tracing::debug_span!(
            "openapi_call",
            action = %$action,
            region = %$region,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level; `verbose` raises the configured
/// level to `debug`. Installing twice (tests, embedding) is not an error.
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { config.level.as_str() };
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives),
        _ => EnvFilter::try_new(default_level),
    }
    .map_err(|e| AckError::config(format!("Invalid log filter: {}", e)))?;

    let registry = tracing_subscriber::registry().with(filter);
    // A subscriber may already be set (integration tests, embedding hosts).
    let _ = if config.json {
        registry.with(fmt::layer().json().with_current_span(true).with_writer(std::io::stderr)).try_init()
    } else {
        registry.with(fmt::layer().with_target(false).with_writer(std::io::stderr)).try_init()
    };
    Ok(())
}

/// Log configuration at startup
pub fn log_config_info(config: &AppConfig) {
    let credentials = crate::credentials::resolve(&config.credentials)
        .map(|c| c.kind())
        .unwrap_or("invalid");
    tracing::info!(
        region_id = %config.region_id,
        credential = credentials,
        kubeconfig_mode = %config.kubeconfig.mode,
        kubeconfig_cache_dir = %config.kubeconfig.cache_dir.display(),
        kubeconfig_cache_max_size = config.kubeconfig.cache_max_size,
        kubeconfig_ttl_minutes = config.kubeconfig.ttl_minutes,
        endpoint_override = ?config.api.endpoint_override,
        "ackplane configuration"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubeconfig::KubeconfigMode;

    #[test]
    fn test_macros_compile() {
        let _span = kubeconfig_span!("c-1", KubeconfigMode::AckPublic);
        let _span = kubeconfig_span!("c-1", KubeconfigMode::Local, region = "cn-hangzhou");
        let _span = api_span!("DescribeClusterDetail", "cn-hangzhou");
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        let config = LoggingConfig::default();
        assert!(init_logging(&config, false).is_ok());
        assert!(init_logging(&config, true).is_ok());
    }

    #[test]
    fn test_log_config_info() {
        log_config_info(&AppConfig::default());
    }
}
