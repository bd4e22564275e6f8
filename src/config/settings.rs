//! # Configuration Settings
//!
//! Defines the configuration structure for the ackplane core.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

use crate::clients::ClientSettings;
use crate::credentials::CredentialFields;
use crate::errors::{AckError, Result};
use crate::kubeconfig::KubeconfigMode;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    /// Region used when a request names none
    #[validate(length(min = 1, message = "Region cannot be empty"))]
    pub region_id: String,

    /// Process-level credential; absent fields fall through to the ambient chain
    #[serde(default)]
    pub credentials: CredentialFields,

    #[validate(nested)]
    pub kubeconfig: KubeconfigConfig,

    #[validate(nested)]
    pub api: ApiConfig,

    #[validate(nested)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            region_id: "cn-hangzhou".to_string(),
            credentials: CredentialFields::default(),
            kubeconfig: KubeconfigConfig::default(),
            api: ApiConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(AckError::from)?;
        self.validate_custom()
    }

    fn validate_custom(&self) -> Result<()> {
        if self.kubeconfig.mode == KubeconfigMode::Local && self.kubeconfig.path.is_none() {
            return Err(AckError::config("KUBECONFIG_PATH is required when KUBECONFIG_MODE is LOCAL"));
        }

        if let Some(endpoint) = &self.api.endpoint_override {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(AckError::config("Endpoint override must start with 'http://' or 'https://'"));
            }
        }

        crate::credentials::resolve(&self.credentials)?;
        Ok(())
    }
}

/// Kubeconfig acquisition and cache settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct KubeconfigConfig {
    /// Default acquisition mode
    pub mode: KubeconfigMode,

    /// File used in LOCAL mode
    pub path: Option<PathBuf>,

    /// Maximum cached kubeconfig files
    #[validate(range(min = 1, max = 1024, message = "Cache size must be between 1 and 1024"))]
    pub cache_max_size: usize,

    /// Lifetime of fetched kubeconfig credentials
    #[validate(range(min = 15, max = 4320, message = "TTL must be between 15 and 4320 minutes"))]
    pub ttl_minutes: u32,

    /// Directory holding fetched and synthesized kubeconfig files
    pub cache_dir: PathBuf,
}

impl Default for KubeconfigConfig {
    fn default() -> Self {
        Self {
            mode: KubeconfigMode::AckPublic,
            path: None,
            cache_max_size: 16,
            ttl_minutes: 60,
            cache_dir: default_cache_dir(),
        }
    }
}

/// Control-plane API settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ApiConfig {
    /// Request timeout in seconds
    #[validate(range(min = 1, max = 600, message = "Timeout must be between 1 and 600 seconds"))]
    pub timeout_seconds: u64,

    /// Base URL replacing every service endpoint
    pub endpoint_override: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { timeout_seconds: 30, endpoint_override: None }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings { timeout: self.timeout(), endpoint_override: self.endpoint_override.clone() }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

/// `~/.kube`, or `.kube` under the working directory when there is no home
pub fn default_cache_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".kube")
}
