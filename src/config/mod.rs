//! # Configuration Management
//!
//! Configuration is read from the process environment (a `.env` file is
//! loaded by the binary before this runs) and validated once at startup.

pub mod settings;

pub use settings::{ApiConfig, AppConfig, KubeconfigConfig, LoggingConfig};

use std::path::PathBuf;

use crate::credentials::{CredentialFields, SecretString};
use crate::errors::{AckError, Result};

impl AppConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = AppConfig::default();

        let region_id = env_non_empty("REGION_ID").unwrap_or(defaults.region_id);

        let credentials = CredentialFields {
            access_key_id: env_non_empty("ACCESS_KEY_ID"),
            access_key_secret: env_non_empty("ACCESS_KEY_SECRET").map(SecretString::new),
            security_token: env_non_empty("SECURITY_TOKEN").map(SecretString::new),
            region: None,
        };

        let mode = match env_non_empty("KUBECONFIG_MODE") {
            Some(raw) => raw.parse()?,
            None => defaults.kubeconfig.mode,
        };
        let kubeconfig = KubeconfigConfig {
            mode,
            path: env_non_empty("KUBECONFIG_PATH").map(PathBuf::from),
            cache_max_size: parse_env("KUBECONFIG_CACHE_MAX_SIZE", defaults.kubeconfig.cache_max_size)?,
            ttl_minutes: parse_env("KUBECONFIG_TTL_MINUTES", defaults.kubeconfig.ttl_minutes)?,
            cache_dir: env_non_empty("KUBECONFIG_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.kubeconfig.cache_dir),
        };

        let api = ApiConfig {
            timeout_seconds: parse_env("ACK_API_TIMEOUT_SECS", defaults.api.timeout_seconds)?,
            endpoint_override: env_non_empty("ACK_ENDPOINT_OVERRIDE"),
        };

        let logging = LoggingConfig {
            level: env_non_empty("LOG_LEVEL").unwrap_or(defaults.logging.level),
            json: match env_non_empty("LOG_FORMAT") {
                Some(format) => match format.to_ascii_lowercase().as_str() {
                    "json" => true,
                    "text" | "pretty" => false,
                    other => {
                        return Err(AckError::config(format!(
                            "Invalid LOG_FORMAT '{}': expected 'text' or 'json'",
                            other
                        )))
                    }
                },
                None => defaults.logging.json,
            },
        };

        let config = Self { region_id, credentials, kubeconfig, api, logging };
        config.validate()?;
        Ok(config)
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_env<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env_non_empty(name) {
        Some(raw) => raw.parse().map_err(|e| AckError::config(format!("Invalid {}: {}", name, e))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubeconfig::KubeconfigMode;
    use std::env;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "REGION_ID",
        "ACCESS_KEY_ID",
        "ACCESS_KEY_SECRET",
        "SECURITY_TOKEN",
        "KUBECONFIG_MODE",
        "KUBECONFIG_PATH",
        "KUBECONFIG_CACHE_MAX_SIZE",
        "KUBECONFIG_TTL_MINUTES",
        "KUBECONFIG_CACHE_DIR",
        "ACK_API_TIMEOUT_SECS",
        "ACK_ENDPOINT_OVERRIDE",
        "LOG_LEVEL",
        "LOG_FORMAT",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_config_from_env_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|p| p.into_inner());
        clear_env();

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.region_id, "cn-hangzhou");
        assert_eq!(config.kubeconfig.mode, KubeconfigMode::AckPublic);
        assert_eq!(config.kubeconfig.cache_max_size, 16);
        assert_eq!(config.kubeconfig.ttl_minutes, 60);
        assert_eq!(config.api.timeout_seconds, 30);
        assert!(!config.logging.json);
        assert_eq!(config.credentials, CredentialFields::default());
    }

    #[test]
    fn test_config_from_env() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|p| p.into_inner());
        clear_env();
        env::set_var("REGION_ID", "cn-beijing");
        env::set_var("ACCESS_KEY_ID", "LTAI5tEXAMPLE");
        env::set_var("ACCESS_KEY_SECRET", "secret");
        env::set_var("KUBECONFIG_MODE", "ack_private");
        env::set_var("KUBECONFIG_CACHE_MAX_SIZE", "4");
        env::set_var("KUBECONFIG_CACHE_DIR", "/tmp/ackplane-test");
        env::set_var("ACK_ENDPOINT_OVERRIDE", "http://127.0.0.1:8080");
        env::set_var("LOG_FORMAT", "json");

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.region_id, "cn-beijing");
        assert_eq!(config.credentials.access_key_id.as_deref(), Some("LTAI5tEXAMPLE"));
        assert_eq!(config.kubeconfig.mode, KubeconfigMode::AckPrivate);
        assert_eq!(config.kubeconfig.cache_max_size, 4);
        assert_eq!(config.kubeconfig.cache_dir, PathBuf::from("/tmp/ackplane-test"));
        assert_eq!(config.api.endpoint_override.as_deref(), Some("http://127.0.0.1:8080"));
        assert!(config.logging.json);

        clear_env();
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|p| p.into_inner());
        clear_env();

        env::set_var("KUBECONFIG_CACHE_MAX_SIZE", "many");
        let err = AppConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("KUBECONFIG_CACHE_MAX_SIZE"));
        clear_env();

        env::set_var("KUBECONFIG_MODE", "sideways");
        assert!(AppConfig::from_env().is_err());
        clear_env();

        env::set_var("SECURITY_TOKEN", "token-only");
        assert!(matches!(AppConfig::from_env(), Err(AckError::InvalidCredential { .. })));
        clear_env();
    }
}
