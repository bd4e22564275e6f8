//! # ackplane
//!
//! Credential-scoped client and kubeconfig cache for MCP tool handlers that
//! operate Alibaba Cloud Container Service for Kubernetes (ACK).
//!
//! ## Architecture
//!
//! ```text
//! tool handler → AckRuntime ─┬→ ServiceClientCache → ClientBuilder → ServiceClient (signed OpenAPI)
//!                            └→ KubeconfigCache → KubeconfigProvisioner → kubeconfig file on disk
//! ```
//!
//! ## Core Components
//!
//! - **Credentials**: resolves per-request key material into a closed strategy
//!   (AccessKey, STS session, ambient chain)
//! - **Clients**: one cached, signed OpenAPI client per identity, region and service
//! - **Kubeconfig**: bounded cache of per-cluster kubeconfig files, four
//!   acquisition modes, owned files deleted on eviction
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use ackplane::{AckRuntime, AppConfig, CredentialFields, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let runtime = AckRuntime::from_config(AppConfig::from_env()?)?;
//!     let path = runtime
//!         .get_config_path("c-123", "cn-hangzhou", None, None, &CredentialFields::default())
//!         .await?;
//!     println!("{}", path.display());
//!     runtime.cleanup();
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod clients;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod kubeconfig;
pub mod observability;
pub mod runtime;

// Re-export commonly used types and traits
pub use clients::{ServiceClient, ServiceKind};
pub use config::AppConfig;
pub use credentials::{Credential, CredentialFields};
pub use errors::{AckError, Result};
pub use kubeconfig::KubeconfigMode;
pub use runtime::AckRuntime;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
