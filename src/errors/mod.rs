//! # Error Handling
//!
//! Error types for the ackplane core using `thiserror`. Every failure carries
//! enough context (cluster id, mode, service, underlying cause) for the calling
//! tool handler to decide on retry or fallback; the core itself never retries.

use std::path::PathBuf;

/// Custom result type for ackplane operations
pub type Result<T> = std::result::Result<T, AckError>;

/// Main error type for the credential/client/kubeconfig core
#[derive(thiserror::Error, Debug)]
pub enum AckError {
    /// Credential fields are malformed or ambiguous
    #[error("Invalid credential: {reason}")]
    InvalidCredential { reason: String },

    /// SDK-level client construction failed
    #[error("Failed to build {service} client for region '{region}': {message}")]
    ClientBuild {
        service: String,
        region: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// LOCAL mode selected without a kubeconfig path
    #[error("Local kubeconfig path is not set for cluster '{cluster_id}'")]
    LocalPathNotConfigured { cluster_id: String },

    /// LOCAL mode path does not exist
    #[error("File {} does not exist (cluster '{cluster_id}')", .path.display())]
    LocalArtifactMissing { cluster_id: String, path: PathBuf },

    /// ACK_PUBLIC selected for a cluster without a public API server endpoint
    #[error("Cluster '{cluster_id}' does not have public endpoint access")]
    NoPublicEndpoint { cluster_id: String },

    /// ACK_PRIVATE selected for a cluster without an intranet API server endpoint
    #[error("Cluster '{cluster_id}' does not have intranet endpoint access")]
    NoPrivateEndpoint { cluster_id: String },

    /// Generic kubeconfig acquisition failure
    #[error("Failed to get kubeconfig for cluster '{cluster_id}' ({mode}): {message}")]
    Provision {
        cluster_id: String,
        mode: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Remote OpenAPI call failed
    #[error("{action} failed (status: {status}, code: {code}): {message}")]
    Api {
        action: String,
        status: u16,
        code: String,
        message: String,
        request_id: Option<String>,
    },

    /// Transport-level failure talking to a remote endpoint
    #[error("{action} request failed: {source}")]
    Http {
        action: String,
        #[source]
        source: reqwest::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },
}

impl AckError {
    /// Create a new invalid credential error
    pub fn invalid_credential<S: Into<String>>(reason: S) -> Self {
        Self::InvalidCredential { reason: reason.into() }
    }

    /// Create a client build error without an underlying source
    pub fn client_build(
        service: impl Into<String>,
        region: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ClientBuild {
            service: service.into(),
            region: region.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a provisioning error without an underlying source
    pub fn provision(
        cluster_id: impl Into<String>,
        mode: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Provision {
            cluster_id: cluster_id.into(),
            mode: mode.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an arbitrary failure raised while provisioning a kubeconfig
    pub fn provision_with_source(
        cluster_id: impl Into<String>,
        mode: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Provision {
            cluster_id: cluster_id.into(),
            mode: mode.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Wrap a transport failure for `action`
    pub fn http(action: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Http { action: action.into(), source }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    /// Create an I/O error with context
    pub fn io(source: std::io::Error, context: impl Into<String>) -> Self {
        Self::Io { source, context: context.into() }
    }

    /// Whether the failure was caused by the selected kubeconfig mode being
    /// inapplicable (as opposed to a transient remote failure)
    pub fn is_mode_mismatch(&self) -> bool {
        matches!(
            self,
            Self::LocalPathNotConfigured { .. }
                | Self::LocalArtifactMissing { .. }
                | Self::NoPublicEndpoint { .. }
                | Self::NoPrivateEndpoint { .. }
        )
    }
}

impl From<validator::ValidationErrors> for AckError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::config(errors.to_string())
    }
}
