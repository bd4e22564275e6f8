//! Credential handling for Alibaba Cloud OpenAPI calls.
//!
//! - [`resolver`]: per-request fields → closed [`Credential`] strategy
//! - [`ambient`]: default identity chain (environment, ECS RAM role)
//! - [`secret`]: redacted, zeroizing wrapper for key material

pub mod ambient;
pub mod resolver;
pub mod secret;

pub use ambient::{AmbientChain, SigningKey};
pub use resolver::{redact_key_id, resolve, Credential, CredentialFields};
pub use secret::SecretString;
