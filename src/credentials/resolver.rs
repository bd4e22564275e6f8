//! Credential resolution.
//!
//! Turns the loose bag of per-request credential fields into a closed
//! [`Credential`] with a strict precedence order:
//!
//! 1. security token + AccessKey pair → [`Credential::Session`]
//! 2. AccessKey pair → [`Credential::AccessKey`]
//! 3. nothing → [`Credential::Ambient`]
//!
//! Anything in between (a token without a pair, half a pair) is rejected
//! rather than silently falling back to the ambient identity.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::secret::SecretString;
use crate::errors::{AckError, Result};

/// Credential fields as supplied by the tool-dispatch layer for one call.
///
/// Every field is optional; blank strings are treated as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialFields {
    pub access_key_id: Option<String>,
    pub access_key_secret: Option<SecretString>,
    pub security_token: Option<SecretString>,
    pub region: Option<String>,
}

impl CredentialFields {
    /// Fields carrying an explicit AccessKey pair
    pub fn access_key(id: impl Into<String>, secret: impl Into<SecretString>) -> Self {
        Self {
            access_key_id: Some(id.into()),
            access_key_secret: Some(secret.into()),
            ..Default::default()
        }
    }

    /// Fields carrying an STS session triple
    pub fn session(
        id: impl Into<String>,
        secret: impl Into<SecretString>,
        token: impl Into<SecretString>,
    ) -> Self {
        Self {
            access_key_id: Some(id.into()),
            access_key_secret: Some(secret.into()),
            security_token: Some(token.into()),
            region: None,
        }
    }

    /// Set the region carried alongside the credential
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Fill every absent field from `defaults`.
    ///
    /// Request-scoped fields win; process-level configuration only fills gaps.
    pub fn or(self, defaults: &CredentialFields) -> Self {
        let has_own_key = present(&self.access_key_id).is_some()
            || self.access_key_secret.as_ref().is_some_and(|s| !s.is_blank())
            || self.security_token.as_ref().is_some_and(|t| !t.is_blank());

        // Key material (id, secret, token) is taken as a unit from one side;
        // mixing would produce a credential nobody supplied.
        if has_own_key {
            Self { region: self.region.or_else(|| defaults.region.clone()), ..self }
        } else {
            Self {
                access_key_id: defaults.access_key_id.clone(),
                access_key_secret: defaults.access_key_secret.clone(),
                security_token: defaults.security_token.clone(),
                region: self.region.or_else(|| defaults.region.clone()),
            }
        }
    }

    /// The non-blank region, if any
    pub fn region(&self) -> Option<&str> {
        present(&self.region)
    }
}

/// Resolved credential strategy for one call.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Long-lived AccessKey pair
    AccessKey { id: String, secret: SecretString },
    /// Short-lived STS credential; never cached
    Session { id: String, secret: SecretString, token: SecretString },
    /// Platform default identity chain (environment, ECS RAM role)
    Ambient,
}

impl Credential {
    /// Cache identity for this credential.
    ///
    /// `None` for session credentials, which must not be cached. Ambient
    /// credentials share the empty identity so every ambient request for a
    /// region reuses one client.
    pub fn fingerprint(&self) -> Option<&str> {
        match self {
            Self::AccessKey { id, .. } => Some(id.as_str()),
            Self::Session { .. } => None,
            Self::Ambient => Some(""),
        }
    }

    /// Short name of the strategy for logs and tool output
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AccessKey { .. } => "access_key",
            Self::Session { .. } => "sts",
            Self::Ambient => "default_chain",
        }
    }

    pub fn is_session(&self) -> bool {
        matches!(self, Self::Session { .. })
    }

    /// Key id rendered safe for logs
    pub fn redacted_id(&self) -> String {
        match self {
            Self::AccessKey { id, .. } | Self::Session { id, .. } => redact_key_id(id),
            Self::Ambient => String::new(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("kind", &self.kind())
            .field("access_key_id", &self.redacted_id())
            .finish()
    }
}

/// Resolve credential fields into a [`Credential`].
pub fn resolve(fields: &CredentialFields) -> Result<Credential> {
    let id = present(&fields.access_key_id);
    let secret = fields.access_key_secret.as_ref().filter(|s| !s.is_blank());
    let token = fields.security_token.as_ref().filter(|s| !s.is_blank());

    match (id, secret, token) {
        (Some(id), Some(secret), Some(token)) => Ok(Credential::Session {
            id: id.to_string(),
            secret: secret.clone(),
            token: token.clone(),
        }),
        (_, _, Some(_)) => Err(AckError::invalid_credential(
            "STS token is provided, but access key ID or secret is missing",
        )),
        (Some(id), Some(secret), None) => {
            Ok(Credential::AccessKey { id: id.to_string(), secret: secret.clone() })
        }
        (Some(_), None, None) => {
            Err(AckError::invalid_credential("access key ID is provided without a secret"))
        }
        (None, Some(_), None) => {
            Err(AckError::invalid_credential("access key secret is provided without an ID"))
        }
        (None, None, None) => Ok(Credential::Ambient),
    }
}

/// Render a key id as `...` plus its last four characters.
pub fn redact_key_id(id: &str) -> String {
    let tail: String = id.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    format!("...{}", tail)
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
