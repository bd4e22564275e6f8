use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::mode::KubeconfigMode;

/// Who is responsible for the file behind an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposal {
    /// Created by this process; deleted when the cache lets go of it
    Owned,
    /// Supplied by the user; never deleted
    Borrowed,
}

/// Cache key for kubeconfig artifacts
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize)]
pub struct ArtifactKey {
    pub cluster_id: String,
    pub region: String,
}

impl ArtifactKey {
    pub fn new(cluster_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self { cluster_id: cluster_id.into(), region: region.into() }
    }
}

/// A kubeconfig file on disk plus how it got there
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub disposal: Disposal,
    pub mode: KubeconfigMode,
    /// When the embedded temporary credential stops working, if it expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl Artifact {
    pub fn owned(path: PathBuf, mode: KubeconfigMode) -> Self {
        Self { path, disposal: Disposal::Owned, mode, expires_at: None }
    }

    pub fn borrowed(path: PathBuf) -> Self {
        Self { path, disposal: Disposal::Borrowed, mode: KubeconfigMode::Local, expires_at: None }
    }

    pub fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_owned(&self) -> bool {
        self.disposal == Disposal::Owned
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}
