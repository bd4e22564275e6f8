//! Releasing artifacts that leave the cache.

use std::io::ErrorKind;
use tracing::{info, warn};

use super::artifact::{Artifact, Disposal};

/// Releases whatever an artifact holds once the cache drops it.
///
/// Called synchronously with the cache's pin table held and its entry lock
/// released. Failures are logged, never returned, so a failed delete cannot
/// fail the lookup that evicted it.
pub trait ArtifactDisposer: Send + Sync {
    fn dispose(&self, artifact: &Artifact);
}

/// Deletes Owned files, ignores Borrowed ones
#[derive(Debug, Default, Clone, Copy)]
pub struct FileDisposer;

impl ArtifactDisposer for FileDisposer {
    fn dispose(&self, artifact: &Artifact) {
        if artifact.disposal == Disposal::Borrowed {
            return;
        }
        match std::fs::remove_file(&artifact.path) {
            Ok(()) => info!(path = %artifact.path.display(), mode = %artifact.mode, "Removed kubeconfig file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %artifact.path.display(),
                error = %e,
                "Failed to remove kubeconfig file"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubeconfig::mode::KubeconfigMode;

    #[test]
    fn test_owned_file_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mcp-kubeconfig-c-1-x.yaml");
        std::fs::write(&path, "apiVersion: v1").unwrap();

        FileDisposer.dispose(&Artifact::owned(path.clone(), KubeconfigMode::AckPublic));
        assert!(!path.exists());

        // Second disposal of the same path is a no-op.
        FileDisposer.dispose(&Artifact::owned(path.clone(), KubeconfigMode::AckPublic));
    }

    #[test]
    fn test_borrowed_file_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        std::fs::write(&path, "apiVersion: v1").unwrap();

        FileDisposer.dispose(&Artifact::borrowed(path.clone()));
        assert!(path.exists());
    }
}
