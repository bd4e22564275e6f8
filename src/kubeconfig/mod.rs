//! Per-cluster kubeconfig acquisition and caching.
//!
//! [`KubeconfigProvisioner`] knows how to obtain a kubeconfig in each
//! [`KubeconfigMode`]; [`KubeconfigCache`] keeps a bounded set of them on disk
//! and releases files it owns when entries leave the cache.

pub mod artifact;
pub mod cache;
pub mod dispose;
pub mod incluster;
pub mod lru;
pub mod mode;
pub mod provisioner;

pub use artifact::{Artifact, ArtifactKey, Disposal};
pub use cache::KubeconfigCache;
pub use dispose::{ArtifactDisposer, FileDisposer};
pub use incluster::InClusterEnv;
pub use lru::BoundedLru;
pub use mode::KubeconfigMode;
pub use provisioner::{ArtifactProvisioner, KubeconfigProvisioner, ProvisionRequest};
