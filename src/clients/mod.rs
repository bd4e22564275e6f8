//! Alibaba Cloud OpenAPI clients and the credential-scoped client cache.

pub mod builder;
pub mod cache;
pub mod client;
pub mod cluster;
pub mod service;
pub mod signer;

pub use builder::{ClientBuilder, ClientSettings, HttpClientBuilder};
pub use cache::{ClientKey, ServiceClientCache};
pub use client::{ApiRequest, KeySource, ServiceClient};
pub use cluster::{ClusterApi, ClusterApiProvider, ClusterDetail, ClusterEndpoints};
pub use service::ServiceKind;
