//! Provider plugin resolution core for tfbin.
//!
//! This crate provides the building blocks required to match provider
//! coordinates, keep downloaded plugin binaries in an on-disk cache keyed by
//! those coordinates, and fetch missing plugins from a remote registry.

pub mod archive;
pub mod cache;
pub mod env;
pub mod error;
pub mod meta;
pub mod registry;

pub use cache::{CacheEntry, CacheWriter, CachedArtifact, ProviderCache};
pub use env::{CacheLocation, FetchConfig};
pub use error::{ProviderError, Result};
pub use meta::{DEFAULT_NAMESPACE, DEFAULT_REGISTRY_HOST, ProviderAddress, ProviderMeta};
pub use registry::{
    Artifact, ArtifactOrigin, HttpRegistryClient, Platform, ProviderVersion, Registry,
    RegistryClient,
};
