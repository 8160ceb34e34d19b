//! Cache-first provider resolution in front of a remote registry.

use std::fmt;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::archive::ProviderArchive;
use crate::cache::{CachedArtifact, ProviderCache};
use crate::error::{ProviderError, Result};
use crate::meta::{ProviderAddress, ProviderMeta};

mod client;
mod http;

pub use client::{Platform, ProviderVersion, RegistryClient};
pub use http::{HttpRegistryClient, SERVICE_DISCOVERY_PATH};

/// Resolves providers from an optional [`ProviderCache`], falling back to a
/// [`RegistryClient`] and writing downloads through the cache.
pub struct Registry {
    client: Arc<dyn RegistryClient>,
    cache: Option<ProviderCache>,
}

impl Registry {
    pub fn new(client: Arc<dyn RegistryClient>) -> Self {
        Self {
            client,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: ProviderCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache(&self) -> Option<&ProviderCache> {
        self.cache.as_ref()
    }

    /// Published versions of `address`, straight from the remote registry.
    pub fn versions(&self, address: &ProviderAddress) -> Result<Vec<ProviderVersion>> {
        self.client.provider_versions(address)
    }

    /// Find the provider exactly matching `query`, consulting the cache first.
    ///
    /// Only a cache `NoMatch` falls through to the remote registry; any other
    /// cache failure is returned without touching the network.
    pub fn search(&self, query: &ProviderMeta) -> Result<ProviderMeta> {
        if let Some(cache) = &self.cache {
            match cache.search(query) {
                Ok(found) => {
                    debug!(provider = %found, "resolved provider from cache");
                    return Ok(found);
                }
                Err(err) if err.is_no_match() => {
                    debug!(%query, "provider not cached, querying registry");
                }
                Err(err) => return Err(err),
            }
        }

        let versions = self.client.provider_versions(&query.address())?;
        let candidates = versions.iter().flat_map(|listing| {
            listing.platforms.iter().map(|platform| ProviderMeta {
                host: query.host.clone(),
                namespace: query.namespace.clone(),
                name: query.name.clone(),
                version: listing.version.clone(),
                os: platform.os.clone(),
                arch: platform.arch.clone(),
            })
        });
        query.find_match(candidates)
    }

    /// Open the artifact for the exact provider `meta`.
    ///
    /// With a cache configured the returned reader always comes from the cache
    /// directory, including right after a download. Only a missing or empty
    /// cache leaf triggers a download; any other cache error is returned as is.
    pub fn provider_meta_reader(&self, meta: &ProviderMeta) -> Result<Artifact> {
        if let Some(cache) = &self.cache {
            match cache.reader(meta) {
                Ok(cached) => return Ok(Artifact::from(cached)),
                Err(err) if err.is_not_cached() => {
                    debug!(%meta, "artifact not cached, downloading");
                }
                Err(err) => return Err(err),
            }
        }

        let url = self.client.download_url(
            &meta.address(),
            &meta.version,
            &meta.os,
            &meta.arch,
        )?;
        let bytes = self.client.fetch(&url)?;
        let mut archive = ProviderArchive::from_bytes(meta, &url, bytes)?;
        info!(
            provider = %meta,
            url = %url,
            entry = archive.entry_name(),
            "downloaded provider archive"
        );

        let Some(cache) = &self.cache else {
            let (filename, bytes) = archive.into_entry_bytes()?;
            return Ok(Artifact {
                filename,
                origin: ArtifactOrigin::Remote(url),
                body: Box::new(Cursor::new(bytes)),
            });
        };

        let mut writer = cache.writer(meta, archive.entry_name())?;
        archive
            .copy_entry_to(&mut writer)
            .map_err(|err| ProviderError::io(writer.path(), err))?;
        let stored = writer.finish()?;
        debug!(path = %stored.display(), "cached provider artifact");
        cache.reader(meta).map(Artifact::from)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

/// Where an [`Artifact`] was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactOrigin {
    Cache(PathBuf),
    Remote(String),
}

/// Readable provider binary plus the file name it was published under.
pub struct Artifact {
    filename: String,
    origin: ArtifactOrigin,
    body: Box<dyn Read + Send>,
}

impl Artifact {
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn origin(&self) -> &ArtifactOrigin {
        &self.origin
    }

    /// Cache location of the artifact, when it was served from the cache.
    pub fn cached_path(&self) -> Option<&Path> {
        match &self.origin {
            ArtifactOrigin::Cache(path) => Some(path),
            ArtifactOrigin::Remote(_) => None,
        }
    }
}

impl From<CachedArtifact> for Artifact {
    fn from(cached: CachedArtifact) -> Self {
        let (filename, path, file) = cached.into_parts();
        Self {
            filename,
            origin: ArtifactOrigin::Cache(path),
            body: Box::new(file),
        }
    }
}

impl Read for Artifact {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.body.read(buf)
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("filename", &self.filename)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}
