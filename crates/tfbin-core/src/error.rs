//! Structured error types produced across the cache, remote client, and registry pipeline.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::meta::ProviderMeta;

/// Result type for provider resolution operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// A query was not satisfied by the candidate set it was matched against.
    #[error("no results for query: {query}")]
    NoMatch { query: ProviderMeta },

    /// The cache leaf directory for a provider is missing or empty.
    #[error("no cached artifact for {meta} in {}", .dir.display())]
    NotCached { meta: ProviderMeta, dir: PathBuf },

    /// More than one artifact candidate where exactly one is required.
    #[error("ambiguous artifact for {meta}: {detail}")]
    AmbiguousArtifact { meta: ProviderMeta, detail: String },

    #[error("cache path {} does not decode into a provider: {reason}", .path.display())]
    MalformedCache { path: PathBuf, reason: String },

    #[error("provider {meta} cannot be stored in the cache: {reason}")]
    InvalidMeta { meta: ProviderMeta, reason: String },

    #[error("artifact filename `{filename}` is not a plain file name")]
    InvalidFilename { filename: String },

    #[error("invalid provider address `{value}`: {reason}")]
    InvalidAddress { value: String, reason: String },

    #[error("registry {host} does not offer the {service} service")]
    UnsupportedRegistry { host: String, service: String },

    #[error("invalid URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GET of {url} had a non-success result: {status}")]
    Status { url: String, status: u16 },

    #[error("invalid registry response from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("archive downloaded from {url} is unreadable: {source}")]
    Archive {
        url: String,
        #[source]
        source: zip::result::ZipError,
    },
}

impl ProviderError {
    pub fn no_match(query: ProviderMeta) -> Self {
        Self::NoMatch { query }
    }

    pub fn ambiguous(meta: &ProviderMeta, detail: impl Into<String>) -> Self {
        Self::AmbiguousArtifact {
            meta: meta.clone(),
            detail: detail.into(),
        }
    }

    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedCache {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_meta(meta: &ProviderMeta, reason: impl Into<String>) -> Self {
        Self::InvalidMeta {
            meta: meta.clone(),
            reason: reason.into(),
        }
    }

    pub fn invalid_address(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn http(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Http {
            url: url.into(),
            source,
        }
    }

    /// True for the "query not satisfied" kind, the only error the registry
    /// recovers from by falling back to the remote service.
    pub fn is_no_match(&self) -> bool {
        matches!(self, Self::NoMatch { .. })
    }

    /// True when a cache leaf simply holds nothing for the requested provider.
    pub fn is_not_cached(&self) -> bool {
        matches!(self, Self::NotCached { .. })
    }
}
