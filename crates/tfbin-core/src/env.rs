use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::cache::ProviderCache;
use crate::meta::DEFAULT_REGISTRY_HOST;
use crate::registry::{HttpRegistryClient, Registry};

pub const CACHE_DIR_VAR: &str = "TFBIN_CACHE_DIR";
pub const NO_CACHE_VAR: &str = "TFBIN_NO_CACHE";
pub const REGISTRY_HOST_VAR: &str = "TFBIN_REGISTRY_HOST";
pub const HTTP_TIMEOUT_VAR: &str = "TFBIN_HTTP_TIMEOUT_SECS";

/// Environment-driven configuration for provider resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub cache: CacheLocation,
    pub registry_host: String,
    pub http_timeout: Option<Duration>,
}

/// Where (and whether) the provider cache lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLocation {
    Disabled,
    /// `$CWD/.tf-cache`
    Default,
    Dir(PathBuf),
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            cache: CacheLocation::Default,
            registry_host: DEFAULT_REGISTRY_HOST.to_string(),
            http_timeout: None,
        }
    }
}

impl FetchConfig {
    /// Build a [`FetchConfig`] by reading the documented TFBIN_* variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`FetchConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let no_cache = lookup(NO_CACHE_VAR)
            .map(|value| parse_flag(NO_CACHE_VAR, &value))
            .transpose()?
            .unwrap_or(false);
        let cache = if no_cache {
            CacheLocation::Disabled
        } else {
            lookup(CACHE_DIR_VAR)
                .filter(|value| !value.trim().is_empty())
                .map(|value| CacheLocation::Dir(PathBuf::from(value)))
                .unwrap_or(CacheLocation::Default)
        };

        let registry_host = lookup(REGISTRY_HOST_VAR)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_REGISTRY_HOST.to_string());

        let http_timeout = lookup(HTTP_TIMEOUT_VAR)
            .map(|value| {
                u64::from_str(value.trim()).with_context(|| {
                    format!("{HTTP_TIMEOUT_VAR} must be a whole number of seconds")
                })
            })
            .transpose()?
            .map(Duration::from_secs);

        Ok(Self {
            cache,
            registry_host,
            http_timeout,
        })
    }

    /// Open the configured cache, or `None` when caching is disabled.
    pub fn open_cache(&self) -> Result<Option<ProviderCache>> {
        let cache = match &self.cache {
            CacheLocation::Disabled => return Ok(None),
            CacheLocation::Default => ProviderCache::open_default(),
            CacheLocation::Dir(dir) => ProviderCache::new(dir.clone()),
        }
        .context("failed to open provider cache")?;
        Ok(Some(cache))
    }

    /// Registry backed by the HTTP client, with the configured cache attached.
    pub fn build_registry(&self) -> Result<Registry> {
        let client = HttpRegistryClient::with_timeout(self.http_timeout)
            .context("failed to build registry HTTP client")?;
        let registry = Registry::new(Arc::new(client));
        Ok(match self.open_cache()? {
            Some(cache) => registry.with_cache(cache),
            None => registry,
        })
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("unsupported {key} value `{other}`"),
    }
}
