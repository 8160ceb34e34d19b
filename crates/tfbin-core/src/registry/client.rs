use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::meta::ProviderAddress;

/// One published provider version and the platforms it was built for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderVersion {
    pub version: String,
    #[serde(default)]
    pub protocols: Vec<String>,
    #[serde(default)]
    pub platforms: Vec<Platform>,
}

impl ProviderVersion {
    pub fn new(version: impl Into<String>, platforms: Vec<Platform>) -> Self {
        Self {
            version: version.into(),
            protocols: Vec::new(),
            platforms,
        }
    }

    pub fn supports(&self, os: &str, arch: &str) -> bool {
        self.platforms
            .iter()
            .any(|platform| platform.os == os && platform.arch == arch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }
}

/// Remote provider registry as seen by [`super::Registry`].
pub trait RegistryClient: Send + Sync {
    /// Every published version of `address` with its platform matrix.
    fn provider_versions(&self, address: &ProviderAddress) -> Result<Vec<ProviderVersion>>;

    /// Location of the archive for one exact build.
    fn download_url(
        &self,
        address: &ProviderAddress,
        version: &str,
        os: &str,
        arch: &str,
    ) -> Result<String>;

    /// Fetch the body at `url`; any non-success status is an error.
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}
