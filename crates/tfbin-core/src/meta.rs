use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, Result};

/// Registry used when a provider address carries no hostname.
pub const DEFAULT_REGISTRY_HOST: &str = "registry.terraform.io";

/// Namespace assumed for bare provider names such as `null`.
pub const DEFAULT_NAMESPACE: &str = "hashicorp";

/// Identity of one provider plugin build.
///
/// Two values are the same artifact only when all six fields are byte-for-byte
/// equal; there is no normalization or wildcarding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderMeta {
    pub host: String,
    pub namespace: String,
    pub name: String,
    pub version: String,
    pub os: String,
    pub arch: String,
}

impl ProviderMeta {
    pub fn new(
        host: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        os: impl Into<String>,
        arch: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            namespace: namespace.into(),
            name: name.into(),
            version: version.into(),
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Build the coordinate of `address` at a specific version and platform.
    pub fn for_address(
        address: &ProviderAddress,
        version: impl Into<String>,
        os: impl Into<String>,
        arch: impl Into<String>,
    ) -> Self {
        Self::new(
            address.host.clone(),
            address.namespace.clone(),
            address.name.clone(),
            version,
            os,
            arch,
        )
    }

    pub fn equals(&self, other: &Self) -> bool {
        self == other
    }

    /// Return the first candidate equal to `self`, in the order given.
    pub fn find_match<I>(&self, candidates: I) -> Result<ProviderMeta>
    where
        I: IntoIterator<Item = ProviderMeta>,
    {
        candidates
            .into_iter()
            .find(|candidate| candidate.equals(self))
            .ok_or_else(|| ProviderError::no_match(self.clone()))
    }

    pub fn address(&self) -> ProviderAddress {
        ProviderAddress {
            host: self.host.clone(),
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }
}

impl fmt::Display for ProviderMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "host={}, namespace={}, name={}, version={}, os={}, arch={}",
            self.host, self.namespace, self.name, self.version, self.os, self.arch
        )
    }
}

/// Registry source address of a provider, without version or platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderAddress {
    pub host: String,
    pub namespace: String,
    pub name: String,
}

impl ProviderAddress {
    pub fn new(
        host: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parse `[host/]namespace/name` or a bare `name`.
    ///
    /// A missing host becomes `default_host`; a bare name lives in the
    /// `hashicorp` namespace.
    pub fn parse_with_host(value: &str, default_host: &str) -> Result<Self> {
        let parts: Vec<&str> = value.trim().split('/').collect();
        if parts.iter().any(|part| part.is_empty()) {
            return Err(ProviderError::invalid_address(
                value,
                "address contains an empty segment",
            ));
        }
        match parts.as_slice() {
            [name] => Ok(Self::new(default_host, DEFAULT_NAMESPACE, *name)),
            [namespace, name] => Ok(Self::new(default_host, *namespace, *name)),
            [host, namespace, name] => Ok(Self::new(*host, *namespace, *name)),
            _ => Err(ProviderError::invalid_address(
                value,
                "expected [host/]namespace/name",
            )),
        }
    }

    /// Hostname to contact, falling back to the public registry when empty.
    pub fn registry_host(&self) -> &str {
        if self.host.is_empty() {
            DEFAULT_REGISTRY_HOST
        } else {
            &self.host
        }
    }
}

impl FromStr for ProviderAddress {
    type Err = ProviderError;

    fn from_str(value: &str) -> Result<Self> {
        Self::parse_with_host(value, DEFAULT_REGISTRY_HOST)
    }
}

impl fmt::Display for ProviderAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.is_empty() {
            write!(f, "{}/{}", self.namespace, self.name)
        } else {
            write!(f, "{}/{}/{}", self.host, self.namespace, self.name)
        }
    }
}
