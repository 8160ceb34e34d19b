use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::client::{ProviderVersion, RegistryClient};
use crate::error::{ProviderError, Result};
use crate::meta::ProviderAddress;

/// Well-known document every registry host publishes its service map under.
pub const SERVICE_DISCOVERY_PATH: &str = ".well-known/terraform.json";

const PROVIDERS_SERVICE: &str = "providers.v1";

/// [`RegistryClient`] speaking the provider registry protocol over HTTP(S).
pub struct HttpRegistryClient {
    scheme: &'static str,
    client: Client,
}

#[derive(Deserialize)]
struct VersionsResponse {
    versions: Vec<ProviderVersion>,
}

#[derive(Deserialize)]
struct DownloadResponse {
    download_url: String,
}

impl HttpRegistryClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(None)
    }

    /// Build a client whose requests give up after `timeout`; `None` keeps the
    /// transport default.
    pub fn with_timeout(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            scheme: "https",
            client: builder
                .build()
                .map_err(|err| ProviderError::http("<client setup>", err))?,
        })
    }

    /// Use plain HTTP, for mirrors served inside a private network.
    pub fn insecure_http(mut self) -> Self {
        self.scheme = "http";
        self
    }

    fn providers_base(&self, host: &str) -> Result<Url> {
        let discovery = parse_url(&format!(
            "{}://{host}/{SERVICE_DISCOVERY_PATH}",
            self.scheme
        ))?;
        let services: HashMap<String, serde_json::Value> = self.get_json(&discovery)?;
        let mut base = services
            .get(PROVIDERS_SERVICE)
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| ProviderError::UnsupportedRegistry {
                host: host.to_string(),
                service: PROVIDERS_SERVICE.to_string(),
            })?
            .to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let resolved = join_url(&discovery, &base)?;
        debug!(host, base = %resolved, "discovered provider registry service");
        Ok(resolved)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        let body = self.fetch(url.as_str())?;
        serde_json::from_slice(&body).map_err(|source| ProviderError::Json {
            url: url.to_string(),
            source,
        })
    }
}

impl RegistryClient for HttpRegistryClient {
    fn provider_versions(&self, address: &ProviderAddress) -> Result<Vec<ProviderVersion>> {
        let base = self.providers_base(address.registry_host())?;
        let url = join_url(
            &base,
            &format!("{}/{}/versions", address.namespace, address.name),
        )?;
        let response: VersionsResponse = self.get_json(&url)?;
        debug!(
            provider = %address,
            versions = response.versions.len(),
            "listed provider versions"
        );
        Ok(response.versions)
    }

    fn download_url(
        &self,
        address: &ProviderAddress,
        version: &str,
        os: &str,
        arch: &str,
    ) -> Result<String> {
        let base = self.providers_base(address.registry_host())?;
        let endpoint = join_url(
            &base,
            &format!(
                "{}/{}/{version}/download/{os}/{arch}",
                address.namespace, address.name
            ),
        )?;
        let response: DownloadResponse = self.get_json(&endpoint)?;
        // download_url may be relative to the endpoint that returned it
        Ok(join_url(&endpoint, &response.download_url)?.to_string())
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| ProviderError::http(url, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response
            .bytes()
            .map_err(|err| ProviderError::http(url, err))?;
        Ok(bytes.to_vec())
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|source| ProviderError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

fn join_url(base: &Url, reference: &str) -> Result<Url> {
    base.join(reference)
        .map_err(|source| ProviderError::InvalidUrl {
            url: reference.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_service_paths_resolve_against_discovery_document() {
        let discovery =
            parse_url("https://registry.example.com/.well-known/terraform.json").unwrap();
        let base = join_url(&discovery, "/v1/providers/").unwrap();
        assert_eq!(base.as_str(), "https://registry.example.com/v1/providers/");
        let versions = join_url(&base, "hashicorp/null/versions").unwrap();
        assert_eq!(
            versions.as_str(),
            "https://registry.example.com/v1/providers/hashicorp/null/versions"
        );
    }

    #[test]
    fn absolute_download_urls_are_kept() {
        let endpoint = parse_url(
            "https://registry.example.com/v1/providers/hashicorp/null/3.2.1/download/linux/amd64",
        )
        .unwrap();
        let url = join_url(
            &endpoint,
            "https://releases.example.com/null_3.2.1_linux_amd64.zip",
        )
        .unwrap();
        assert_eq!(url.as_str(), "https://releases.example.com/null_3.2.1_linux_amd64.zip");
    }

    #[test]
    fn versions_document_tolerates_missing_protocols() {
        let body = br#"{
            "id": "hashicorp/null",
            "versions": [
                {"version": "3.2.1", "platforms": [{"os": "linux", "arch": "amd64"}]}
            ]
        }"#;
        let parsed: VersionsResponse = serde_json::from_slice(body).unwrap();
        assert_eq!(parsed.versions.len(), 1);
        assert!(parsed.versions[0].supports("linux", "amd64"));
        assert!(parsed.versions[0].protocols.is_empty());
    }
}
