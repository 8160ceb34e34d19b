#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tfbin_core::{
    Platform, ProviderAddress, ProviderError, ProviderMeta, ProviderVersion, RegistryClient,
    Result,
};
use zip::write::FileOptions;

pub fn zip_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in entries {
        writer
            .start_file(*name, FileOptions::default())
            .expect("start zip entry");
        writer.write_all(body).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

pub fn null_provider() -> ProviderMeta {
    ProviderMeta::new(
        "registry.example.com",
        "hashicorp",
        "null",
        "3.2.1",
        "linux",
        "amd64",
    )
}

pub fn null_listing() -> Vec<ProviderVersion> {
    vec![
        ProviderVersion::new(
            "3.1.0",
            vec![Platform::new("linux", "amd64"), Platform::new("darwin", "arm64")],
        ),
        ProviderVersion::new(
            "3.2.1",
            vec![
                Platform::new("linux", "amd64"),
                Platform::new("linux", "arm64"),
                Platform::new("windows", "amd64"),
            ],
        ),
    ]
}

/// In-memory registry that records every call it receives.
pub struct FakeRegistry {
    versions: Vec<ProviderVersion>,
    archive: Vec<u8>,
    calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl FakeRegistry {
    pub fn new(versions: Vec<ProviderVersion>, archive: Vec<u8>) -> Self {
        Self {
            versions,
            archive,
            calls: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().expect("requested lock").clone()
    }

    fn record(&self, what: String) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().expect("requested lock").push(what);
    }
}

impl RegistryClient for FakeRegistry {
    fn provider_versions(&self, address: &ProviderAddress) -> Result<Vec<ProviderVersion>> {
        self.record(format!("versions {address}"));
        Ok(self.versions.clone())
    }

    fn download_url(
        &self,
        address: &ProviderAddress,
        version: &str,
        os: &str,
        arch: &str,
    ) -> Result<String> {
        self.record(format!("download {address} {version} {os} {arch}"));
        Ok(format!(
            "https://releases.example.com/{}_{version}_{os}_{arch}.zip",
            address.name
        ))
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.record(format!("fetch {url}"));
        if self.archive.is_empty() {
            return Err(ProviderError::Status {
                url: url.to_string(),
                status: 404,
            });
        }
        Ok(self.archive.clone())
    }
}
