//! Zip archives as published by provider registries: one plugin binary per archive.

use std::io::{self, Cursor, Read, Write};

use zip::ZipArchive;

use crate::cache::check_filename;
use crate::error::{ProviderError, Result};
use crate::meta::ProviderMeta;

/// Downloaded provider archive holding exactly one entry.
pub struct ProviderArchive {
    url: String,
    entry_name: String,
    archive: ZipArchive<Cursor<Vec<u8>>>,
}

impl ProviderArchive {
    /// Open `bytes` fetched from `url`, rejecting archives whose entry count is
    /// not one or whose entry is not a plain file name.
    pub fn from_bytes(meta: &ProviderMeta, url: &str, bytes: Vec<u8>) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|source| {
            ProviderError::Archive {
                url: url.to_string(),
                source,
            }
        })?;
        if archive.len() != 1 {
            return Err(ProviderError::ambiguous(
                meta,
                format!(
                    "archive from {url} has {} entries, expected exactly one",
                    archive.len()
                ),
            ));
        }
        let entry_name = archive
            .by_index(0)
            .map_err(|source| ProviderError::Archive {
                url: url.to_string(),
                source,
            })?
            .name()
            .to_string();
        check_filename(&entry_name)?;
        Ok(Self {
            url: url.to_string(),
            entry_name,
            archive,
        })
    }

    pub fn entry_name(&self) -> &str {
        &self.entry_name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Stream the entry into `writer`, returning the number of bytes copied.
    pub fn copy_entry_to<W: Write>(&mut self, writer: &mut W) -> io::Result<u64> {
        let mut entry = self.archive.by_index(0).map_err(io::Error::other)?;
        io::copy(&mut entry, writer)
    }

    /// Decompress the entry into memory.
    pub fn into_entry_bytes(mut self) -> Result<(String, Vec<u8>)> {
        let url = self.url.clone();
        let mut entry = self
            .archive
            .by_index(0)
            .map_err(|source| ProviderError::Archive {
                url: url.clone(),
                source,
            })?;
        // declared size is untrusted input
        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .map_err(|source| ProviderError::Archive {
                url,
                source: source.into(),
            })?;
        drop(entry);
        Ok((self.entry_name, bytes))
    }
}
