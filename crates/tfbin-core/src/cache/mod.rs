//! Filesystem-backed provider cache keyed by a directory encoding of [`ProviderMeta`].

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::error::{ProviderError, Result};
use crate::meta::ProviderMeta;

mod layout;

pub use layout::HOST_OMITTED;
pub(crate) use layout::check_filename;

/// Directory name used by [`ProviderCache::default_location`].
pub const DEFAULT_CACHE_DIR_NAME: &str = ".tf-cache";

/// Provider artifacts stored as
/// `base/<host>/<namespace>/<name>/<version>/<os>/<arch>/<filename>`.
///
/// Each leaf directory holds exactly one file. The cache assumes a single
/// writer process per base directory and takes no locks.
#[derive(Debug, Clone)]
pub struct ProviderCache {
    base: PathBuf,
}

/// One decodable artifact found while walking the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub meta: ProviderMeta,
    pub path: PathBuf,
}

impl ProviderCache {
    /// Open the cache rooted at `base`, creating the directory if needed.
    pub fn new(base: impl Into<PathBuf>) -> Result<Self> {
        let base = base.into();
        let base = std::path::absolute(&base).map_err(|err| ProviderError::io(&base, err))?;
        match fs::metadata(&base) {
            Ok(info) if info.is_dir() => {}
            Ok(_) => {
                return Err(ProviderError::io(
                    &base,
                    io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        "cache base exists and is not a directory",
                    ),
                ));
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                fs::create_dir_all(&base).map_err(|err| ProviderError::io(&base, err))?;
                debug!(base = %base.display(), "created provider cache directory");
            }
            Err(err) => return Err(ProviderError::io(&base, err)),
        }
        Ok(Self { base })
    }

    /// `$CWD/.tf-cache`
    pub fn default_location() -> Result<PathBuf> {
        let cwd = std::env::current_dir().map_err(|err| ProviderError::io(Path::new("."), err))?;
        Ok(cwd.join(DEFAULT_CACHE_DIR_NAME))
    }

    pub fn open_default() -> Result<Self> {
        Self::new(Self::default_location()?)
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Leaf directory that holds the artifact for `meta`.
    pub fn leaf_dir(&self, meta: &ProviderMeta) -> Result<PathBuf> {
        Ok(self.base.join(layout::encode(meta)?))
    }

    /// Create (or truncate) `filename` in the leaf directory for `meta`.
    pub fn writer(&self, meta: &ProviderMeta, filename: &str) -> Result<CacheWriter> {
        check_filename(filename)?;
        let dir = self.leaf_dir(meta)?;
        fs::create_dir_all(&dir).map_err(|err| ProviderError::io(&dir, err))?;
        let path = dir.join(filename);
        let file = File::create(&path).map_err(|err| ProviderError::io(&path, err))?;
        debug!(%meta, path = %path.display(), "writing provider artifact to cache");
        Ok(CacheWriter {
            path,
            inner: BufWriter::new(file),
        })
    }

    /// Open the single artifact stored for `meta`.
    pub fn reader(&self, meta: &ProviderMeta) -> Result<CachedArtifact> {
        let dir = self.existing_leaf_dir(meta)?;
        let listing = match fs::read_dir(&dir) {
            Ok(listing) => listing,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ProviderError::NotCached {
                    meta: meta.clone(),
                    dir,
                });
            }
            Err(err) => return Err(ProviderError::io(&dir, err)),
        };

        let mut names = Vec::new();
        for entry in listing {
            let entry = entry.map_err(|err| ProviderError::io(&dir, err))?;
            names.push(entry.file_name());
        }
        names.sort();

        let name = match names.as_slice() {
            [] => {
                return Err(ProviderError::NotCached {
                    meta: meta.clone(),
                    dir,
                });
            }
            [name] => name,
            many => {
                return Err(ProviderError::ambiguous(
                    meta,
                    format!(
                        "{} files in cache directory {}",
                        many.len(),
                        dir.display()
                    ),
                ));
            }
        };

        let path = dir.join(name);
        let file = File::open(&path).map_err(|err| ProviderError::io(&path, err))?;
        trace!(%meta, path = %path.display(), "cache hit for provider artifact");
        Ok(CachedArtifact {
            filename: name.to_string_lossy().into_owned(),
            path,
            file,
        })
    }

    /// Walk the cache and decode every stored artifact, in file-name order.
    ///
    /// Files whose location does not decode into a provider are logged and
    /// skipped; a directory that cannot be read aborts the walk.
    pub fn entries(&self) -> Result<Vec<CacheEntry>> {
        let mut found = Vec::new();
        for entry in WalkDir::new(&self.base).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|err| {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.base.clone());
                ProviderError::Io {
                    path,
                    source: err.into(),
                }
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let rel_dir = entry
                .path()
                .parent()
                .and_then(|parent| parent.strip_prefix(&self.base).ok());
            let Some(rel_dir) = rel_dir else {
                continue;
            };
            match layout::decode(rel_dir) {
                Ok(meta) => {
                    trace!(%meta, "found cached provider");
                    found.push(CacheEntry {
                        meta,
                        path: entry.into_path(),
                    });
                }
                Err(err) => {
                    warn!(
                        path = %entry.path().display(),
                        error = %err,
                        "skipping unrecognised cache entry"
                    );
                }
            }
        }
        Ok(found)
    }

    /// Find the cached provider exactly matching `query`.
    pub fn search(&self, query: &ProviderMeta) -> Result<ProviderMeta> {
        let candidates = self.entries()?.into_iter().map(|entry| entry.meta);
        query.find_match(candidates)
    }

    fn existing_leaf_dir(&self, meta: &ProviderMeta) -> Result<PathBuf> {
        let dir = self.leaf_dir(meta)?;
        if dir.is_dir() {
            return Ok(dir);
        }
        match layout::encode_legacy(meta).map(|rel| self.base.join(rel)) {
            Some(legacy) if legacy.is_dir() => Ok(legacy),
            _ => Ok(dir),
        }
    }
}

/// Write handle for a new cache artifact. Call [`CacheWriter::finish`] to
/// flush and close it.
#[derive(Debug)]
pub struct CacheWriter {
    path: PathBuf,
    inner: BufWriter<File>,
}

impl CacheWriter {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn finish(self) -> Result<PathBuf> {
        let Self { path, inner } = self;
        let file = inner
            .into_inner()
            .map_err(|err| ProviderError::io(&path, err.into_error()))?;
        file.sync_all().map_err(|err| ProviderError::io(&path, err))?;
        Ok(path)
    }
}

impl Write for CacheWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Open cached artifact together with its original file name.
#[derive(Debug)]
pub struct CachedArtifact {
    filename: String,
    path: PathBuf,
    file: File,
}

impl CachedArtifact {
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_parts(self) -> (String, PathBuf, File) {
        (self.filename, self.path, self.file)
    }
}

impl Read for CachedArtifact {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> ProviderMeta {
        ProviderMeta::new(
            "registry.example.com",
            "hashicorp",
            "null",
            "3.2.1",
            "linux",
            "amd64",
        )
    }

    fn store(cache: &ProviderCache, meta: &ProviderMeta, filename: &str, body: &[u8]) -> PathBuf {
        let mut writer = cache.writer(meta, filename).unwrap();
        writer.write_all(body).unwrap();
        writer.finish().unwrap()
    }

    fn read_all(mut artifact: CachedArtifact) -> Vec<u8> {
        let mut buf = Vec::new();
        artifact.read_to_end(&mut buf).unwrap();
        buf
    }

    #[test]
    fn new_creates_missing_base() -> Result<()> {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("nested").join(DEFAULT_CACHE_DIR_NAME);
        let cache = ProviderCache::new(&base)?;
        assert!(base.is_dir());
        assert_eq!(cache.base(), base.as_path());
        // opening an existing directory is fine too
        ProviderCache::new(&base)?;
        Ok(())
    }

    #[test]
    fn new_rejects_a_file_as_base() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("not-a-dir");
        fs::write(&file, b"x").unwrap();
        let err = ProviderCache::new(&file).unwrap_err();
        assert!(matches!(err, ProviderError::Io { .. }));
    }

    #[test]
    fn write_then_read_round_trips() -> Result<()> {
        let temp = TempDir::new().unwrap();
        let cache = ProviderCache::new(temp.path())?;
        let meta = sample();
        let stored = store(&cache, &meta, "terraform-provider-null_v3.2.1_x5", b"\x7fELF binary");

        assert_eq!(
            stored,
            temp.path()
                .join("registry.example.com/hashicorp/null/3.2.1/linux/amd64")
                .join("terraform-provider-null_v3.2.1_x5")
        );

        let artifact = cache.reader(&meta)?;
        assert_eq!(artifact.filename(), "terraform-provider-null_v3.2.1_x5");
        assert_eq!(artifact.path(), stored.as_path());
        assert_eq!(read_all(artifact), b"\x7fELF binary");
        Ok(())
    }

    #[test]
    fn writer_overwrites_existing_file() -> Result<()> {
        let temp = TempDir::new().unwrap();
        let cache = ProviderCache::new(temp.path())?;
        let meta = sample();
        store(&cache, &meta, "plugin", b"first version");
        store(&cache, &meta, "plugin", b"second");
        assert_eq!(read_all(cache.reader(&meta)?), b"second");
        Ok(())
    }

    #[test]
    fn writer_rejects_nested_filenames() {
        let temp = TempDir::new().unwrap();
        let cache = ProviderCache::new(temp.path()).unwrap();
        for name in ["", "..", "bin/plugin", "../escape", "/abs"] {
            let err = cache.writer(&sample(), name).unwrap_err();
            assert!(
                matches!(err, ProviderError::InvalidFilename { .. }),
                "{name:?} was accepted"
            );
        }
    }

    #[test]
    fn reader_reports_missing_and_empty_leaves_as_not_cached() -> Result<()> {
        let temp = TempDir::new().unwrap();
        let cache = ProviderCache::new(temp.path())?;
        let meta = sample();
        assert!(cache.reader(&meta).unwrap_err().is_not_cached());

        fs::create_dir_all(cache.leaf_dir(&meta)?).unwrap();
        assert!(cache.reader(&meta).unwrap_err().is_not_cached());
        Ok(())
    }

    #[test]
    fn reader_refuses_to_pick_between_two_files() -> Result<()> {
        let temp = TempDir::new().unwrap();
        let cache = ProviderCache::new(temp.path())?;
        let meta = sample();
        store(&cache, &meta, "plugin-a", b"a");
        store(&cache, &meta, "plugin-b", b"b");
        let err = cache.reader(&meta).unwrap_err();
        assert!(matches!(err, ProviderError::AmbiguousArtifact { .. }));
        Ok(())
    }

    #[test]
    fn search_finds_written_provider_and_only_that_one() -> Result<()> {
        let temp = TempDir::new().unwrap();
        let cache = ProviderCache::new(temp.path())?;
        let meta = sample();
        store(&cache, &meta, "plugin", b"bin");

        assert_eq!(cache.search(&meta)?, meta);

        let near_misses = [
            ProviderMeta {
                host: "registry.terraform.io".into(),
                ..meta.clone()
            },
            ProviderMeta {
                namespace: "acme".into(),
                ..meta.clone()
            },
            ProviderMeta {
                name: "random".into(),
                ..meta.clone()
            },
            ProviderMeta {
                version: "3.2.2".into(),
                ..meta.clone()
            },
            ProviderMeta {
                os: "darwin".into(),
                ..meta.clone()
            },
            ProviderMeta {
                arch: "arm64".into(),
                ..meta.clone()
            },
        ];
        for query in &near_misses {
            assert!(cache.search(query).unwrap_err().is_no_match(), "{query}");
        }
        Ok(())
    }

    #[test]
    fn search_of_empty_cache_is_no_match() -> Result<()> {
        let temp = TempDir::new().unwrap();
        let cache = ProviderCache::new(temp.path())?;
        assert!(cache.search(&sample()).unwrap_err().is_no_match());
        Ok(())
    }

    #[test]
    fn legacy_layout_is_found_with_empty_host() -> Result<()> {
        let temp = TempDir::new().unwrap();
        let cache = ProviderCache::new(temp.path())?;
        let leaf = temp.path().join("hashicorp/null/3.2.1/linux/amd64");
        fs::create_dir_all(&leaf).unwrap();
        fs::write(leaf.join("terraform-provider-null"), b"legacy").unwrap();

        let query = ProviderMeta {
            host: String::new(),
            ..sample()
        };
        assert_eq!(cache.search(&query)?, query);

        let artifact = cache.reader(&query)?;
        assert_eq!(artifact.filename(), "terraform-provider-null");
        assert_eq!(read_all(artifact), b"legacy");
        Ok(())
    }

    #[test]
    fn hostless_writes_use_the_marker_directory() -> Result<()> {
        let temp = TempDir::new().unwrap();
        let cache = ProviderCache::new(temp.path())?;
        let meta = ProviderMeta {
            host: String::new(),
            ..sample()
        };
        let stored = store(&cache, &meta, "plugin", b"bin");
        assert!(stored.starts_with(temp.path().join(HOST_OMITTED)));
        assert_eq!(cache.search(&meta)?, meta);
        Ok(())
    }

    #[test]
    fn malformed_entries_are_skipped() -> Result<()> {
        let temp = TempDir::new().unwrap();
        let cache = ProviderCache::new(temp.path())?;
        fs::write(temp.path().join("stray-file"), b"?").unwrap();
        let shallow = temp.path().join("a/b/c");
        fs::create_dir_all(&shallow).unwrap();
        fs::write(shallow.join("file"), b"?").unwrap();
        store(&cache, &sample(), "plugin", b"bin");

        let entries = cache.entries()?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].meta, sample());
        assert_eq!(cache.search(&sample())?, sample());
        Ok(())
    }

    #[test]
    fn unreadable_cache_is_an_error_not_a_miss() -> Result<()> {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("cache");
        let cache = ProviderCache::new(&base)?;
        fs::remove_dir_all(&base).unwrap();
        let err = cache.search(&sample()).unwrap_err();
        assert!(matches!(err, ProviderError::Io { .. }), "got {err:?}");
        Ok(())
    }
}
