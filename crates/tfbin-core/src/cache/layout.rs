//! Path codec between provider identities and cache leaf directories.
//!
//! A leaf is `<host>/<namespace>/<name>/<version>/<os>/<arch>`. An empty host
//! is written as the reserved [`HOST_OMITTED`] segment so every leaf has the
//! same depth. Older caches stored host-less entries one level shallower; those
//! still decode, with an empty host.

use std::path::{Component, Path, PathBuf};

use crate::error::{ProviderError, Result};
use crate::meta::ProviderMeta;

/// Directory name standing in for an empty host.
pub const HOST_OMITTED: &str = "_";

const LEAF_DEPTH: usize = 6;

/// Relative leaf directory for `meta`.
pub(crate) fn encode(meta: &ProviderMeta) -> Result<PathBuf> {
    let host = if meta.host.is_empty() {
        HOST_OMITTED
    } else if meta.host == HOST_OMITTED {
        return Err(ProviderError::invalid_meta(
            meta,
            format!("host `{HOST_OMITTED}` is reserved for host-less entries"),
        ));
    } else {
        check_segment(meta, "host", &meta.host)?;
        meta.host.as_str()
    };

    let mut rel = PathBuf::from(host);
    for (field, value) in identity_fields(meta) {
        check_segment(meta, field, value)?;
        rel.push(value);
    }
    Ok(rel)
}

/// Relative leaf directory a host-less `meta` had in the legacy layout.
pub(crate) fn encode_legacy(meta: &ProviderMeta) -> Option<PathBuf> {
    if !meta.host.is_empty() {
        return None;
    }
    let mut rel = PathBuf::new();
    for (field, value) in identity_fields(meta) {
        check_segment(meta, field, value).ok()?;
        rel.push(value);
    }
    Some(rel)
}

/// Reconstruct the provider stored under the relative leaf directory `rel_dir`.
pub(crate) fn decode(rel_dir: &Path) -> Result<ProviderMeta> {
    let mut segments = Vec::with_capacity(LEAF_DEPTH);
    for component in rel_dir.components() {
        match component {
            Component::Normal(part) => {
                let segment = part.to_str().ok_or_else(|| {
                    ProviderError::malformed(rel_dir, "segment is not valid UTF-8")
                })?;
                segments.push(segment);
            }
            other => {
                return Err(ProviderError::malformed(
                    rel_dir,
                    format!("unexpected path component {other:?}"),
                ));
            }
        }
    }

    match segments.as_slice() {
        [host, namespace, name, version, os, arch] => {
            let host = if *host == HOST_OMITTED { "" } else { *host };
            Ok(ProviderMeta::new(host, *namespace, *name, *version, *os, *arch))
        }
        [namespace, name, version, os, arch] => {
            Ok(ProviderMeta::new("", *namespace, *name, *version, *os, *arch))
        }
        other => Err(ProviderError::malformed(
            rel_dir,
            format!(
                "expected {LEAF_DEPTH} directory levels ({} without a host), found {}",
                LEAF_DEPTH - 1,
                other.len()
            ),
        )),
    }
}

fn identity_fields(meta: &ProviderMeta) -> [(&'static str, &str); 5] {
    [
        ("namespace", meta.namespace.as_str()),
        ("name", meta.name.as_str()),
        ("version", meta.version.as_str()),
        ("os", meta.os.as_str()),
        ("arch", meta.arch.as_str()),
    ]
}

fn check_segment(meta: &ProviderMeta, field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ProviderError::invalid_meta(meta, format!("{field} is empty")));
    }
    if value == "." || value == ".." || value.contains(['/', '\\']) {
        return Err(ProviderError::invalid_meta(
            meta,
            format!("{field} `{value}` is not a single directory name"),
        ));
    }
    if value == HOST_OMITTED {
        return Err(ProviderError::invalid_meta(
            meta,
            format!("{field} `{HOST_OMITTED}` is reserved for host-less entries"),
        ));
    }
    Ok(())
}

/// Artifact names must be a single normal path component.
pub(crate) fn check_filename(filename: &str) -> Result<()> {
    let mut components = Path::new(filename).components();
    let plain = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if plain && !filename.contains(['/', '\\']) {
        Ok(())
    } else {
        Err(ProviderError::InvalidFilename {
            filename: filename.to_string(),
        })
    }
}
