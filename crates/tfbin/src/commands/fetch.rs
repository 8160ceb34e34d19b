use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tfbin_core::ProviderMeta;
use tracing::info;

use crate::cli::FetchArgs;

const DEFAULT_PLUGIN_DIR: &str = "tf-plugin";

pub fn run(args: FetchArgs) -> Result<()> {
    let (registry, query) = super::prepare(&args.provider)?;
    let meta = registry.search(&query)?;
    let mut artifact = registry.provider_meta_reader(&meta)?;

    let output = match args.output {
        Some(dir) => dir,
        None => std::env::current_dir()
            .context("failed to read the working directory")?
            .join(DEFAULT_PLUGIN_DIR),
    };
    let dir = plugin_dir(&output, &meta);
    let filename = artifact.filename().to_string();
    let installed = install(&dir, &filename, &mut artifact)?;
    info!(provider = %meta, path = %installed.display(), "installed provider");
    println!("{}", dir.display());
    Ok(())
}

/// `<output>/<host>/<namespace>/<name>/<version>/<os>_<arch>`
fn plugin_dir(output: &Path, meta: &ProviderMeta) -> PathBuf {
    output
        .join(meta.address().registry_host())
        .join(&meta.namespace)
        .join(&meta.name)
        .join(&meta.version)
        .join(format!("{}_{}", meta.os, meta.arch))
}

fn install(dir: &Path, filename: &str, body: &mut impl Read) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(filename);
    let mut file =
        File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
    io::copy(body, &mut file).with_context(|| format!("failed to write {}", path.display()))?;
    make_executable(&path)?;
    Ok(path)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .with_context(|| format!("failed to mark {} executable", path.display()))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn plugin_dir_follows_the_plugin_cache_layout() {
        let meta = ProviderMeta::new(
            "registry.terraform.io",
            "hashicorp",
            "null",
            "3.2.1",
            "linux",
            "amd64",
        );
        assert_eq!(
            plugin_dir(Path::new("/work/tf-plugin"), &meta),
            PathBuf::from("/work/tf-plugin/registry.terraform.io/hashicorp/null/3.2.1/linux_amd64")
        );

        let hostless = ProviderMeta {
            host: String::new(),
            ..meta
        };
        assert!(plugin_dir(Path::new("out"), &hostless).starts_with("out/registry.terraform.io"));
    }

    #[test]
    fn install_writes_the_binary() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("a/b");
        let mut body = Cursor::new(b"bin".to_vec());
        let path = install(&dir, "terraform-provider-null", &mut body).unwrap();
        assert_eq!(path, dir.join("terraform-provider-null"));
        assert_eq!(fs::read(&path).unwrap(), b"bin");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }
}
