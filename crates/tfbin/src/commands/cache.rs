use anyhow::{Context, Result};
use tfbin_core::{CacheLocation, FetchConfig};

use crate::cli::CacheListArgs;

pub fn list(args: CacheListArgs) -> Result<()> {
    let mut config = FetchConfig::from_env().context("invalid TFBIN_* environment")?;
    if let Some(dir) = args.cache_dir {
        config.cache = CacheLocation::Dir(dir);
    }
    let Some(cache) = config.open_cache()? else {
        anyhow::bail!("the provider cache is disabled");
    };

    let entries = cache.entries()?;
    if entries.is_empty() {
        eprintln!("no providers cached in {}", cache.base().display());
    }
    for entry in entries {
        println!("{}\t{}", entry.meta, entry.path.display());
    }
    Ok(())
}
