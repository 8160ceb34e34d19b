use anyhow::Result;

use crate::cli::ProviderArgs;

pub fn run(args: ProviderArgs) -> Result<()> {
    let (registry, query) = super::prepare(&args)?;
    let found = registry.search(&query)?;
    println!("{found}");
    Ok(())
}
