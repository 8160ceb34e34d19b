pub mod cache;
pub mod fetch;
pub mod search;

use anyhow::{Context, Result, bail};
use semver::{Version, VersionReq};
use tfbin_core::{FetchConfig, ProviderAddress, ProviderMeta, ProviderVersion, Registry};
use tracing::{debug, info};

use crate::cli::ProviderArgs;
use crate::platform;

/// Environment configuration with the command-line overrides applied.
fn load_config(args: &ProviderArgs) -> Result<FetchConfig> {
    let config = FetchConfig::from_env().context("invalid TFBIN_* environment")?;
    Ok(args.config.apply(config))
}

/// Registry plus the exact query described by `args`.
fn prepare(args: &ProviderArgs) -> Result<(Registry, ProviderMeta)> {
    let config = load_config(args)?;
    let address = ProviderAddress::parse_with_host(&args.provider, &config.registry_host)?;
    let registry = config.build_registry()?;
    let os = args.os.as_deref().unwrap_or(platform::current_os());
    let arch = args.arch.as_deref().unwrap_or(platform::current_arch());

    let version = match Version::parse(args.version.trim()) {
        Ok(exact) => exact.to_string(),
        Err(_) => {
            let req = parse_requirement(&args.version)?;
            let published = registry
                .versions(&address)
                .with_context(|| format!("failed to list versions of {address}"))?;
            let Some(version) = select_version(&req, &published, os, arch) else {
                bail!("no published version of {address} matches {req} for {os}/{arch}");
            };
            info!(provider = %address, %req, %version, "resolved version requirement");
            version
        }
    };

    let query = ProviderMeta::for_address(&address, version, os, arch);
    debug!(%query, "built provider query");
    Ok((registry, query))
}

/// Parse a version constraint, accepting the pessimistic `~> X.Y[.Z]`
/// operator alongside the comparators `semver` understands.
fn parse_requirement(raw: &str) -> Result<VersionReq> {
    let mut comparators = Vec::new();
    for part in raw.split(',').map(str::trim) {
        match part.strip_prefix("~>") {
            Some(base) => comparators.extend(pessimistic_bounds(base.trim())?),
            None => comparators.push(part.replace(char::is_whitespace, "")),
        }
    }
    let normalized = comparators.join(", ");
    VersionReq::parse(&normalized)
        .with_context(|| format!("`{raw}` is neither a version nor a requirement"))
}

/// `~> 3.2` allows `>=3.2.0, <4.0.0`; `~> 3.2.1` allows `>=3.2.1, <3.3.0`.
fn pessimistic_bounds(base: &str) -> Result<[String; 2]> {
    let parts = base
        .split('.')
        .map(|part| part.parse::<u64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("invalid version `{base}` after `~>`"))?;
    Ok(match parts.as_slice() {
        [major] => [format!(">={major}.0.0"), format!("<{}.0.0", major + 1)],
        [major, minor] => [
            format!(">={major}.{minor}.0"),
            format!("<{}.0.0", major + 1),
        ],
        [major, minor, patch] => [
            format!(">={major}.{minor}.{patch}"),
            format!("<{major}.{}.0", minor + 1),
        ],
        _ => bail!("invalid version `{base}` after `~>`"),
    })
}

/// Highest published version matching `req` that ships a build for `os`/`arch`.
///
/// Unparseable version strings are skipped; pre-releases only match when the
/// requirement names one.
fn select_version(
    req: &VersionReq,
    published: &[ProviderVersion],
    os: &str,
    arch: &str,
) -> Option<String> {
    published
        .iter()
        .filter(|listing| listing.supports(os, arch))
        .filter_map(|listing| {
            let parsed = Version::parse(&listing.version).ok()?;
            req.matches(&parsed).then_some((parsed, &listing.version))
        })
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, raw)| raw.clone())
}
