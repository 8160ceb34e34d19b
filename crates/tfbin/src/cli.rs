//! CLI argument parsing with clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tfbin_core::{CacheLocation, FetchConfig};

/// tfbin - fetch provider plugin binaries through a local cache
#[derive(Parser, Debug)]
#[command(name = "tfbin")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a provider and install its binary into a plugin directory
    Fetch(FetchArgs),

    /// Resolve a provider and print its exact coordinates
    Search(ProviderArgs),

    /// Inspect the provider cache
    #[command(subcommand)]
    Cache(CacheCommands),
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// List every provider stored in the cache
    List(CacheListArgs),
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    #[command(flatten)]
    pub provider: ProviderArgs,

    /// Plugin directory to install into [default: ./tf-plugin]
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ProviderArgs {
    /// Provider source address: [host/]namespace/name, or a bare name
    #[arg(short, long, value_name = "ADDRESS")]
    pub provider: String,

    /// Exact version or semver requirement such as "~> 3.2" or ">=3.1, <4"
    #[arg(long = "version", value_name = "VERSION")]
    pub version: String,

    /// Target operating system [default: the running platform]
    #[arg(long)]
    pub os: Option<String>,

    /// Target architecture [default: the running platform]
    #[arg(long)]
    pub arch: Option<String>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Overrides layered on top of the TFBIN_* environment.
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Provider cache directory [default: ./.tf-cache]
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Bypass the provider cache entirely
    #[arg(long, conflicts_with = "cache_dir")]
    pub no_cache: bool,

    /// Registry host used when the address does not name one
    #[arg(long, value_name = "HOST")]
    pub registry_host: Option<String>,
}

#[derive(Args, Debug)]
pub struct CacheListArgs {
    /// Provider cache directory [default: ./.tf-cache]
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn apply(&self, mut config: FetchConfig) -> FetchConfig {
        if self.no_cache {
            config.cache = CacheLocation::Disabled;
        } else if let Some(dir) = &self.cache_dir {
            config.cache = CacheLocation::Dir(dir.clone());
        }
        if let Some(host) = &self.registry_host {
            config.registry_host = host.clone();
        }
        config
    }
}
