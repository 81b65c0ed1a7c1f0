use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use feedcache_core::{DecodePolicy, StoreConfig, StoreLocation};

#[derive(Parser, Debug)]
#[command(
    name = "feedcache",
    version,
    about = "Inspect and manage the cached feed snapshot"
)]
pub struct Cli {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the cached feed as JSON
    Show,
    /// Replace the cached feed with a JSON document
    Put(PutArgs),
    /// Remove the cached feed
    Clear,
    /// Print the feedcache version
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Store file (`:memory:` for a throwaway in-memory store)
    #[arg(long, env = "FEEDCACHE_PATH", global = true, default_value = "feedcache.db")]
    pub db: String,

    /// Open the store read-only; put and clear will fail
    #[arg(long, global = true)]
    pub read_only: bool,

    /// Serve the remaining images when some cached images are unreadable
    #[arg(long, global = true)]
    pub skip_malformed: bool,
}

impl StoreArgs {
    pub fn to_config(&self) -> StoreConfig {
        let policy = if self.skip_malformed {
            DecodePolicy::SkipMalformed
        } else {
            DecodePolicy::Strict
        };
        StoreConfig::new(StoreLocation::parse(&self.db))
            .with_read_only(self.read_only)
            .with_decode_policy(policy)
    }
}

#[derive(Args, Debug)]
pub struct PutArgs {
    /// Feed document (`-` reads stdin)
    #[arg(value_name = "FILE")]
    pub input: PathBuf,
}
