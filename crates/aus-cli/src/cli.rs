use std::path::PathBuf;

use aus_types::AccountId;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "aus",
    about = "Mirror a review server's account directory into a versioned repository",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an empty repository
    Init(InitArgs),
    /// Fetch accounts and publish their records
    Sync(SyncArgs),
    /// List references
    Refs(RefsArgs),
    /// Print an object by reference name or hash
    Show(ShowArgs),
}

#[derive(Args)]
pub struct InitArgs {
    pub path: PathBuf,
}

#[derive(Args)]
pub struct SyncArgs {
    #[arg(long)]
    pub repo: PathBuf,
    /// Review server URL (overrides the config file)
    #[arg(long)]
    pub url: Option<String>,
    /// Basic authentication
    #[arg(long, value_name = "USER:PASSWORD", conflicts_with = "cookie")]
    pub basic: Option<String>,
    /// Value of the `o` session cookie
    #[arg(long, value_name = "VALUE")]
    pub cookie: Option<String>,
    /// Config file (defaults to <repo>/aus.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Sustained requests per second
    #[arg(long)]
    pub rate: Option<u32>,
    /// Requests allowed back to back
    #[arg(long)]
    pub burst: Option<u32>,
    /// Remove ledger entries that fetched accounts no longer own
    #[arg(long)]
    pub prune_external_ids: bool,
    /// Do not probe for the accessDatabase capability first
    #[arg(long)]
    pub skip_capability_check: bool,
    #[arg(required = true, value_name = "ACCOUNT_ID")]
    pub ids: Vec<AccountId>,
}

#[derive(Args)]
pub struct RefsArgs {
    #[arg(long)]
    pub repo: PathBuf,
    pub prefix: Option<String>,
}

#[derive(Args)]
pub struct ShowArgs {
    #[arg(long)]
    pub repo: PathBuf,
    /// Reference name or full object hash
    pub revision: String,
}
