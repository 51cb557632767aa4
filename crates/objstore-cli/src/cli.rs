use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "objstore",
    about = "Versioned, tenant-scoped object store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Tenant every operation is scoped to
    #[arg(short, long, global = true, default_value_t = 1)]
    pub tenant: i64,

    /// Actor recorded on writes
    #[arg(short, long, global = true, default_value = "admin")]
    pub user: String,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// List registered kinds
    Kinds,
    /// Store a new version of an object
    Write(WriteArgs),
    /// Read an object
    Read(ReadArgs),
    /// List an object's versions, newest first
    History(HistoryArgs),
    /// Delete an object and its history
    Delete(DeleteArgs),
    /// List objects
    Search(SearchArgs),
    /// List references that did not resolve
    Dangling,
}

/// Names one object within the tenant.
#[derive(Args)]
pub struct Target {
    /// Kind id (see `objstore kinds`)
    pub kind: String,
    pub uid: String,
}

#[derive(Args)]
pub struct WriteArgs {
    #[command(flatten)]
    pub target: Target,
    /// File holding the body; `-` reads stdin
    #[arg(short, long, default_value = "-")]
    pub file: PathBuf,
    #[arg(long)]
    pub folder: Option<String>,
    #[arg(short, long, default_value = "")]
    pub message: String,
    /// Fail unless this is the current version
    #[arg(long)]
    pub previous_version: Option<String>,
    /// Explicit version to assign
    #[arg(long = "set-version")]
    pub version: Option<String>,
    /// Drop prior history and start over at version 1
    #[arg(long)]
    pub clear_history: bool,
}

#[derive(Args)]
pub struct ReadArgs {
    #[command(flatten)]
    pub target: Target,
    /// Read a historical version
    #[arg(long = "at")]
    pub version: Option<String>,
    #[arg(long)]
    pub body: bool,
    #[arg(long)]
    pub summary: bool,
}

#[derive(Args)]
pub struct HistoryArgs {
    #[command(flatten)]
    pub target: Target,
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub target: Target,
    #[arg(long)]
    pub previous_version: Option<String>,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Restrict to a kind; repeatable
    #[arg(short, long = "kind")]
    pub kinds: Vec<String>,
    #[arg(long)]
    pub folder: Option<String>,
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
    /// Token from a previous page
    #[arg(long)]
    pub page_token: Option<String>,
    #[arg(long)]
    pub labels: bool,
    #[arg(long)]
    pub fields: bool,
}
