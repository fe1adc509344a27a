//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// npm-readfile - read one file out of a published npm package
#[derive(Parser)]
#[command(name = "npm-readfile")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Registry used for addresses without a scheme
    #[arg(long, global = true, env = "NPM_READFILE_REGISTRY")]
    pub registry: Option<String>,

    /// Cache root directory
    #[arg(long, global = true, env = "NPM_READFILE_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print a file from a package
    Cat(CatArgs),

    /// Print the cache path of a file from a package
    Path(PathArgs),

    /// Stream a file from a package to stdout
    Stream(StreamArgs),

    /// Cache management
    Cache(CacheArgs),
}

#[derive(Args)]
pub struct CatArgs {
    /// File address, e.g. `lodash@4.17.21/package.json`
    pub address: String,
}

#[derive(Args)]
pub struct PathArgs {
    /// File address, e.g. `@babel/core@latest/lib/index.js`
    pub address: String,
}

#[derive(Args)]
pub struct StreamArgs {
    /// File address
    pub address: String,

    /// Serve from the cache when a stale package index allows it
    #[arg(long)]
    pub prefer_cache: bool,
}

#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommands,
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Show cache directory path
    Path,

    /// Show cache disk usage
    Size,
}
