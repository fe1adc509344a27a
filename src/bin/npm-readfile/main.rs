//! npm-readfile CLI - read single files out of published npm packages

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use npm_readfile::GlobalContext;

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging on stderr; stdout carries file contents
    let filter = if cli.verbose {
        EnvFilter::new("npm_readfile=debug")
    } else {
        EnvFilter::new("npm_readfile=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let mut ctx = GlobalContext::new()?;
    if let Some(dir) = cli.cache_dir {
        ctx.set_cache_dir(dir);
    }
    if let Some(url) = cli.registry {
        ctx.set_registry(url);
    }

    // Execute command
    match cli.command {
        Commands::Cat(args) => commands::cat::execute(args, &ctx),
        Commands::Path(args) => commands::path::execute(args, &ctx),
        Commands::Stream(args) => commands::stream::execute(args, &ctx),
        Commands::Cache(args) => commands::cache::execute(args, &ctx),
    }
}
