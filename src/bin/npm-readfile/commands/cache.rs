//! `npm-readfile cache` command
//!
//! Inspect the cache (package index documents, extracted packages).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::{CacheArgs, CacheCommands};
use npm_readfile::GlobalContext;

pub fn execute(args: CacheArgs, ctx: &GlobalContext) -> Result<()> {
    match args.command {
        CacheCommands::Path => show_path(ctx),
        CacheCommands::Size => show_size(ctx),
    }
}

/// Show cache directory path.
fn show_path(ctx: &GlobalContext) -> Result<()> {
    println!("{}", ctx.cache_dir().display());
    Ok(())
}

/// Show cache disk usage.
fn show_size(ctx: &GlobalContext) -> Result<()> {
    let cache_dir = ctx.cache_dir();

    let index_size = dir_size(&cache_dir.join("index"))?;
    let files_size = dir_size(&cache_dir.join("files"))?;

    println!("Cache disk usage:");
    println!();
    println!("  Package indexes:   {}", format_size(index_size));
    println!("  Package files:     {}", format_size(files_size));
    println!();
    println!("  Total:             {}", format_size(index_size + files_size));

    Ok(())
}

/// Calculate the total size of a directory recursively.
fn dir_size(path: &Path) -> Result<u64> {
    if path.is_file() {
        return Ok(fs::metadata(path).map(|m| m.len()).unwrap_or(0));
    }

    if !path.is_dir() {
        return Ok(0);
    }

    let mut size: u64 = 0;
    for entry in
        fs::read_dir(path).with_context(|| format!("failed to read: {}", path.display()))?
    {
        size += dir_size(&entry?.path())?;
    }

    Ok(size)
}

/// Format a size in bytes to a human-readable string.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
