//! `npm-readfile stream` command

use std::io;

use anyhow::{Context, Result};

use crate::cli::StreamArgs;
use crate::commands::expand_address;
use npm_readfile::{GlobalContext, Retriever, StreamOptions};

pub fn execute(args: StreamArgs, ctx: &GlobalContext) -> Result<()> {
    let retriever = Retriever::from_context(ctx)?;
    let address = expand_address(&args.address, ctx);

    let mut stream = retriever.create_read_stream(
        &address,
        StreamOptions::default().prefer_cache(args.prefer_cache),
    )?;

    let copied = io::copy(&mut stream, &mut io::stdout().lock())
        .with_context(|| format!("failed to stream {}", args.address))?;

    if stream.served_from_cache() {
        tracing::debug!("Streamed {} bytes from cache, waiting for refresh", copied);
    } else {
        tracing::debug!("Streamed {} bytes", copied);
    }
    stream.wait_for_refresh();

    Ok(())
}
