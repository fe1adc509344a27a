//! `npm-readfile cat` command

use std::io::Write;

use anyhow::{Context, Result};

use crate::cli::CatArgs;
use crate::commands::expand_address;
use npm_readfile::{GlobalContext, Retriever};

pub fn execute(args: CatArgs, ctx: &GlobalContext) -> Result<()> {
    let retriever = Retriever::from_context(ctx)?;
    let address = expand_address(&args.address, ctx);

    let bytes = retriever.read_file(&address)?;

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(&bytes)
        .and_then(|_| stdout.flush())
        .context("failed to write to stdout")?;

    Ok(())
}
