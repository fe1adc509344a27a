//! `npm-readfile path` command

use anyhow::Result;

use crate::cli::PathArgs;
use crate::commands::expand_address;
use npm_readfile::{GlobalContext, Retriever};

pub fn execute(args: PathArgs, ctx: &GlobalContext) -> Result<()> {
    let retriever = Retriever::from_context(ctx)?;
    let path = retriever.download_file(&expand_address(&args.address, ctx))?;
    println!("{}", path.display());
    Ok(())
}
