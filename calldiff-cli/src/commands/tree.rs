use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use calldiff_ast::{LanguageRegistry, SourceParser};
use calldiff_core::error::CalldiffError;

#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Source file to parse
    pub file: PathBuf,
}

pub fn run(args: &TreeArgs) -> anyhow::Result<()> {
    let source = super::read_input(&args.file)?;
    let parser = LanguageRegistry::new()
        .parser_for(&args.file)
        .with_context(|| format!("Cannot choose a parser for {}", args.file.display()))?;
    let tree = parser
        .parse(&source)
        .map_err(CalldiffError::from)
        .with_context(|| format!("Cannot parse {}", args.file.display()))?;
    print!("{}", tree.to_tree_string());
    Ok(())
}
