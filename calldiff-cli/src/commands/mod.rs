pub mod batch;
pub mod diff;
pub mod tree;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Subcommand;

use calldiff_core::config::CalldiffConfig;
use calldiff_core::error::ReportError;
use calldiff_core::report::LogFileSink;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report call changes between two versions of a source file
    Diff(diff::DiffArgs),
    /// Run the report over a JSON dataset of before/after pairs
    Batch(batch::BatchArgs),
    /// Print the lowered syntax tree of a source file
    Tree(tree::TreeArgs),
}

/// Options shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct Globals {
    pub quiet: bool,
    pub config: Option<PathBuf>,
}

pub fn run(cmd: Command, globals: &Globals) -> anyhow::Result<()> {
    match cmd {
        Command::Diff(args) => diff::run(args, globals),
        Command::Batch(args) => batch::run(args, globals),
        Command::Tree(args) => tree::run(&args),
    }
}

/// Explicit `--config`, else `./calldiff.toml` when present, else defaults.
pub fn load_config(globals: &Globals) -> anyhow::Result<CalldiffConfig> {
    let config = match &globals.config {
        Some(path) => CalldiffConfig::load(path),
        None => {
            let cwd = std::env::current_dir().context("Cannot read working directory")?;
            CalldiffConfig::load_or_default(&cwd)
        }
    };
    config.context("Cannot load config")
}

/// Read a source file, reporting a missing file as "input not found".
pub fn read_input(path: &Path) -> anyhow::Result<String> {
    if !path.is_file() {
        anyhow::bail!("Input not found: {}", path.display());
    }
    std::fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))
}

/// Resolve the log path from `--log`/`--no-log` and the config, then open it.
///
/// An open failure is returned instead of raised so the console sink can
/// still run.
pub fn open_log(
    cli_path: Option<&Path>,
    no_log: bool,
    config: &CalldiffConfig,
) -> Option<Result<LogFileSink, ReportError>> {
    if no_log {
        return None;
    }
    let path = cli_path.or(config.report.log_path.as_deref())?;
    Some(LogFileSink::open(path))
}

/// Turn sink failures collected during a run into one error.
pub fn sink_failures(errors: Vec<ReportError>) -> anyhow::Result<()> {
    if errors.is_empty() {
        return Ok(());
    }
    let joined = errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    anyhow::bail!("{} report sink(s) failed: {joined}", errors.len())
}
