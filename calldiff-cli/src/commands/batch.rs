use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use calldiff_ast::languages::TreeSitterParser;
use calldiff_ast::{GreedyMatcher, SimplifiedChawathe};
use calldiff_core::dataset::{load_dataset, run_batch};
use calldiff_core::error::CalldiffError;
use calldiff_core::pipeline::DiffPipeline;
use calldiff_core::progress::{BarProgress, BatchProgress, SilentProgress};
use calldiff_core::report::{ConsoleSink, LogFileSink, ReportSink};

use super::Globals;

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// JSON array of {func_before_target, func_after_source, commit_id_source?, diff_source?}
    pub dataset: PathBuf,
    /// Append reports to this log file (overrides config)
    #[arg(long)]
    pub log: Option<PathBuf>,
    /// Do not write a log file, even if configured
    #[arg(long, conflicts_with = "log")]
    pub no_log: bool,
}

pub fn run(args: BatchArgs, globals: &Globals) -> anyhow::Result<()> {
    let config = super::load_config(globals)?;
    let records = load_dataset(&args.dataset)
        .map_err(CalldiffError::from)
        .with_context(|| format!("Cannot load dataset {}", args.dataset.display()))?;

    let pipeline = DiffPipeline::new(
        Box::new(TreeSitterParser::c()),
        Box::new(GreedyMatcher::new(config.matcher_options())),
        Box::new(SimplifiedChawathe),
    );

    let mut errors = Vec::new();
    let mut log: Option<LogFileSink> =
        match super::open_log(args.log.as_deref(), args.no_log, &config) {
            Some(Ok(sink)) => Some(sink),
            Some(Err(e)) => {
                errors.push(e);
                None
            }
            None => None,
        };

    let mut console = ConsoleSink;
    let mut sinks: Vec<&mut dyn ReportSink> = Vec::new();
    if config.report.console {
        sinks.push(&mut console);
    }
    if let Some(log) = log.as_mut() {
        sinks.push(log);
    }

    let progress: Box<dyn BatchProgress> = if globals.quiet {
        Box::new(SilentProgress)
    } else {
        Box::new(BarProgress::stderr())
    };

    let (summary, sink_errors) = run_batch(&pipeline, &records, &mut sinks, progress.as_ref());
    errors.extend(sink_errors);

    if !globals.quiet {
        eprintln!(
            "{} records: {} reported, {} skipped ({} inserted, {} deleted, {} renamed) in {} ms",
            summary.records,
            summary.reported,
            summary.skipped,
            summary.inserted,
            summary.deleted,
            summary.renamed,
            (summary.finished_at - summary.started_at).num_milliseconds()
        );
    }

    super::sink_failures(errors)
}
