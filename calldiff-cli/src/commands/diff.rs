use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::Serialize;

use calldiff_ast::{GreedyMatcher, LanguageRegistry, SimplifiedChawathe, TreePair};
use calldiff_core::pipeline::{DiffOutcome, DiffPipeline};
use calldiff_core::report::{ChangeRecord, ConsoleSink, LogFileSink, ReportSink};

use super::Globals;

#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Source file before the change
    pub before: PathBuf,
    /// Source file after the change
    pub after: PathBuf,
    /// Append the report to this log file (overrides config)
    #[arg(long)]
    pub log: Option<PathBuf>,
    /// Do not write a log file, even if configured
    #[arg(long, conflicts_with = "log")]
    pub no_log: bool,
    /// Output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,
    /// Also print the raw edit script
    #[arg(long)]
    pub show_actions: bool,
}

pub fn run(args: DiffArgs, globals: &Globals) -> anyhow::Result<()> {
    let config = super::load_config(globals)?;
    let before = super::read_input(&args.before)?;
    let after = super::read_input(&args.after)?;

    let parser = LanguageRegistry::new()
        .parser_for(&args.before)
        .with_context(|| format!("Cannot choose a parser for {}", args.before.display()))?;
    let pipeline = DiffPipeline::new(
        Box::new(parser),
        Box::new(GreedyMatcher::new(config.matcher_options())),
        Box::new(SimplifiedChawathe),
    );

    let outcome = pipeline
        .diff_sources(&before, &after)
        .with_context(|| {
            format!(
                "Cannot diff {} against {}",
                args.before.display(),
                args.after.display()
            )
        })?;

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

    let json = args.format == "json";
    let mut console = ConsoleSink;
    let mut sinks: Vec<&mut dyn ReportSink> = Vec::new();
    if config.report.console && !json {
        sinks.push(&mut console);
    }
    if let Some(log) = log.as_mut() {
        sinks.push(log);
    }

    let (summary, sink_errors) = pipeline.report_all(&outcome, &mut sinks);
    errors.extend(sink_errors);
    tracing::info!(
        inserted = summary.inserted,
        deleted = summary.deleted,
        renamed = summary.renamed,
        "diff reported"
    );

    if json {
        print_json(&outcome)?;
    } else if args.show_actions {
        print_actions(&outcome);
    }

    super::sink_failures(errors)
}

#[derive(Serialize)]
struct JsonReport<'a> {
    actions: usize,
    mapped_nodes: usize,
    changes: &'a [ChangeRecord],
}

fn print_json(outcome: &DiffOutcome) -> anyhow::Result<()> {
    let records = outcome.records();
    let report = JsonReport {
        actions: outcome.script.len(),
        mapped_nodes: outcome.mapping.len(),
        changes: &records,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn print_actions(outcome: &DiffOutcome) {
    println!();
    println!("Edit script ({} actions):", outcome.script.len());
    for (i, action) in outcome.script.iter().enumerate() {
        println!("  {:>3}. {}", i + 1, describe(&outcome.trees, action));
    }
}

fn describe(trees: &TreePair, action: &calldiff_ast::Action) -> String {
    let tree = trees.side(action.side());
    let Some(node) = tree.get(action.node()) else {
        return format!("{} <unknown node>", action.kind());
    };
    let mut text = format!("{} {}", action.kind(), node.type_name);
    if let Some(label) = &node.label {
        text.push_str(&format!(" \"{label}\""));
    }
    if let calldiff_ast::Action::UpdateNode {
        new_label: Some(new_label),
        ..
    } = action
    {
        text.push_str(&format!(" -> \"{new_label}\""));
    }
    if let Some(span) = node.span {
        text.push_str(&format!(" {span}"));
    }
    text
}
