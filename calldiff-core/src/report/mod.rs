//! Turning classified events into report lines and structured records.
//!
//! Text layout, one line each:
//!
//! ```text
//! edit script: <n> actions
//! action <i>: <kind> <type> [<start>,<end>]
//! function name: <callee>
//! argument: <arg>
//! action <i>: update-node <old> -> <new>
//! function name: <new>
//! ```
//!
//! Action indexes are 1-based. A call whose signature has no callee is
//! dropped, and an action with nothing left to report gets no header.

pub mod sink;

use serde::{Deserialize, Serialize};
use tracing::info;

use calldiff_ast::{ActionKind, EditScript, TextRange, TreePair};

use crate::classify::{ChangeEvent, classify_script};
use crate::error::ReportError;
use crate::signature::extract_signature;

pub use sink::{ConsoleSink, LogFileSink, MemorySink, ReportSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Inserted,
    Deleted,
    Renamed,
}

impl ChangeKind {
    /// Change carried by a call found under an action of `kind`. Only
    /// subtree inserts and deletes carry calls.
    fn for_call(kind: ActionKind) -> Option<Self> {
        match kind {
            ActionKind::InsertTree | ActionKind::InsertNode => Some(Self::Inserted),
            ActionKind::DeleteTree => Some(Self::Deleted),
            ActionKind::DeleteNode | ActionKind::UpdateNode | ActionKind::Move => None,
        }
    }
}

/// Structured form of one reported call fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// 1-based position of the action in the edit script.
    pub action_index: usize,
    pub action: ActionKind,
    /// Grammar type of the action's node.
    pub node_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<TextRange>,
    pub change: ChangeKind,
    pub callee: String,
    pub arguments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_callee: Option<String>,
}

/// Counts of what one report contained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub actions: usize,
    pub inserted: usize,
    pub deleted: usize,
    pub renamed: usize,
}

impl ReportSummary {
    fn from_records(actions: usize, records: &[ChangeRecord]) -> Self {
        let count = |kind| records.iter().filter(|r| r.change == kind).count();
        Self {
            actions,
            inserted: count(ChangeKind::Inserted),
            deleted: count(ChangeKind::Deleted),
            renamed: count(ChangeKind::Renamed),
        }
    }
}

/// Resolve events into records, dropping calls without a callee.
pub fn change_records(events: &[ChangeEvent], trees: &TreePair) -> Vec<ChangeRecord> {
    events
        .iter()
        .filter_map(|event| match event {
            ChangeEvent::Call {
                action_index,
                action,
                action_node,
                call,
            } => {
                let change = ChangeKind::for_call(*action)?;
                let side = match change {
                    ChangeKind::Deleted => &trees.src,
                    _ => &trees.dst,
                };
                let signature = extract_signature(side, *call);
                if !signature.is_reportable() {
                    return None;
                }
                let node = side.get(*action_node);
                Some(ChangeRecord {
                    action_index: action_index + 1,
                    action: *action,
                    node_type: node.map(|n| n.type_name.clone()).unwrap_or_default(),
                    span: node.and_then(|n| n.span),
                    change,
                    callee: signature.callee,
                    arguments: signature.arguments,
                    previous_callee: None,
                })
            }
            ChangeEvent::Rename {
                action_index,
                action_node,
                old_name,
                new_name,
            } => {
                let node = trees.src.get(*action_node);
                Some(ChangeRecord {
                    action_index: action_index + 1,
                    action: ActionKind::UpdateNode,
                    node_type: node.map(|n| n.type_name.clone()).unwrap_or_default(),
                    span: node.and_then(|n| n.span),
                    change: ChangeKind::Renamed,
                    callee: new_name.clone(),
                    arguments: Vec::new(),
                    previous_callee: Some(old_name.clone()),
                })
            }
        })
        .collect()
}

/// Classify a script and resolve it into records.
pub fn records_for(script: &EditScript, trees: &TreePair) -> Vec<ChangeRecord> {
    change_records(&classify_script(script, trees), trees)
}

/// Write the text form of `records` to `sink`.
pub fn emit(
    action_count: usize,
    records: &[ChangeRecord],
    sink: &mut dyn ReportSink,
) -> Result<(), ReportError> {
    for line in render_lines(action_count, records) {
        sink.write_line(&line).map_err(|e| write_error(sink, e))?;
    }
    sink.finish().map_err(|e| write_error(sink, e))
}

fn write_error(sink: &dyn ReportSink, source: std::io::Error) -> ReportError {
    ReportError::Write {
        sink: sink.name().to_string(),
        source,
    }
}

/// Lines of one report, in emission order.
pub fn render_lines(action_count: usize, records: &[ChangeRecord]) -> Vec<String> {
    let mut lines = vec![format!("edit script: {action_count} actions")];
    let mut last_header = None;

    for record in records {
        if record.change == ChangeKind::Renamed {
            lines.push(format!(
                "action {}: {} {} -> {}",
                record.action_index,
                record.action,
                record.previous_callee.as_deref().unwrap_or_default(),
                record.callee
            ));
            lines.push(format!("function name: {}", record.callee));
            last_header = Some(record.action_index);
            continue;
        }

        if last_header != Some(record.action_index) {
            let mut header = format!(
                "action {}: {} {}",
                record.action_index, record.action, record.node_type
            );
            if let Some(span) = record.span {
                header.push(' ');
                header.push_str(&span.to_string());
            }
            lines.push(header);
            last_header = Some(record.action_index);
        }
        lines.push(format!("function name: {}", record.callee));
        lines.extend(record.arguments.iter().map(|arg| format!("argument: {arg}")));
    }
    lines
}

/// Classify `script` and write the report to `sink`.
pub fn report(
    script: &EditScript,
    trees: &TreePair,
    sink: &mut dyn ReportSink,
) -> Result<ReportSummary, ReportError> {
    let records = records_for(script, trees);
    emit(script.len(), &records, sink)?;
    let summary = ReportSummary::from_records(script.len(), &records);
    info!(
        sink = sink.name(),
        actions = summary.actions,
        inserted = summary.inserted,
        deleted = summary.deleted,
        renamed = summary.renamed,
        "report written"
    );
    Ok(summary)
}

/// Write the same report to every sink. A failing sink does not stop the
/// others; its error is returned alongside.
pub fn report_all(
    script: &EditScript,
    trees: &TreePair,
    sinks: &mut [&mut dyn ReportSink],
) -> (ReportSummary, Vec<ReportError>) {
    let records = records_for(script, trees);
    let mut errors = Vec::new();
    for sink in sinks.iter_mut() {
        if let Err(e) = emit(script.len(), &records, &mut **sink) {
            tracing::warn!(sink = sink.name(), error = %e, "report sink failed");
            errors.push(e);
        }
    }
    (ReportSummary::from_records(script.len(), &records), errors)
}
