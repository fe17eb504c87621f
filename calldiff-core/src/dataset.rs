//! Batch mode over a JSON dataset of before/after function pairs.
//!
//! Records are diffed in parallel; reports are written sequentially in input
//! order, each framed by begin/end marker lines.

use std::path::Path;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{DatasetError, ReportError};
use crate::pipeline::{DiffOutcome, DiffPipeline};
use crate::progress::BatchProgress;
use crate::report::{self, ReportSink};

pub const BEGIN_MARKER: &str = "-------- begin --------";
pub const END_MARKER: &str = "-------- end --------";

/// One before/after pair of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffRecord {
    pub func_before_target: String,
    pub func_after_source: String,
    #[serde(default)]
    pub commit_id_source: Option<String>,
    #[serde(default)]
    pub diff_source: Option<String>,
}

/// Read a dataset file: a JSON array of [`DiffRecord`].
pub fn load_dataset(path: &Path) -> Result<Vec<DiffRecord>, DatasetError> {
    if !path.is_file() {
        return Err(DatasetError::NotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    parse_dataset(&content).map_err(|message| DatasetError::Malformed {
        path: path.display().to_string(),
        message,
    })
}

/// Parse dataset JSON. The error is the deserializer's message.
pub fn parse_dataset(content: &str) -> Result<Vec<DiffRecord>, String> {
    serde_json::from_str(content).map_err(|e| e.to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub records: usize,
    pub reported: usize,
    /// Records whose sources failed to parse.
    pub skipped: usize,
    pub inserted: usize,
    pub deleted: usize,
    pub renamed: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Diff every record and write framed reports to `sinks`.
///
/// A sink that fails stops receiving output; its error is returned and the
/// remaining sinks carry on.
pub fn run_batch(
    pipeline: &DiffPipeline,
    records: &[DiffRecord],
    sinks: &mut [&mut dyn ReportSink],
    progress: &dyn BatchProgress,
) -> (BatchSummary, Vec<ReportError>) {
    let started_at = Utc::now();
    progress.begin(records.len());

    let outcomes: Vec<Option<DiffOutcome>> = records
        .par_iter()
        .enumerate()
        .map(|(index, record)| {
            let outcome =
                match pipeline.diff_sources(&record.func_before_target, &record.func_after_source) {
                    Ok(outcome) => Some(outcome),
                    Err(e) => {
                        warn!(
                            index,
                            commit = record.commit_id_source.as_deref().unwrap_or("-"),
                            error = %e,
                            "skipping record"
                        );
                        progress.note(&format!("skipping record {index}: {e}"));
                        None
                    }
                };
            progress.record_done(index, outcome.is_none());
            outcome
        })
        .collect();
    progress.end();

    let mut summary = BatchSummary {
        records: records.len(),
        reported: 0,
        skipped: 0,
        inserted: 0,
        deleted: 0,
        renamed: 0,
        started_at,
        finished_at: started_at,
    };
    let mut errors = Vec::new();
    let mut alive = vec![true; sinks.len()];

    for (record, outcome) in records.iter().zip(&outcomes) {
        let Some(outcome) = outcome else {
            summary.skipped += 1;
            continue;
        };
        let changes = outcome.records();
        let mut lines = vec![
            BEGIN_MARKER.to_string(),
            format!(
                "commit_id_source: {}",
                record.commit_id_source.as_deref().unwrap_or_default()
            ),
            format!(
                "diff_source: {}",
                record.diff_source.as_deref().unwrap_or_default()
            ),
        ];
        lines.extend(report::render_lines(outcome.script.len(), &changes));
        lines.push(END_MARKER.to_string());

        for (sink, alive) in sinks.iter_mut().zip(alive.iter_mut()) {
            if !*alive {
                continue;
            }
            if let Err(e) = write_lines(&mut **sink, &lines) {
                warn!(sink = sink.name(), error = %e, "report sink failed; dropping it");
                errors.push(e);
                *alive = false;
            }
        }

        summary.reported += 1;
        for change in &changes {
            match change.change {
                report::ChangeKind::Inserted => summary.inserted += 1,
                report::ChangeKind::Deleted => summary.deleted += 1,
                report::ChangeKind::Renamed => summary.renamed += 1,
            }
        }
    }

    for (sink, alive) in sinks.iter_mut().zip(&alive) {
        if *alive {
            if let Err(source) = sink.finish() {
                errors.push(ReportError::Write {
                    sink: sink.name().to_string(),
                    source,
                });
            }
        }
    }

    summary.finished_at = Utc::now();
    info!(
        records = summary.records,
        reported = summary.reported,
        skipped = summary.skipped,
        elapsed_ms = (summary.finished_at - summary.started_at).num_milliseconds(),
        "batch finished"
    );
    (summary, errors)
}

fn write_lines(sink: &mut dyn ReportSink, lines: &[String]) -> Result<(), ReportError> {
    for line in lines {
        sink.write_line(line).map_err(|source| ReportError::Write {
            sink: sink.name().to_string(),
            source,
        })?;
    }
    Ok(())
}
