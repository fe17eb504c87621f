// Integration test utilities and fixtures for calldiff.

use std::path::{Path, PathBuf};

use calldiff_core::dataset::DiffRecord;
use calldiff_core::pipeline::{DiffOutcome, DiffPipeline};
use calldiff_core::report::MemorySink;

/// `msg_source()` from Vim before the recursion guard was added.
pub const MSG_SOURCE_BEFORE: &str = include_str!("../fixtures/msg_source_before.c");
/// `msg_source()` after the change: `vim_free` became `VIM_CLEAR`.
pub const MSG_SOURCE_AFTER: &str = include_str!("../fixtures/msg_source_after.c");

/// Before/after sources written to a temporary directory.
#[derive(Debug)]
pub struct SourcePair {
    pub dir: tempfile::TempDir,
    pub before: PathBuf,
    pub after: PathBuf,
}

impl SourcePair {
    pub fn write(before: &str, after: &str) -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let before_path = dir.path().join("before.c");
        let after_path = dir.path().join("after.c");
        std::fs::write(&before_path, before)?;
        std::fs::write(&after_path, after)?;
        Ok(Self {
            dir,
            before: before_path,
            after: after_path,
        })
    }

    pub fn msg_source() -> anyhow::Result<Self> {
        Self::write(MSG_SOURCE_BEFORE, MSG_SOURCE_AFTER)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Diff two C sources with the default pipeline.
pub fn diff(before: &str, after: &str) -> anyhow::Result<DiffOutcome> {
    Ok(DiffPipeline::default().diff_sources(before, after)?)
}

/// Diff two C sources and capture the text report.
pub fn report_lines(before: &str, after: &str) -> anyhow::Result<Vec<String>> {
    let pipeline = DiffPipeline::default();
    let outcome = pipeline.diff_sources(before, after)?;
    let mut sink = MemorySink::new();
    pipeline.report(&outcome, &mut sink)?;
    Ok(sink.lines().to_vec())
}

/// Write `records` as a dataset file under `dir`.
pub fn write_dataset(dir: &Path, records: &[DiffRecord]) -> anyhow::Result<PathBuf> {
    let path = dir.join("dataset.json");
    std::fs::write(&path, serde_json::to_string_pretty(records)?)?;
    Ok(path)
}

/// Position of the first line equal to `line`.
pub fn position(lines: &[String], line: &str) -> Option<usize> {
    lines.iter().position(|l| l == line)
}
