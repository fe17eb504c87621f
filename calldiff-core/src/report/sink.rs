//! Line-oriented report destinations.
//!
//! Every sink receives the same lines in the same order; only the transport
//! differs. Sinks are opened by the caller before a report and closed with
//! [`ReportSink::finish`] (log files also flush on drop).

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::ReportError;

/// Destination for report lines.
pub trait ReportSink: std::fmt::Debug {
    /// Short name used in error messages ("console", "log", "memory").
    fn name(&self) -> &str;

    /// Write one line. The sink adds the line terminator.
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Flush anything buffered. Called once at the end of a reporting pass.
    fn finish(&mut self) -> io::Result<()>;
}

/// Unbuffered stdout sink.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ReportSink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{line}")?;
        out.flush()
    }

    fn finish(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}

/// Append-only log file. Each run adds to what previous runs wrote.
#[derive(Debug)]
pub struct LogFileSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl LogFileSink {
    /// Open `path` for appending, creating it and missing parent directories.
    pub fn open(path: &Path) -> Result<Self, ReportError> {
        let open_error = |source| ReportError::Open {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(open_error)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(open_error)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for LogFileSink {
    fn name(&self) -> &str {
        "log"
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")
    }

    fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl Drop for LogFileSink {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            warn!(path = %self.path.display(), error = %e, "log sink flush on drop failed");
        }
    }
}

/// In-memory sink.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    lines: Vec<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// All lines joined with `\n`, without a trailing newline.
    pub fn contents(&self) -> String {
        self.lines.join("\n")
    }
}

impl ReportSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.lines.push(line.to_string());
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_sink_appends_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("calls.log");

        {
            let mut sink = LogFileSink::open(&path).unwrap();
            sink.write_line("function name: first").unwrap();
            sink.finish().unwrap();
        }
        {
            // Dropped without finish: the drop flush still lands the line.
            let mut sink = LogFileSink::open(&path).unwrap();
            sink.write_line("function name: second").unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "function name: first\nfunction name: second\n");
    }

    #[test]
    fn log_sink_open_failure_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a log file.
        let err = LogFileSink::open(dir.path()).unwrap_err();
        assert!(matches!(err, ReportError::Open { .. }));
        assert!(err.to_string().contains("log sink"));
    }

    #[test]
    fn memory_sink_joins_without_trailing_newline() {
        let mut sink = MemorySink::new();
        sink.write_line("a").unwrap();
        sink.write_line("b").unwrap();
        assert_eq!(sink.contents(), "a\nb");
        assert_eq!(sink.lines().len(), 2);
    }
}
