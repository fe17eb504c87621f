//! Progress of a batch run.
//!
//! Records are diffed on rayon workers, so reporters take `&self` and must be
//! `Sync`. The CLI draws a bar on stderr; library callers pass
//! [`SilentProgress`].

use std::sync::atomic::{AtomicUsize, Ordering};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

pub trait BatchProgress: Send + Sync {
    /// Called once, before any record is diffed.
    fn begin(&self, records: usize);

    /// A record finished; `skipped` means its sources did not parse.
    fn record_done(&self, index: usize, skipped: bool);

    /// Show a line of text without tearing the bar.
    fn note(&self, text: &str);

    fn end(&self);
}

#[derive(Debug, Default)]
pub struct SilentProgress;

impl BatchProgress for SilentProgress {
    fn begin(&self, _records: usize) {}
    fn record_done(&self, _index: usize, _skipped: bool) {}
    fn note(&self, _text: &str) {}
    fn end(&self) {}
}

/// `indicatif` bar counting diffed and skipped records.
#[derive(Debug)]
pub struct BarProgress {
    bar: ProgressBar,
    diffed: AtomicUsize,
    skipped: AtomicUsize,
}

impl BarProgress {
    /// Drawn on stderr; stdout carries the report.
    pub fn stderr() -> Self {
        Self::with_bar(ProgressBar::with_draw_target(
            None,
            ProgressDrawTarget::stderr(),
        ))
    }

    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self {
            bar,
            diffed: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
        }
    }

    pub fn diffed(&self) -> usize {
        self.diffed.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::Relaxed)
    }
}

impl BatchProgress for BarProgress {
    fn begin(&self, records: usize) {
        self.diffed.store(0, Ordering::Relaxed);
        self.skipped.store(0, Ordering::Relaxed);
        self.bar.set_length(records as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} diffing [{bar:30.cyan/blue}] {pos}/{len} {msg}",
        ) {
            self.bar.set_style(style.progress_chars("=> "));
        }
        self.bar.set_message("");
        self.bar.reset();
    }

    fn record_done(&self, _index: usize, skipped: bool) {
        if skipped {
            let skipped = self.skipped.fetch_add(1, Ordering::Relaxed) + 1;
            self.bar.set_message(format!("({skipped} skipped)"));
        }
        self.diffed.fetch_add(1, Ordering::Relaxed);
        self.bar.inc(1);
    }

    fn note(&self, text: &str) {
        self.bar.suspend(|| eprintln!("{text}"));
    }

    fn end(&self) {
        self.bar.finish_and_clear();
    }
}
