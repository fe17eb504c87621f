//! Parse → match → edit script → report.

use tracing::{debug, instrument};

use calldiff_ast::languages::TreeSitterParser;
use calldiff_ast::{
    EditScript, EditScriptGenerator, GreedyMatcher, Mapping, Matcher, MatcherOptions,
    SimplifiedChawathe, SourceParser, TreePair,
};

use crate::error::{ReportError, Result};
use crate::report::{self, ChangeRecord, ReportSink, ReportSummary};

/// Everything computed for one before/after pair.
#[derive(Debug, Clone)]
pub struct DiffOutcome {
    pub trees: TreePair,
    pub mapping: Mapping,
    pub script: EditScript,
}

impl DiffOutcome {
    pub fn records(&self) -> Vec<ChangeRecord> {
        report::records_for(&self.script, &self.trees)
    }
}

/// Owns the three collaborators of a diff.
#[derive(Debug)]
pub struct DiffPipeline {
    parser: Box<dyn SourceParser>,
    matcher: Box<dyn Matcher>,
    generator: Box<dyn EditScriptGenerator>,
}

impl DiffPipeline {
    pub fn new(
        parser: Box<dyn SourceParser>,
        matcher: Box<dyn Matcher>,
        generator: Box<dyn EditScriptGenerator>,
    ) -> Self {
        Self {
            parser,
            matcher,
            generator,
        }
    }

    /// C parser, greedy matcher with `options`, simplified Chawathe.
    pub fn c(options: MatcherOptions) -> Self {
        Self::new(
            Box::new(TreeSitterParser::c()),
            Box::new(GreedyMatcher::new(options)),
            Box::new(SimplifiedChawathe),
        )
    }

    #[instrument(skip_all, fields(before_len = before.len(), after_len = after.len()))]
    pub fn diff_sources(&self, before: &str, after: &str) -> Result<DiffOutcome> {
        let src = self.parser.parse(before)?;
        let dst = self.parser.parse(after)?;
        let mapping = self.matcher.match_trees(&src, &dst);
        let script = self.generator.compute_actions(&src, &dst, &mapping);
        debug!(
            src_nodes = src.len(),
            dst_nodes = dst.len(),
            mapped = mapping.len(),
            actions = script.len(),
            "diff computed"
        );
        Ok(DiffOutcome {
            trees: TreePair::new(src, dst),
            mapping,
            script,
        })
    }

    pub fn report(
        &self,
        outcome: &DiffOutcome,
        sink: &mut dyn ReportSink,
    ) -> std::result::Result<ReportSummary, ReportError> {
        report::report(&outcome.script, &outcome.trees, sink)
    }

    pub fn report_all(
        &self,
        outcome: &DiffOutcome,
        sinks: &mut [&mut dyn ReportSink],
    ) -> (ReportSummary, Vec<ReportError>) {
        report::report_all(&outcome.script, &outcome.trees, sinks)
    }
}

impl Default for DiffPipeline {
    fn default() -> Self {
        Self::c(MatcherOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ChangeKind, MemorySink};

    #[test]
    fn unchanged_source_reports_nothing() {
        let source = "int f(int x) { return g(x) + 1; }\n";
        let pipeline = DiffPipeline::default();
        let outcome = pipeline.diff_sources(source, source).unwrap();
        assert!(outcome.script.is_empty());

        let mut sink = MemorySink::new();
        pipeline.report(&outcome, &mut sink).unwrap();
        assert_eq!(sink.contents(), "edit script: 0 actions");
    }

    #[test]
    fn added_call_is_an_insertion() {
        let before = "void f(void) {\n  setup();\n  run(ctx);\n}\n";
        let after = "void f(void) {\n  setup();\n  run(ctx);\n  log_event(level, message);\n}\n";
        let outcome = DiffPipeline::default().diff_sources(before, after).unwrap();

        let records = outcome.records();
        assert!(
            records.iter().any(|r| r.change == ChangeKind::Inserted
                && r.callee == "log_event"
                && r.arguments == ["level", "message"]),
            "{records:?}"
        );
        assert!(
            records.iter().all(|r| r.callee != "setup" && r.callee != "run"),
            "{records:?}"
        );
    }

    #[test]
    fn removed_call_is_a_deletion() {
        let before = "void f(void) {\n  setup();\n  teardown(ctx);\n}\n";
        let after = "void f(void) {\n  setup();\n}\n";
        let outcome = DiffPipeline::default().diff_sources(before, after).unwrap();

        let records = outcome.records();
        assert!(
            records
                .iter()
                .any(|r| r.change == ChangeKind::Deleted && r.callee == "teardown"),
            "{records:?}"
        );
    }
}
