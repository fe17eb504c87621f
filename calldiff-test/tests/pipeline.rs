use calldiff_core::dataset::{BEGIN_MARKER, DiffRecord, END_MARKER, load_dataset, run_batch};
use calldiff_core::pipeline::DiffPipeline;
use calldiff_core::progress::SilentProgress;
use calldiff_core::report::{ChangeKind, LogFileSink, MemorySink, ReportSink};
use calldiff_test::{
    MSG_SOURCE_AFTER, MSG_SOURCE_BEFORE, SourcePair, diff, position, report_lines, write_dataset,
};

// ── msg_source fixture ───────────────────────────────────────────

#[test]
fn msg_source_reports_replaced_free_call() {
    let lines = report_lines(MSG_SOURCE_BEFORE, MSG_SOURCE_AFTER).unwrap();
    assert!(lines[0].starts_with("edit script: "), "{lines:#?}");
    assert_ne!(lines[0], "edit script: 0 actions");

    let inserted = position(&lines, "function name: VIM_CLEAR").expect("VIM_CLEAR reported");
    assert_eq!(lines[inserted + 1], "argument: last_sourcing_name");
    assert!(
        lines[inserted - 1].starts_with("action ")
            && lines[inserted - 1].contains("insert-tree call_expression"),
        "{lines:#?}"
    );

    let deleted = position(&lines, "function name: vim_free").expect("vim_free reported");
    assert_eq!(lines[deleted + 1], "argument: last_sourcing_name");
    assert!(
        lines[deleted - 1].contains("delete-tree call_expression"),
        "{lines:#?}"
    );

    // Inserts are emitted while walking the script before deletes.
    assert!(inserted < deleted);
}

#[test]
fn msg_source_records_match_text_report() {
    let outcome = diff(MSG_SOURCE_BEFORE, MSG_SOURCE_AFTER).unwrap();
    let records = outcome.records();

    let clear = records
        .iter()
        .find(|r| r.callee == "VIM_CLEAR")
        .expect("VIM_CLEAR record");
    assert_eq!(clear.change, ChangeKind::Inserted);
    assert_eq!(clear.arguments, ["last_sourcing_name"]);
    assert!(clear.span.is_some());

    let free = records
        .iter()
        .find(|r| r.callee == "vim_free")
        .expect("vim_free record");
    assert_eq!(free.change, ChangeKind::Deleted);
    assert_eq!(free.arguments, ["last_sourcing_name"]);

    // The `==` to `!=` flip is not under a call.
    assert!(
        records.iter().all(|r| r.change != ChangeKind::Renamed),
        "{records:#?}"
    );

    // Unchanged calls stay out of the report.
    assert!(records.iter().all(|r| r.callee != "get_emsg_source"));
    assert!(records.iter().all(|r| r.callee != "other_sourcing_name"));
}

#[test]
fn report_is_deterministic() {
    let first = report_lines(MSG_SOURCE_BEFORE, MSG_SOURCE_AFTER).unwrap();
    let second = report_lines(MSG_SOURCE_BEFORE, MSG_SOURCE_AFTER).unwrap();
    assert_eq!(first, second);
}

#[test]
fn log_file_accumulates_across_runs() {
    let pair = SourcePair::msg_source().unwrap();
    let log_path = pair.path().join("logs").join("calldiff.log");
    let pipeline = DiffPipeline::default();
    let outcome = pipeline
        .diff_sources(MSG_SOURCE_BEFORE, MSG_SOURCE_AFTER)
        .unwrap();

    let mut memory = MemorySink::new();
    pipeline.report(&outcome, &mut memory).unwrap();
    let once = memory.lines().len();

    for _ in 0..2 {
        let mut log = LogFileSink::open(&log_path).unwrap();
        pipeline.report(&outcome, &mut log).unwrap();
    }

    let content = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(content.lines().count(), once * 2);
    assert_eq!(
        content
            .lines()
            .filter(|l| *l == "function name: VIM_CLEAR")
            .count(),
        2
    );
}

// ── Small C functions ────────────────────────────────────────────

#[test]
fn renamed_callee_reports_new_name() {
    let before = "int compute(int a, int b)\n{\n    int total = 0;\n    total += foo(a, b);\n    log_value(total);\n    return total;\n}\n";
    let after = "int compute(int a, int b)\n{\n    int total = 0;\n    total += bar(a, b);\n    log_value(total);\n    return total;\n}\n";

    let lines = report_lines(before, after).unwrap();
    let header = lines
        .iter()
        .position(|l| l.ends_with("update-node foo -> bar"))
        .expect("rename header");
    assert!(lines[header].starts_with("action "));
    assert_eq!(lines[header + 1], "function name: bar");
    assert!(!lines.iter().any(|l| l == "function name: log_value"));

    let records = diff(before, after).unwrap().records();
    let rename = records
        .iter()
        .find(|r| r.change == ChangeKind::Renamed)
        .expect("rename record");
    assert_eq!(rename.callee, "bar");
    assert_eq!(rename.previous_callee.as_deref(), Some("foo"));
}

#[test]
fn changed_argument_is_not_a_rename() {
    let before = "void run(int alpha, int beta, int gamma)\n{\n    setup();\n    process(alpha, beta);\n    finish(alpha);\n}\n";
    let after = "void run(int alpha, int beta, int gamma)\n{\n    setup();\n    process(alpha, gamma);\n    finish(alpha);\n}\n";

    let outcome = diff(before, after).unwrap();
    assert!(!outcome.script.is_empty());
    let records = outcome.records();
    assert!(
        records.iter().all(|r| r.change != ChangeKind::Renamed),
        "{records:#?}"
    );

    let lines = report_lines(before, after).unwrap();
    assert!(!lines.iter().any(|l| l == "function name: gamma"), "{lines:#?}");
    assert!(
        !lines.iter().any(|l| l.contains("update-node beta -> gamma")),
        "{lines:#?}"
    );
}

#[test]
fn nested_call_arguments_are_flattened() {
    let before = "void f(void) {\n  setup();\n  run(ctx);\n}\n";
    let after = "void f(void) {\n  setup();\n  run(ctx);\n  emit(format(x));\n}\n";

    let lines = report_lines(before, after).unwrap();
    let at = position(&lines, "function name: emit").expect("emit reported");
    assert_eq!(lines[at + 1], "argument: format");
    assert_eq!(lines[at + 2], "argument: x");
    assert!(!lines.iter().any(|l| l == "function name: format"));
}

#[test]
fn call_without_identifiers_is_not_reported() {
    let before = "void f(void) {\n  setup();\n  run(ctx);\n}\n";
    let after = "void f(void) {\n  setup();\n  run(ctx);\n  ((void (*)(void))0)();\n}\n";

    let outcome = diff(before, after).unwrap();
    assert!(!outcome.script.is_empty());

    let lines = report_lines(before, after).unwrap();
    assert_eq!(
        lines,
        [format!("edit script: {} actions", outcome.script.len())]
    );
}

// ── Batch ────────────────────────────────────────────────────────

#[test]
fn batch_over_dataset_file() {
    let dir = tempfile::tempdir().unwrap();
    let records = vec![
        DiffRecord {
            func_before_target: MSG_SOURCE_BEFORE.to_string(),
            func_after_source: MSG_SOURCE_AFTER.to_string(),
            commit_id_source: Some("8e7d9db21".to_string()),
            diff_source: Some("src/message.c".to_string()),
        },
        DiffRecord {
            func_before_target: "void g(void) { a(); }\n".to_string(),
            func_after_source: "void g(void) { a(); }\n".to_string(),
            commit_id_source: None,
            diff_source: None,
        },
    ];
    let path = write_dataset(dir.path(), &records).unwrap();
    let loaded = load_dataset(&path).unwrap();
    assert_eq!(loaded, records);

    let pipeline = DiffPipeline::default();
    let mut sink = MemorySink::new();
    let (summary, errors) = {
        let mut sinks: [&mut dyn ReportSink; 1] = [&mut sink];
        run_batch(&pipeline, &loaded, &mut sinks, &SilentProgress)
    };
    assert!(errors.is_empty(), "{errors:?}");
    assert_eq!(summary.reported, 2);
    assert!(summary.inserted >= 1);
    assert!(summary.deleted >= 1);

    let lines = sink.lines();
    assert_eq!(lines.iter().filter(|l| *l == BEGIN_MARKER).count(), 2);
    assert_eq!(lines.iter().filter(|l| *l == END_MARKER).count(), 2);
    assert_eq!(lines[1], "commit_id_source: 8e7d9db21");
    assert_eq!(lines[2], "diff_source: src/message.c");

    let first_end = position(lines, END_MARKER).unwrap();
    let clear = position(lines, "function name: VIM_CLEAR").unwrap();
    assert!(clear < first_end);
}
