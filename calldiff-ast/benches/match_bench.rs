// Benchmark parsing, matching and edit script generation on generated C.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use calldiff_ast::languages::TreeSitterParser;
use calldiff_ast::{EditScriptGenerator, GreedyMatcher, Matcher, SimplifiedChawathe, SourceParser};

fn generate_c_source(functions: usize, renamed: bool) -> String {
    use std::fmt::Write;
    let mut src = String::new();
    for i in 0..functions {
        let callee = if renamed && i % 3 == 0 {
            format!("renamed_{i}")
        } else {
            format!("helper_{i}")
        };
        let _ = write!(
            src,
            "int func_{i}(int x) {{\n    int y = {callee}(x, {i});\n    if (y > {i})\n        log_value(y);\n    return y + 1;\n}}\n\n"
        );
    }
    src
}

fn bench_parse(c: &mut Criterion) {
    let parser = TreeSitterParser::c();
    let mut group = c.benchmark_group("parse");

    for func_count in [10, 50, 200] {
        let source = generate_c_source(func_count, false);
        group.bench_with_input(
            BenchmarkId::new("c_functions", func_count),
            &source,
            |b, src| {
                b.iter(|| parser.parse(src).unwrap());
            },
        );
    }
    group.finish();
}

fn bench_match_and_script(c: &mut Criterion) {
    let parser = TreeSitterParser::c();
    let matcher = GreedyMatcher::default();
    let mut group = c.benchmark_group("match_and_script");

    for func_count in [10, 50, 200] {
        let src = parser.parse(&generate_c_source(func_count, false)).unwrap();
        let dst = parser.parse(&generate_c_source(func_count, true)).unwrap();

        group.bench_with_input(
            BenchmarkId::new("renamed_calls", func_count),
            &(src, dst),
            |b, (src, dst)| {
                b.iter(|| {
                    let mapping = matcher.match_trees(src, dst);
                    SimplifiedChawathe.compute_actions(src, dst, &mapping)
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_match_and_script);
criterion_main!(benches);
