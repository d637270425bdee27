//! Lexer and parser benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mova_syntax::{default_rules, parse_str, Lexer, TokenKind};

/// Builds a chain of `n` states, each with an init call and two triggers.
fn chain_source(n: usize) -> String {
    let mut source = String::from("# generated\nlimit = 10;\n");
    for i in 0..n {
        source.push_str(&format!(
            "state s{i} {{\n    log(msg=\"enter s{i}\");\n    on Key(code={i}, name) -> log(msg=name), move s{next};\n    on Tick(n=limit) -> move s0;\n}};\n",
            i = i,
            next = (i + 1) % n
        ));
    }
    source
}

fn bench_lexer(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer");

    for states in [10, 100] {
        let source = chain_source(states);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::new("tokens", states), &source, |b, source| {
            b.iter(|| {
                let mut lexer = Lexer::new(source.as_bytes(), default_rules());
                let mut count = 0usize;
                while lexer.token().kind != TokenKind::Eof {
                    count += 1;
                    lexer.advance();
                }
                black_box(count)
            });
        });
    }

    group.finish();
}

fn bench_parser(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser");

    for states in [10, 100] {
        let source = chain_source(states);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::new("file", states), &source, |b, source| {
            b.iter(|| black_box(parse_str("bench.mova", source).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_lexer, bench_parser);
criterion_main!(benches);
