//! Compiler and dispatch benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mova_core::{ActionSpec, Args, Compiler, Payload, Registry, TriggerSpec, ValueType};
use std::sync::Arc;

fn registry() -> Registry {
    Registry::new()
        .trigger(
            TriggerSpec::new("Key")
                .field("code", ValueType::Int)
                .field("name", ValueType::String),
        )
        .trigger(TriggerSpec::new("Tick").field("n", ValueType::Int))
        .action(ActionSpec::new("log", |args: &Args| {
            black_box(args.str("msg"));
            Ok(())
        })
        .input("msg", ValueType::String))
}

fn chain_source(n: usize) -> String {
    let mut source = String::from("limit = 10;\n");
    for i in 0..n {
        source.push_str(&format!(
            "state s{i} {{\n    log(msg=\"enter s{i}\");\n    on Key(code={i}, name) -> log(msg=name), move s{next};\n    on Tick(n=limit) -> move s0;\n}};\n",
            i = i,
            next = (i + 1) % n
        ));
    }
    source
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    let registry = registry();

    for states in [10, 100] {
        let source = chain_source(states);
        group.bench_with_input(BenchmarkId::new("chain", states), &source, |b, source| {
            let compiler = Compiler::new(&registry);
            b.iter(|| black_box(compiler.build_str("bench.mova", source).unwrap()));
        });
    }

    group.finish();
}

fn bench_emit(c: &mut Criterion) {
    let mut group = c.benchmark_group("emit");
    let registry = registry();

    for states in [10, 100] {
        let machine = Arc::new(
            Compiler::new(&registry)
                .build_str("bench.mova", &chain_source(states))
                .unwrap(),
        );

        // Walk the whole chain: every event matches and transitions.
        let payloads: Vec<Payload> = (0..states)
            .map(|i| Payload::new().with("code", i).with("name", "k"))
            .collect();
        group.bench_with_input(BenchmarkId::new("transition", states), &payloads, |b, payloads| {
            let mut sm = machine.instantiate().unwrap();
            b.iter(|| {
                for payload in payloads {
                    black_box(sm.emit("Key", payload).unwrap());
                }
            });
        });

        let miss = Payload::new().with("code", -1).with("name", "k");
        group.bench_function(BenchmarkId::new("no_match", states), |b| {
            let mut sm = machine.instantiate().unwrap();
            b.iter(|| black_box(sm.emit("Key", &miss).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compile, bench_emit);
criterion_main!(benches);
